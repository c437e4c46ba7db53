use url::Url;

/// Downstream endpoint receiving signed settlement notifications.
#[derive(Clone)]
pub struct NotificationTarget {
    pub url: Url,
    /// Secret key bytes for HMAC signing.
    pub secret: Box<[u8]>,
}

impl NotificationTarget {
    pub fn new(url: Url, secret: impl Into<Box<[u8]>>) -> Self {
        Self {
            url,
            secret: secret.into(),
        }
    }

    pub fn secret_bytes(&self) -> &[u8] {
        &self.secret
    }
}

impl std::fmt::Debug for NotificationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationTarget")
            .field("url", &self.url.as_str())
            .field("secret", &"<redacted>")
            .finish()
    }
}
