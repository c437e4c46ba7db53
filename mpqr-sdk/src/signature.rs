//! HMAC-SHA256 signatures.
//!
//! Two schemes are handled here:
//!
//! * **Provider webhooks** (inbound): the provider sends
//!
//!   ```text
//!   x-signature:  ts={unix_timestamp},v1={hex_hmac}
//!   x-request-id: {uuid}
//!   ```
//!
//!   where the HMAC covers the manifest
//!   `id:{data.id};request-id:{x-request-id};ts:{ts};` keyed with the
//!   webhook secret from the provider's dashboard. Parts whose value is
//!   unknown are left out of the manifest.
//!
//! * **Settlement notifications** (outbound): the body is signed as
//!   `HMAC-SHA256("{timestamp}.{json_body}", secret)` and sent as
//!
//!   ```text
//!   Mpqr-Signature: {unix_timestamp}.{hex_signature}
//!   ```

/// Header carrying the provider webhook signature.
pub const PROVIDER_SIGNATURE_HEADER: &str = "x-signature";

/// Header carrying the provider request id, part of the signed manifest.
pub const PROVIDER_REQUEST_ID_HEADER: &str = "x-request-id";

/// Header carrying the settlement notification signature.
pub const NOTIFICATION_SIGNATURE_HEADER: &str = "Mpqr-Signature";

/// Maximum allowed age of a settlement notification signature (in seconds).
pub const MAX_SIGNATURE_AGE: i64 = 5 * 60;

/// Errors produced by signature operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid header format")]
    InvalidFormat,
    #[error("invalid hex encoding")]
    InvalidHex,
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("signature expired")]
    Expired,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

impl From<hex::FromHexError> for SignatureError {
    fn from(_: hex::FromHexError) -> Self {
        Self::InvalidHex
    }
}

fn hmac_key(secret: &[u8]) -> ring::hmac::Key {
    ring::hmac::Key::new(ring::hmac::HMAC_SHA256, secret)
}

// ---------------------------------------------------------------------------
// Provider webhooks
// ---------------------------------------------------------------------------

/// A parsed `x-signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSignature {
    pub timestamp: String,
    pub signature: Vec<u8>,
}

impl ProviderSignature {
    /// Parse `ts=...,v1=...`. Unknown keys are ignored.
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut signature = None;
        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            match key.trim() {
                "ts" => timestamp = Some(value.trim().to_owned()),
                "v1" => signature = Some(hex::decode(value.trim())?),
                _ => {}
            }
        }
        match (timestamp, signature) {
            (Some(timestamp), Some(signature)) if !timestamp.is_empty() => Ok(Self {
                timestamp,
                signature,
            }),
            _ => Err(SignatureError::InvalidFormat),
        }
    }
}

/// Build the manifest the provider signs.
///
/// Alphanumeric resource ids are lowercased, as the provider does before
/// signing.
pub fn provider_manifest(data_id: Option<&str>, request_id: Option<&str>, timestamp: &str) -> String {
    let mut manifest = String::new();
    if let Some(id) = data_id {
        let id = if id.chars().all(|c| c.is_ascii_alphanumeric()) {
            id.to_ascii_lowercase()
        } else {
            id.to_owned()
        };
        manifest.push_str(&format!("id:{id};"));
    }
    if let Some(request_id) = request_id {
        manifest.push_str(&format!("request-id:{request_id};"));
    }
    manifest.push_str(&format!("ts:{timestamp};"));
    manifest
}

/// Verify an `x-signature` header against the notification it came with.
pub fn verify_provider_signature(
    header: &str,
    data_id: Option<&str>,
    request_id: Option<&str>,
    secret: &[u8],
) -> Result<(), SignatureError> {
    let parsed = ProviderSignature::parse(header)?;
    let manifest = provider_manifest(data_id, request_id, &parsed.timestamp);
    ring::hmac::verify(&hmac_key(secret), manifest.as_bytes(), &parsed.signature)?;
    Ok(())
}

/// Produce an `x-signature` header value the way the provider does.
pub fn provider_signature_header(
    data_id: Option<&str>,
    request_id: Option<&str>,
    timestamp: &str,
    secret: &[u8],
) -> String {
    let manifest = provider_manifest(data_id, request_id, timestamp);
    let tag = ring::hmac::sign(&hmac_key(secret), manifest.as_bytes());
    format!("ts={timestamp},v1={}", hex::encode(tag.as_ref()))
}

// ---------------------------------------------------------------------------
// Settlement notifications
// ---------------------------------------------------------------------------

/// Sign a JSON body: `HMAC-SHA256("{timestamp}.{json}", key)`.
///
/// Returns the formatted `Mpqr-Signature` header value.
pub fn sign_body(json: &str, key: &[u8], timestamp: i64) -> String {
    let data = format!("{timestamp}.{json}");
    let tag = ring::hmac::sign(&hmac_key(key), data.as_bytes());
    format!("{timestamp}.{}", hex::encode(tag.as_ref()))
}

/// Verify a `Mpqr-Signature` header against the raw body.
///
/// Checks the HMAC and that the timestamp is within [`MAX_SIGNATURE_AGE`]
/// of `now`.
pub fn verify_body(header: &str, json: &str, key: &[u8], now: i64) -> Result<(), SignatureError> {
    let (timestamp, signature) = header
        .split_once('.')
        .ok_or(SignatureError::InvalidFormat)?;
    let timestamp: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::InvalidFormat)?;
    let signature = hex::decode(signature)?;
    let data = format!("{timestamp}.{json}");
    ring::hmac::verify(&hmac_key(key), data.as_bytes(), &signature)?;
    if now - timestamp > MAX_SIGNATURE_AGE {
        return Err(SignatureError::Expired);
    }
    Ok(())
}
