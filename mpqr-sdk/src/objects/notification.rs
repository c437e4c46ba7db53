//! Provider-pushed notifications (webhooks and legacy IPN).
//!
//! Webhooks carry `type` and `data.id`; IPN deliveries carry `topic` and a
//! `resource` URL, with `id` in the query string. Both shapes parse into
//! [`ProviderNotification`].

use serde::{Deserialize, Deserializer, Serialize};

/// What a notification is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NotificationTopic {
    MerchantOrder,
    Payment,
    Other(String),
}

impl NotificationTopic {
    pub fn parse(value: &str) -> Self {
        match value {
            "merchant_order" | "topic_merchant_order_wh" => Self::MerchantOrder,
            "payment" => Self::Payment,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Only merchant order and payment notifications can change settlement.
    pub fn triggers_refresh(&self) -> bool {
        matches!(self, Self::MerchantOrder | Self::Payment)
    }
}

impl std::fmt::Display for NotificationTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationTopic::MerchantOrder => write!(f, "merchant_order"),
            NotificationTopic::Payment => write!(f, "payment"),
            NotificationTopic::Other(other) => write!(f, "{other}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
}

/// Body of a provider notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderNotification {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub data: Option<NotificationData>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
}

impl ProviderNotification {
    /// `type` wins over `topic` when both are present.
    pub fn topic(&self) -> Option<NotificationTopic> {
        self.kind
            .as_deref()
            .or(self.topic.as_deref())
            .map(NotificationTopic::parse)
    }

    /// Id of the resource the notification refers to.
    ///
    /// Prefers `data.id`, then `id`, then the last path segment of
    /// `resource`.
    pub fn resource_id(&self) -> Option<String> {
        self.data
            .as_ref()
            .and_then(|data| data.id.clone())
            .or_else(|| self.id.clone())
            .or_else(|| {
                self.resource
                    .as_deref()
                    .and_then(|resource| resource.rsplit('/').next())
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_owned)
            })
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
