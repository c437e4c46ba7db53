use compact_str::CompactString;
use rust_decimal::Decimal;
use time::{Duration, OffsetDateTime};

/// How long a created QR stays scannable before it is regenerated.
pub const QR_ORDER_TTL: Duration = Duration::minutes(15);

/// A live provider order attached to a local transaction.
///
/// Regeneration replaces the whole value; the fields are never updated one
/// at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrOrder {
    pub reference: String,
    pub remote_order_id: String,
    pub qr_payload: String,
    pub qr_image: Option<String>,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub amount: Decimal,
    pub currency: CompactString,
}

impl QrOrder {
    pub fn expiry_for(created_at: OffsetDateTime) -> OffsetDateTime {
        created_at + QR_ORDER_TTL
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let created_at = datetime!(2025-01-01 12:00 UTC);
        let order = QrOrder {
            reference: "SO042".into(),
            remote_order_id: "abc".into(),
            qr_payload: "000201".into(),
            qr_image: None,
            created_at,
            expires_at: QrOrder::expiry_for(created_at),
            amount: Decimal::new(1000, 2),
            currency: "ARS".into(),
        };
        assert!(!order.is_expired_at(datetime!(2025-01-01 12:14:59 UTC)));
        assert!(order.is_expired_at(datetime!(2025-01-01 12:15 UTC)));
    }
}
