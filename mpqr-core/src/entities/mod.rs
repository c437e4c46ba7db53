pub mod payment_transaction;

use mpqr_sdk::objects::TransactionState as SdkTransactionState;

/// Local transaction state for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `mpqr_sdk::objects::TransactionState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "transaction_state")]
pub enum TransactionState {
    Pending,
    Done,
    Cancelled,
}

impl TransactionState {
    /// `done` and `cancelled` are absorbing.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TransactionState::Pending)
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        SdkTransactionState::from(*self).fmt(f)
    }
}

impl From<TransactionState> for SdkTransactionState {
    fn from(value: TransactionState) -> Self {
        match value {
            TransactionState::Pending => SdkTransactionState::Pending,
            TransactionState::Done => SdkTransactionState::Done,
            TransactionState::Cancelled => SdkTransactionState::Cancelled,
        }
    }
}

impl TryFrom<SdkTransactionState> for TransactionState {
    type Error = SdkTransactionState;

    /// `not_found` only exists on the API surface.
    fn try_from(value: SdkTransactionState) -> Result<Self, Self::Error> {
        match value {
            SdkTransactionState::Pending => Ok(TransactionState::Pending),
            SdkTransactionState::Done => Ok(TransactionState::Done),
            SdkTransactionState::Cancelled => Ok(TransactionState::Cancelled),
            SdkTransactionState::NotFound => Err(value),
        }
    }
}
