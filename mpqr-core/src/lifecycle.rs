//! Per-transaction QR order lifecycle.
//!
//! ```text
//! uninitialized ──ensure_order──▶ order_created ──refresh_status──▶ settled_approved
//!                                   │   ▲                       └─▶ settled_rejected
//!                                   └───┘ pending / expired order regenerated
//! ```
//!
//! `ensure_order` and `refresh_status` hold the transaction's lock for the
//! whole read-modify-write. The store's conditional writes cover other
//! processes sharing the same database.

use compact_str::CompactString;
use mpqr_sdk::client::MercadoPagoClient;
use mpqr_sdk::config::PaymentOrderCredentials;
use mpqr_sdk::objects::LifecycleState as SdkLifecycleState;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entities::TransactionState;
use crate::entities::payment_transaction::{NewPaymentTransaction, PaymentTransaction, Settlement};
use crate::error::QrError;
use crate::events::{SettlementEvent, SettlementEventSender};
use crate::locks::TransactionLocks;
use crate::order_creator::{OrderCreator, normalize_amount};
use crate::qr_order::QrOrder;
use crate::status_resolver::{SettlementVerdict, StatusLookup, StatusResolver};
use crate::store::{StoreError, TransactionStore};

/// Where a transaction is in its QR lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Uninitialized,
    OrderCreated,
    SettledApproved,
    SettledRejected,
}

impl LifecycleState {
    pub fn of(transaction: &PaymentTransaction) -> Self {
        match transaction.state {
            TransactionState::Done => LifecycleState::SettledApproved,
            TransactionState::Cancelled => LifecycleState::SettledRejected,
            TransactionState::Pending if transaction.qr_order().is_some() => {
                LifecycleState::OrderCreated
            }
            TransactionState::Pending => LifecycleState::Uninitialized,
        }
    }
}

impl From<LifecycleState> for SdkLifecycleState {
    fn from(value: LifecycleState) -> Self {
        match value {
            LifecycleState::Uninitialized => SdkLifecycleState::Uninitialized,
            LifecycleState::OrderCreated => SdkLifecycleState::OrderCreated,
            LifecycleState::SettledApproved => SdkLifecycleState::SettledApproved,
            LifecycleState::SettledRejected => SdkLifecycleState::SettledRejected,
        }
    }
}

/// Which lookup `refresh_status` performs for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// Search merchant orders by the transaction's reference.
    ByReference,
    /// Fetch the transaction's remote order directly. Transactions without a
    /// remote order id are searched by reference instead.
    ByRemoteId { fallback_to_reference: bool },
}

/// Input for opening a pending transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTransaction {
    pub reference: Option<String>,
    pub description: Option<String>,
    pub amount: Decimal,
    pub currency: CompactString,
}

/// Result of [`LifecycleManager::refresh_status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRefresh {
    /// The transaction after the refresh.
    pub transaction: PaymentTransaction,
    /// `None` when the transaction was already terminal and nothing was
    /// looked up.
    pub verdict: Option<SettlementVerdict>,
    /// Whether this call performed the terminal transition.
    pub applied: bool,
}

impl StatusRefresh {
    /// Message to show next to the state: the stored one once settled,
    /// otherwise the provider's in-flight sub-state.
    pub fn state_message(&self) -> Option<String> {
        match (&self.verdict, self.transaction.state) {
            (Some(SettlementVerdict::Pending { detail }), TransactionState::Pending) => {
                detail.clone()
            }
            _ => self.transaction.state_message.clone(),
        }
    }
}

pub struct LifecycleManager<S> {
    store: S,
    creator: OrderCreator,
    resolver: StatusResolver,
    locks: TransactionLocks,
    settlement_tx: Option<SettlementEventSender>,
}

impl<S: TransactionStore> LifecycleManager<S> {
    pub fn new(store: S, client: MercadoPagoClient) -> Self {
        Self {
            store,
            creator: OrderCreator::new(client.clone()),
            resolver: StatusResolver::new(client),
            locks: TransactionLocks::new(),
            settlement_tx: None,
        }
    }

    /// Emit a [`SettlementEvent`] for every applied terminal transition.
    pub fn with_settlement_events(mut self, sender: SettlementEventSender) -> Self {
        self.settlement_tx = Some(sender);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn resolver(&self) -> &StatusResolver {
        &self.resolver
    }

    /// Open a new pending transaction.
    ///
    /// The reference defaults to one derived from the generated id.
    pub async fn create_transaction(
        &self,
        request: OpenTransaction,
    ) -> Result<PaymentTransaction, QrError> {
        let amount = normalize_amount(request.amount)?;
        let id = Uuid::now_v7();
        let reference = request
            .reference
            .unwrap_or_else(|| format!("mpqr-{}", id.simple()));
        let transaction = self
            .store
            .insert(NewPaymentTransaction {
                id,
                reference,
                description: request.description,
                amount,
                currency: request.currency,
            })
            .await
            .map_err(reference_conflict)?;
        info!(
            transaction_id = %transaction.id,
            reference = %transaction.reference,
            amount = %transaction.amount,
            "Opened transaction"
        );
        Ok(transaction)
    }

    /// Return the pending transaction for `reference`, opening it if needed.
    ///
    /// A settled transaction, or a pending one for another amount or
    /// currency, is a [`QrError::ReferenceConflict`].
    pub async fn open_by_reference(
        &self,
        reference: String,
        request: OpenTransaction,
    ) -> Result<PaymentTransaction, QrError> {
        let amount = normalize_amount(request.amount)?;
        if let Some(existing) = self.store.get_by_reference(&reference).await? {
            if existing.state.is_terminal()
                || existing.amount != amount
                || existing.currency != request.currency
            {
                return Err(QrError::ReferenceConflict(reference));
            }
            debug!(transaction_id = %existing.id, reference = %reference, "Reusing open transaction");
            return Ok(existing);
        }
        self.create_transaction(OpenTransaction {
            reference: Some(reference),
            amount,
            ..request
        })
        .await
    }

    /// Return the live QR order of a pending transaction, creating or
    /// regenerating it when absent or expired.
    pub async fn ensure_order(
        &self,
        id: Uuid,
        credentials: &PaymentOrderCredentials,
    ) -> Result<QrOrder, QrError> {
        self.ensure_order_at(id, credentials, OffsetDateTime::now_utc())
            .await
    }

    /// [`Self::ensure_order`] with an explicit clock.
    pub async fn ensure_order_at(
        &self,
        id: Uuid,
        credentials: &PaymentOrderCredentials,
        now: OffsetDateTime,
    ) -> Result<QrOrder, QrError> {
        let _guard = self.locks.lock(id).await;

        let transaction = self.load(id).await?;
        if transaction.state.is_terminal() {
            return Err(QrError::AlreadySettled {
                id,
                state: transaction.state,
            });
        }
        if let Some(order) = transaction.qr_order() {
            if !order.is_expired_at(now) {
                return Ok(order);
            }
            info!(
                transaction_id = %id,
                remote_order_id = %order.remote_order_id,
                "QR order expired, regenerating"
            );
        }

        let order = self
            .creator
            .create_order(&transaction, credentials, now)
            .await?;
        let replaced = self
            .store
            .replace_qr_order(id, transaction.qr_order_id.as_deref(), &order)
            .await?;
        if replaced {
            return Ok(order);
        }

        // Another process wrote first. Its order wins if still usable.
        warn!(
            transaction_id = %id,
            remote_order_id = %order.remote_order_id,
            "QR order replaced concurrently, discarding ours"
        );
        let current = self.load(id).await?;
        match current.qr_order() {
            Some(theirs) if !current.state.is_terminal() && !theirs.is_expired_at(now) => Ok(theirs),
            _ => Err(QrError::ConcurrentUpdate(id)),
        }
    }

    /// Resolve the provider status and apply a terminal verdict at most once.
    ///
    /// Terminal transactions are returned as they are without contacting the
    /// provider.
    pub async fn refresh_status(
        &self,
        id: Uuid,
        credentials: &PaymentOrderCredentials,
        mode: LookupMode,
    ) -> Result<StatusRefresh, QrError> {
        let _guard = self.locks.lock(id).await;

        let transaction = self.load(id).await?;
        if transaction.state.is_terminal() {
            return Ok(StatusRefresh {
                transaction,
                verdict: None,
                applied: false,
            });
        }

        let lookup = lookup_for(&transaction, mode);
        let verdict = self.resolver.resolve(credentials, &lookup).await?;

        let settlement = match &verdict {
            SettlementVerdict::Pending { .. } => {
                return Ok(StatusRefresh {
                    transaction,
                    verdict: Some(verdict),
                    applied: false,
                });
            }
            SettlementVerdict::Approved { payment_id, .. } => Settlement {
                state: TransactionState::Done,
                state_message: None,
                payment_id: *payment_id,
            },
            SettlementVerdict::Rejected { detail } => Settlement {
                state: TransactionState::Cancelled,
                state_message: detail.clone(),
                payment_id: None,
            },
        };

        let applied = self.store.settle(id, settlement).await?;
        let transaction = self.load(id).await?;
        if applied {
            info!(
                transaction_id = %id,
                reference = %transaction.reference,
                state = %transaction.state,
                "Transaction settled"
            );
            self.emit(&transaction).await;
        } else {
            debug!(transaction_id = %id, "Transaction already settled elsewhere");
        }

        Ok(StatusRefresh {
            transaction,
            verdict: Some(verdict),
            applied,
        })
    }

    /// [`Self::refresh_status`] for the transaction owning `reference`.
    ///
    /// Returns `None` when no such transaction exists.
    pub async fn refresh_by_reference(
        &self,
        reference: &str,
        credentials: &PaymentOrderCredentials,
        mode: LookupMode,
    ) -> Result<Option<StatusRefresh>, QrError> {
        let Some(transaction) = self.store.get_by_reference(reference).await? else {
            return Ok(None);
        };
        self.refresh_status(transaction.id, credentials, mode)
            .await
            .map(Some)
    }

    async fn load(&self, id: Uuid) -> Result<PaymentTransaction, QrError> {
        self.store
            .get(id)
            .await?
            .ok_or(QrError::TransactionNotFound(id))
    }

    async fn emit(&self, transaction: &PaymentTransaction) {
        let Some(sender) = &self.settlement_tx else {
            return;
        };
        if let Err(e) = sender
            .send(SettlementEvent::from_transaction(transaction))
            .await
        {
            warn!(
                transaction_id = %transaction.id,
                error = %e,
                "Failed to emit settlement event"
            );
        }
    }
}

fn lookup_for(transaction: &PaymentTransaction, mode: LookupMode) -> StatusLookup {
    match (mode, &transaction.qr_order_id) {
        (
            LookupMode::ByRemoteId {
                fallback_to_reference,
            },
            Some(remote_order_id),
        ) => StatusLookup::ByRemoteId {
            remote_order_id: remote_order_id.clone(),
            fallback_reference: fallback_to_reference.then(|| transaction.reference.clone()),
        },
        _ => StatusLookup::ByReference(transaction.reference.clone()),
    }
}

fn reference_conflict(error: StoreError) -> QrError {
    match error {
        StoreError::DuplicateReference(reference) => QrError::ReferenceConflict(reference),
        other => QrError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTransactionStore;

    fn manager() -> LifecycleManager<MemoryTransactionStore> {
        LifecycleManager::new(MemoryTransactionStore::new(), MercadoPagoClient::new())
    }

    fn open(amount: Decimal) -> OpenTransaction {
        OpenTransaction {
            reference: None,
            description: None,
            amount,
            currency: "ARS".into(),
        }
    }

    #[tokio::test]
    async fn test_create_transaction_generates_reference() {
        let manager = manager();
        let tx = manager
            .create_transaction(open(Decimal::new(10005, 3)))
            .await
            .unwrap();
        assert_eq!(tx.reference, format!("mpqr-{}", tx.id.simple()));
        assert_eq!(tx.amount, Decimal::new(1001, 2));
        assert_eq!(LifecycleState::of(&tx), LifecycleState::Uninitialized);
        assert_eq!(
            SdkLifecycleState::from(LifecycleState::of(&tx)),
            SdkLifecycleState::Uninitialized
        );
    }

    #[tokio::test]
    async fn test_open_by_reference_reuses_matching_transaction() {
        let manager = manager();
        let first = manager
            .open_by_reference("pos-1".into(), open(Decimal::new(500, 2)))
            .await
            .unwrap();
        let second = manager
            .open_by_reference("pos-1".into(), open(Decimal::new(5, 0)))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        let err = manager
            .open_by_reference("pos-1".into(), open(Decimal::new(6, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err, QrError::ReferenceConflict(reference) if reference == "pos-1"));
    }

    #[tokio::test]
    async fn test_duplicate_explicit_reference_conflicts() {
        let manager = manager();
        let request = OpenTransaction {
            reference: Some("SO042".into()),
            ..open(Decimal::new(1, 0))
        };
        manager.create_transaction(request.clone()).await.unwrap();
        assert!(matches!(
            manager.create_transaction(request).await,
            Err(QrError::ReferenceConflict(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_transaction() {
        let creds = PaymentOrderCredentials::new("t", "1", "s", "p");
        let err = manager()
            .refresh_status(Uuid::now_v7(), &creds, LookupMode::ByReference)
            .await
            .unwrap_err();
        assert!(matches!(err, QrError::TransactionNotFound(_)));
    }

    #[test]
    fn test_lookup_without_remote_id_uses_reference() {
        let now = OffsetDateTime::now_utc();
        let mut tx = PaymentTransaction {
            id: Uuid::now_v7(),
            reference: "SO042".into(),
            description: None,
            amount: Decimal::ONE,
            currency: "ARS".into(),
            state: TransactionState::Pending,
            state_message: None,
            payment_id: None,
            qr_data: None,
            qr_image: None,
            qr_order_id: None,
            qr_created_at: None,
            qr_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        let mode = LookupMode::ByRemoteId {
            fallback_to_reference: true,
        };
        assert_eq!(
            lookup_for(&tx, mode),
            StatusLookup::ByReference("SO042".into())
        );

        tx.qr_order_id = Some("abc".into());
        assert_eq!(
            lookup_for(&tx, mode),
            StatusLookup::ByRemoteId {
                remote_order_id: "abc".into(),
                fallback_reference: Some("SO042".into()),
            }
        );
    }
}
