use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use carhaul_core::domain::payment::{PaymentPhase, PaymentRecord};
use carhaul_core::domain::shipment::ShipmentId;
use carhaul_core::payment::machine::TransitionOutcome;

pub mod payment_record;

pub use payment_record::SqlPaymentRecordRepository;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("payment record `{shipment_id}` not found")]
    NotFound { shipment_id: String },
    #[error("phase conflict for `{shipment_id}`: expected {expected:?}, found {actual:?}")]
    PhaseConflict { shipment_id: String, expected: PaymentPhase, actual: Option<PaymentPhase> },
}

/// Result of a conditional transition write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionReceipt {
    Applied,
    /// The idempotency key was seen before; no effect was re-applied.
    AlreadyApplied,
}

/// One row of the persisted transition history for a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionRow {
    pub from_phase: PaymentPhase,
    pub to_phase: PaymentPhase,
    pub event: String,
    pub idempotency_key: String,
    pub applied_at: DateTime<Utc>,
}

/// Durable home of the payment record. The state machine itself has no
/// persistence; at-most-once effect application is enforced here with a
/// conditional update keyed on the expected pre-transition phase.
#[async_trait]
pub trait PaymentRecordRepository: Send + Sync {
    async fn insert(&self, record: &PaymentRecord) -> Result<(), StorageError>;

    async fn find_by_id(&self, id: &ShipmentId) -> Result<Option<PaymentRecord>, StorageError>;

    /// Persists an already-applied in-memory transition. The row update is
    /// conditioned on `expected` still being the stored phase; a stale
    /// caller (duplicate webhook, lost race) gets `PhaseConflict`. A replay
    /// of a previously applied idempotency key is acknowledged as
    /// `AlreadyApplied` without touching the record.
    async fn apply_transition(
        &self,
        record: &PaymentRecord,
        expected: PaymentPhase,
        outcome: &TransitionOutcome,
        idempotency_key: &str,
    ) -> Result<TransitionReceipt, StorageError>;

    async fn list_transitions(&self, id: &ShipmentId)
        -> Result<Vec<TransitionRow>, StorageError>;
}
