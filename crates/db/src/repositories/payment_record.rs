use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};
use tracing::debug;

use carhaul_core::domain::payment::{
    PaymentIntentId, PaymentPhase, PaymentRecord, PaymentSplit,
};
use carhaul_core::domain::shipment::ShipmentId;
use carhaul_core::payment::machine::TransitionOutcome;

use crate::repositories::{
    PaymentRecordRepository, StorageError, TransitionReceipt, TransitionRow,
};
use crate::DbPool;

pub struct SqlPaymentRecordRepository {
    pool: DbPool,
}

impl SqlPaymentRecordRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn current_phase(&self, id: &ShipmentId) -> Result<Option<PaymentPhase>, StorageError> {
        let row = sqlx::query("SELECT phase FROM shipment_payment WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            let phase: String = row.try_get("phase")?;
            Ok::<_, sqlx::Error>(phase)
        })
        .transpose()?
        .map(|phase| parse_phase(&phase))
        .transpose()
    }

    fn record_from_row(row: &SqliteRow) -> Result<PaymentRecord, StorageError> {
        let shipment_id: String = row.try_get("id")?;
        let total_quoted = decode_decimal(row, "total_quoted")?;
        let upfront = decode_decimal(row, "upfront_amount")?;
        let remaining = decode_decimal(row, "remaining_amount")?;
        let phase: String = row.try_get("phase")?;
        let payment_intent_id: Option<String> = row.try_get("payment_intent_id")?;
        let delivery_confirmed_at: Option<String> = row.try_get("delivery_confirmed_at")?;
        let cancel_reason: Option<String> = row.try_get("cancel_reason")?;
        let failure_reason: Option<String> = row.try_get("failure_reason")?;
        let open_issues_json: String = row.try_get("open_issues_json")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(PaymentRecord {
            shipment_id: ShipmentId(shipment_id),
            total_quoted,
            split: PaymentSplit { upfront, remaining },
            phase: parse_phase(&phase)?,
            payment_intent_id: payment_intent_id.map(PaymentIntentId),
            delivery_confirmed_at: delivery_confirmed_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            cancel_reason,
            failure_reason,
            open_issues: serde_json::from_str(&open_issues_json)
                .map_err(|error| StorageError::Decode(error.to_string()))?,
            created_at: parse_timestamp(&created_at)?,
        })
    }
}

#[async_trait]
impl PaymentRecordRepository for SqlPaymentRecordRepository {
    async fn insert(&self, record: &PaymentRecord) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO shipment_payment (
                id, total_quoted, upfront_amount, remaining_amount, phase,
                payment_intent_id, delivery_confirmed_at, cancel_reason,
                failure_reason, open_issues_json, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.shipment_id.0)
        .bind(record.total_quoted.to_string())
        .bind(record.split.upfront.to_string())
        .bind(record.split.remaining.to_string())
        .bind(record.phase.as_str())
        .bind(record.payment_intent_id.as_ref().map(|id| id.0.clone()))
        .bind(record.delivery_confirmed_at.map(|at| at.to_rfc3339()))
        .bind(&record.cancel_reason)
        .bind(&record.failure_reason)
        .bind(encode_issues(record)?)
        .bind(record.created_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &ShipmentId) -> Result<Option<PaymentRecord>, StorageError> {
        let row = sqlx::query("SELECT * FROM shipment_payment WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::record_from_row).transpose()
    }

    async fn apply_transition(
        &self,
        record: &PaymentRecord,
        expected: PaymentPhase,
        outcome: &TransitionOutcome,
        idempotency_key: &str,
    ) -> Result<TransitionReceipt, StorageError> {
        let mut tx = self.pool.begin().await?;

        let history = sqlx::query(
            r#"
            INSERT INTO payment_transition
                (shipment_id, from_phase, to_phase, event, idempotency_key, applied_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (shipment_id, idempotency_key) DO NOTHING
            "#,
        )
        .bind(&record.shipment_id.0)
        .bind(outcome.from.as_str())
        .bind(outcome.to.as_str())
        .bind(outcome.event.as_str())
        .bind(idempotency_key)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        if history.rows_affected() == 0 {
            tx.rollback().await?;
            debug!(
                shipment_id = %record.shipment_id.0,
                idempotency_key,
                "transition replayed, acknowledging without re-applying"
            );
            return Ok(TransitionReceipt::AlreadyApplied);
        }

        let updated = sqlx::query(
            r#"
            UPDATE shipment_payment
            SET phase = ?,
                payment_intent_id = ?,
                delivery_confirmed_at = ?,
                cancel_reason = ?,
                failure_reason = ?,
                open_issues_json = ?,
                updated_at = ?
            WHERE id = ? AND phase = ?
            "#,
        )
        .bind(record.phase.as_str())
        .bind(record.payment_intent_id.as_ref().map(|id| id.0.clone()))
        .bind(record.delivery_confirmed_at.map(|at| at.to_rfc3339()))
        .bind(&record.cancel_reason)
        .bind(&record.failure_reason)
        .bind(encode_issues(record)?)
        .bind(Utc::now().to_rfc3339())
        .bind(&record.shipment_id.0)
        .bind(expected.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            let actual = self.current_phase(&record.shipment_id).await?;
            if actual.is_none() {
                return Err(StorageError::NotFound {
                    shipment_id: record.shipment_id.0.clone(),
                });
            }
            return Err(StorageError::PhaseConflict {
                shipment_id: record.shipment_id.0.clone(),
                expected,
                actual,
            });
        }

        tx.commit().await?;
        debug!(
            shipment_id = %record.shipment_id.0,
            from = outcome.from.as_str(),
            to = outcome.to.as_str(),
            event = outcome.event.as_str(),
            "transition persisted"
        );
        Ok(TransitionReceipt::Applied)
    }

    async fn list_transitions(
        &self,
        id: &ShipmentId,
    ) -> Result<Vec<TransitionRow>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT from_phase, to_phase, event, idempotency_key, applied_at
            FROM payment_transition
            WHERE shipment_id = ?
            ORDER BY id
            "#,
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let from_phase: String = row.try_get("from_phase")?;
                let to_phase: String = row.try_get("to_phase")?;
                let event: String = row.try_get("event")?;
                let idempotency_key: String = row.try_get("idempotency_key")?;
                let applied_at: String = row.try_get("applied_at")?;
                Ok::<_, sqlx::Error>((from_phase, to_phase, event, idempotency_key, applied_at))
            })
            .map(|decoded| {
                let (from_phase, to_phase, event, idempotency_key, applied_at) = decoded?;
                Ok(TransitionRow {
                    from_phase: parse_phase(&from_phase)?,
                    to_phase: parse_phase(&to_phase)?,
                    event,
                    idempotency_key,
                    applied_at: parse_timestamp(&applied_at)?,
                })
            })
            .collect()
    }
}

fn decode_decimal(row: &SqliteRow, column: &str) -> Result<Decimal, StorageError> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw)
        .map_err(|error| StorageError::Decode(format!("bad decimal in `{column}`: {error}")))
}

fn encode_issues(record: &PaymentRecord) -> Result<String, StorageError> {
    serde_json::to_string(&record.open_issues)
        .map_err(|error| StorageError::Decode(error.to_string()))
}

fn parse_phase(value: &str) -> Result<PaymentPhase, StorageError> {
    PaymentPhase::from_str(value).map_err(StorageError::Decode)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| StorageError::Decode(format!("bad timestamp `{value}`: {error}")))
}
