use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::shipment::ShipmentId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentIntentId(pub String);

/// Payment lifecycle phase. `Completed`, `CaptureFailed`, and `Cancelled`
/// are terminal; no transition may leave them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPhase {
    Created,
    AuthorizationPending,
    UpfrontCaptured,
    AwaitingDelivery,
    FinalCaptureInProgress,
    Completed,
    CaptureFailed,
    Cancelled,
}

impl PaymentPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::CaptureFailed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AuthorizationPending => "authorization_pending",
            Self::UpfrontCaptured => "upfront_captured",
            Self::AwaitingDelivery => "awaiting_delivery",
            Self::FinalCaptureInProgress => "final_capture_in_progress",
            Self::Completed => "completed",
            Self::CaptureFailed => "capture_failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for PaymentPhase {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "created" => Ok(Self::Created),
            "authorization_pending" => Ok(Self::AuthorizationPending),
            "upfront_captured" => Ok(Self::UpfrontCaptured),
            "awaiting_delivery" => Ok(Self::AwaitingDelivery),
            "final_capture_in_progress" => Ok(Self::FinalCaptureInProgress),
            "completed" => Ok(Self::Completed),
            "capture_failed" => Ok(Self::CaptureFailed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown payment phase `{other}`")),
        }
    }
}

/// Upfront/remaining amounts captured against a single authorization hold.
///
/// The remainder absorbs the rounding error so that
/// `upfront + remaining == total` holds exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSplit {
    pub upfront: Decimal,
    pub remaining: Decimal,
}

impl PaymentSplit {
    pub fn of(total: Decimal, upfront_pct: Decimal) -> Self {
        let upfront =
            (total * upfront_pct).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Self { upfront, remaining: total - upfront }
    }

    pub fn total(&self) -> Decimal {
        self.upfront + self.remaining
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Minor,
    Major,
}

/// Vehicle-condition issue reported alongside pickup verification. Major
/// issues never block the phase transition; they stay on the record for
/// human review.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionIssue {
    pub severity: IssueSeverity,
    pub note: String,
}

/// The mutable entity tracked through the payment lifecycle. Created when a
/// quote is accepted; mutated only by `payment::PaymentMachine` transitions;
/// logically immutable once a terminal phase is reached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub shipment_id: ShipmentId,
    pub total_quoted: Decimal,
    pub split: PaymentSplit,
    pub phase: PaymentPhase,
    pub payment_intent_id: Option<PaymentIntentId>,
    pub delivery_confirmed_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub failure_reason: Option<String>,
    pub open_issues: Vec<ConditionIssue>,
    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Opens a record in `Created` with the split fixed from the accepted
    /// quote total. The split is never recomputed afterwards, even if the
    /// total is later disputed; disputes are handled as a new record.
    /// A negative total has no quote that could have produced it and is
    /// rejected outright.
    pub fn new(
        shipment_id: ShipmentId,
        total_quoted: Decimal,
        upfront_pct: Decimal,
    ) -> Result<Self, DomainError> {
        if total_quoted < Decimal::ZERO {
            return Err(DomainError::InvariantViolation(format!(
                "total_quoted must not be negative, got {total_quoted}"
            )));
        }

        Ok(Self {
            shipment_id,
            total_quoted,
            split: PaymentSplit::of(total_quoted, upfront_pct),
            phase: PaymentPhase::Created,
            payment_intent_id: None,
            delivery_confirmed_at: None,
            cancel_reason: None,
            failure_reason: None,
            open_issues: Vec::new(),
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::shipment::ShipmentId;
    use crate::errors::DomainError;

    use super::{PaymentPhase, PaymentRecord, PaymentSplit};

    fn pct20() -> Decimal {
        Decimal::new(20, 2)
    }

    #[test]
    fn split_of_round_total_is_exact_twenty_eighty() {
        let split = PaymentSplit::of(Decimal::new(100_000, 2), pct20());
        assert_eq!(split.upfront, Decimal::new(20_000, 2));
        assert_eq!(split.remaining, Decimal::new(80_000, 2));
        assert_eq!(split.total(), Decimal::new(100_000, 2));
    }

    #[test]
    fn remainder_absorbs_rounding_error() {
        // 999.99 * 0.20 = 199.998 -> upfront 200.00, remaining 799.99
        let total = Decimal::new(99_999, 2);
        let split = PaymentSplit::of(total, pct20());
        assert_eq!(split.upfront, Decimal::new(20_000, 2));
        assert_eq!(split.remaining, Decimal::new(79_999, 2));
        assert_eq!(split.total(), total);
    }

    #[test]
    fn split_of_tiny_total_still_sums_exactly() {
        let total = Decimal::new(1, 2);
        let split = PaymentSplit::of(total, pct20());
        assert_eq!(split.total(), total);
    }

    #[test]
    fn negative_quoted_total_is_rejected_at_record_creation() {
        let error = PaymentRecord::new(
            ShipmentId("shp-neg".to_owned()),
            Decimal::new(-100, 2),
            pct20(),
        )
        .expect_err("a negative total must never open a record");

        assert!(matches!(error, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn zero_quoted_total_opens_a_record_with_an_empty_split() {
        let record =
            PaymentRecord::new(ShipmentId("shp-zero".to_owned()), Decimal::ZERO, pct20())
                .expect("zero is a valid quoted total");

        assert_eq!(record.split.upfront, Decimal::ZERO);
        assert_eq!(record.split.remaining, Decimal::ZERO);
        assert_eq!(record.phase, PaymentPhase::Created);
    }

    #[test]
    fn terminal_phases_are_exactly_completed_capture_failed_cancelled() {
        for phase in [
            PaymentPhase::Created,
            PaymentPhase::AuthorizationPending,
            PaymentPhase::UpfrontCaptured,
            PaymentPhase::AwaitingDelivery,
            PaymentPhase::FinalCaptureInProgress,
        ] {
            assert!(!phase.is_terminal(), "{phase:?} must not be terminal");
        }
        for phase in
            [PaymentPhase::Completed, PaymentPhase::CaptureFailed, PaymentPhase::Cancelled]
        {
            assert!(phase.is_terminal(), "{phase:?} must be terminal");
        }
    }

    #[test]
    fn phase_strings_round_trip() {
        for phase in [
            PaymentPhase::Created,
            PaymentPhase::AuthorizationPending,
            PaymentPhase::UpfrontCaptured,
            PaymentPhase::AwaitingDelivery,
            PaymentPhase::FinalCaptureInProgress,
            PaymentPhase::Completed,
            PaymentPhase::CaptureFailed,
            PaymentPhase::Cancelled,
        ] {
            assert_eq!(phase.as_str().parse::<PaymentPhase>(), Ok(phase));
        }
    }
}
