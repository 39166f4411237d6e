use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::payment::{PaymentIntentId, PaymentPhase, PaymentRecord};
use crate::payment::evidence::{EvidenceCategory, PickupEvidence};

/// External occurrences reported into the machine by the host. Provider
/// failures arrive as explicit failure events; the machine never talks to
/// the provider itself.
#[derive(Clone, Debug, PartialEq)]
pub enum PaymentEvent {
    RequestAuthorization,
    ConfirmAuthorization { intent_id: PaymentIntentId },
    AuthorizationFailed { reason: String },
    PickupVerified { evidence: PickupEvidence },
    DeliveryConfirmed { at: DateTime<Utc> },
    FinalCaptureSucceeded,
    FinalCaptureFailed { reason: String },
    Cancel { reason: String },
}

impl PaymentEvent {
    pub fn kind(&self) -> PaymentEventKind {
        match self {
            Self::RequestAuthorization => PaymentEventKind::RequestAuthorization,
            Self::ConfirmAuthorization { .. } => PaymentEventKind::ConfirmAuthorization,
            Self::AuthorizationFailed { .. } => PaymentEventKind::AuthorizationFailed,
            Self::PickupVerified { .. } => PaymentEventKind::PickupVerified,
            Self::DeliveryConfirmed { .. } => PaymentEventKind::DeliveryConfirmed,
            Self::FinalCaptureSucceeded => PaymentEventKind::FinalCaptureSucceeded,
            Self::FinalCaptureFailed { .. } => PaymentEventKind::FinalCaptureFailed,
            Self::Cancel { .. } => PaymentEventKind::Cancel,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEventKind {
    RequestAuthorization,
    ConfirmAuthorization,
    AuthorizationFailed,
    PickupVerified,
    DeliveryConfirmed,
    FinalCaptureSucceeded,
    FinalCaptureFailed,
    Cancel,
}

impl PaymentEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RequestAuthorization => "request_authorization",
            Self::ConfirmAuthorization => "confirm_authorization",
            Self::AuthorizationFailed => "authorization_failed",
            Self::PickupVerified => "pickup_verified",
            Self::DeliveryConfirmed => "delivery_confirmed",
            Self::FinalCaptureSucceeded => "final_capture_succeeded",
            Self::FinalCaptureFailed => "final_capture_failed",
            Self::Cancel => "cancel",
        }
    }
}

/// Side effects the host must perform after a successful transition. The
/// machine sequences them; the host owns all provider and persistence I/O.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentAction {
    HoldFullAmount,
    CaptureUpfront,
    CaptureRemainder,
    ReleaseHold,
    FlagForOperatorReview,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: PaymentPhase,
    pub to: PaymentPhase,
    pub event: PaymentEventKind,
    pub actions: Vec<PaymentAction>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PaymentTransitionError {
    #[error("record is terminal in phase {phase:?}; event {event:?} rejected")]
    AlreadyTerminal { phase: PaymentPhase, event: PaymentEventKind },
    #[error("invalid transition from {from:?} using event {event:?}")]
    InvalidTransition { from: PaymentPhase, event: PaymentEventKind },
    #[error("pickup verification is missing required evidence: {missing:?}")]
    MissingRequiredEvidence { missing: Vec<EvidenceCategory> },
    #[error("payment intent already assigned as {existing:?}")]
    DuplicateIntentAssignment { existing: PaymentIntentId },
}

/// Pure transition applicator for `PaymentRecord`. Holds no state of its
/// own; at-most-once effect application is the caller's responsibility via
/// a conditional update on the expected pre-state phase.
#[derive(Clone, Debug, Default)]
pub struct PaymentMachine;

impl PaymentMachine {
    pub fn initial_phase(&self) -> PaymentPhase {
        PaymentPhase::Created
    }

    pub fn apply(
        &self,
        record: &mut PaymentRecord,
        event: PaymentEvent,
    ) -> Result<TransitionOutcome, PaymentTransitionError> {
        transition(record, event)
    }

    pub fn apply_with_audit<S>(
        &self,
        record: &mut PaymentRecord,
        event: PaymentEvent,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, PaymentTransitionError>
    where
        S: AuditSink,
    {
        let result = self.apply(record, event);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        Some(record.shipment_id.clone()),
                        audit.external_ref.clone(),
                        audit.correlation_id.clone(),
                        "payment.transition_applied",
                        AuditCategory::Payment,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", outcome.from.as_str())
                    .with_metadata("to", outcome.to.as_str())
                    .with_metadata("event", outcome.event.as_str()),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        Some(record.shipment_id.clone()),
                        audit.external_ref.clone(),
                        audit.correlation_id.clone(),
                        "payment.transition_rejected",
                        AuditCategory::Payment,
                        audit.actor.clone(),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("phase", record.phase.as_str())
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

fn transition(
    record: &mut PaymentRecord,
    event: PaymentEvent,
) -> Result<TransitionOutcome, PaymentTransitionError> {
    use PaymentAction::{
        CaptureRemainder, CaptureUpfront, FlagForOperatorReview, HoldFullAmount, ReleaseHold,
    };
    use PaymentPhase::{
        AuthorizationPending, AwaitingDelivery, Cancelled, CaptureFailed, Completed, Created,
        FinalCaptureInProgress, UpfrontCaptured,
    };

    let from = record.phase;
    let kind = event.kind();

    if from.is_terminal() {
        return Err(PaymentTransitionError::AlreadyTerminal { phase: from, event: kind });
    }

    let (to, actions) = match (from, event) {
        (Created, PaymentEvent::RequestAuthorization) => {
            (AuthorizationPending, vec![HoldFullAmount])
        }
        (AuthorizationPending, PaymentEvent::ConfirmAuthorization { intent_id }) => {
            if let Some(existing) = &record.payment_intent_id {
                return Err(PaymentTransitionError::DuplicateIntentAssignment {
                    existing: existing.clone(),
                });
            }
            record.payment_intent_id = Some(intent_id);
            (UpfrontCaptured, vec![CaptureUpfront])
        }
        (AuthorizationPending, PaymentEvent::AuthorizationFailed { reason }) => {
            record.cancel_reason = Some(reason);
            (Cancelled, vec![ReleaseHold])
        }
        (UpfrontCaptured, PaymentEvent::PickupVerified { evidence }) => {
            let missing = evidence.missing_required();
            if !missing.is_empty() {
                return Err(PaymentTransitionError::MissingRequiredEvidence { missing });
            }
            // Major issues never block progress; they stay on the record
            // for human review.
            let needs_review = evidence.has_major_issue();
            record.open_issues.extend(evidence.issues);
            let actions = if needs_review { vec![FlagForOperatorReview] } else { Vec::new() };
            (AwaitingDelivery, actions)
        }
        (AwaitingDelivery, PaymentEvent::DeliveryConfirmed { at }) => {
            if record.delivery_confirmed_at.is_some() {
                return Err(PaymentTransitionError::InvalidTransition { from, event: kind });
            }
            record.delivery_confirmed_at = Some(at);
            (FinalCaptureInProgress, vec![CaptureRemainder])
        }
        (FinalCaptureInProgress, PaymentEvent::FinalCaptureSucceeded) => (Completed, Vec::new()),
        (FinalCaptureInProgress, PaymentEvent::FinalCaptureFailed { reason }) => {
            record.failure_reason = Some(reason);
            (CaptureFailed, vec![FlagForOperatorReview])
        }
        (UpfrontCaptured, PaymentEvent::Cancel { reason })
        | (AwaitingDelivery, PaymentEvent::Cancel { reason }) => {
            record.cancel_reason = Some(reason);
            (Cancelled, vec![ReleaseHold])
        }
        _ => {
            return Err(PaymentTransitionError::InvalidTransition { from, event: kind });
        }
    };

    record.phase = to;
    Ok(TransitionOutcome { from, to, event: kind, actions })
}
