pub mod evidence;
pub mod machine;

pub use evidence::{EvidenceCategory, PickupEvidence};
pub use machine::{
    PaymentAction, PaymentEvent, PaymentEventKind, PaymentMachine, PaymentTransitionError,
    TransitionOutcome,
};
