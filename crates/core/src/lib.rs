pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod payment;
pub mod pricing;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use config::{AppConfig, ConfigError, LoadOptions, PaymentPolicy, PricingPolicy, RateTable};
pub use domain::payment::{
    ConditionIssue, IssueSeverity, PaymentIntentId, PaymentPhase, PaymentRecord, PaymentSplit,
};
pub use domain::shipment::{GeoPoint, QuoteRequest, ShipmentId, UnknownVehicleType, VehicleType};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use payment::{
    EvidenceCategory, PaymentAction, PaymentEvent, PaymentEventKind, PaymentMachine,
    PaymentTransitionError, PickupEvidence, TransitionOutcome,
};
pub use pricing::{
    ChargeComponent, DeterministicPricingEngine, PricingEngine, QuoteLineItem, QuoteResult,
    QuoteValidationError,
};
