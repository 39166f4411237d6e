pub mod payment;
pub mod shipment;
