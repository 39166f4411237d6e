use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShipmentId(pub String);

/// Closed vehicle classification. Pricing tables must cover every variant;
/// anything outside this set is rejected at parse time, never defaulted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Sedan,
    Suv,
    Truck,
    Van,
    Coupe,
    Motorcycle,
    RvTrailer,
    Boat,
    Other,
}

impl VehicleType {
    pub const ALL: [VehicleType; 9] = [
        Self::Sedan,
        Self::Suv,
        Self::Truck,
        Self::Van,
        Self::Coupe,
        Self::Motorcycle,
        Self::RvTrailer,
        Self::Boat,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sedan => "sedan",
            Self::Suv => "suv",
            Self::Truck => "truck",
            Self::Van => "van",
            Self::Coupe => "coupe",
            Self::Motorcycle => "motorcycle",
            Self::RvTrailer => "rv_trailer",
            Self::Boat => "boat",
            Self::Other => "other",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unrecognized vehicle type `{0}` (expected sedan|suv|truck|van|coupe|motorcycle|rv_trailer|boat|other)")]
pub struct UnknownVehicleType(pub String);

impl std::str::FromStr for VehicleType {
    type Err = UnknownVehicleType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sedan" => Ok(Self::Sedan),
            "suv" => Ok(Self::Suv),
            "truck" => Ok(Self::Truck),
            "van" => Ok(Self::Van),
            "coupe" => Ok(Self::Coupe),
            "motorcycle" => Ok(Self::Motorcycle),
            "rv_trailer" | "rv-trailer" | "rv/trailer" | "rv" => Ok(Self::RvTrailer),
            "boat" => Ok(Self::Boat),
            "other" => Ok(Self::Other),
            other => Err(UnknownVehicleType(other.to_owned())),
        }
    }
}

/// WGS84 coordinate pair as supplied by the geocoding boundary.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub vehicle_type: VehicleType,
    pub distance_miles: Decimal,
    pub vehicle_count: u32,
    pub is_accident_recovery: bool,
    pub pickup_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub fuel_price_per_gallon: Decimal,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{UnknownVehicleType, VehicleType};

    #[test]
    fn parses_every_canonical_vehicle_type_string() {
        for vehicle_type in VehicleType::ALL {
            let parsed = VehicleType::from_str(vehicle_type.as_str()).expect("canonical round trip");
            assert_eq!(parsed, vehicle_type);
        }
    }

    #[test]
    fn parses_rv_trailer_spellings() {
        assert_eq!(VehicleType::from_str("RV/Trailer"), Ok(VehicleType::RvTrailer));
        assert_eq!(VehicleType::from_str("rv-trailer"), Ok(VehicleType::RvTrailer));
    }

    #[test]
    fn rejects_unknown_vehicle_type() {
        let error = VehicleType::from_str("hovercraft").expect_err("must not default");
        assert_eq!(error, UnknownVehicleType("hovercraft".to_owned()));
    }
}
