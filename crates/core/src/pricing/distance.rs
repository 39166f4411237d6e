use rust_decimal::Decimal;

use crate::domain::shipment::GeoPoint;

const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Haversine great-circle distance in statute miles.
pub fn great_circle_miles(origin: GeoPoint, destination: GeoPoint) -> f64 {
    let lat_a = origin.lat_deg.to_radians();
    let lat_b = destination.lat_deg.to_radians();
    let d_lat = (destination.lat_deg - origin.lat_deg).to_radians();
    let d_lon = (destination.lon_deg - origin.lon_deg).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MILES * c
}

/// Billable road distance: great-circle miles scaled by the empirical
/// road-correction factor (straight lines underestimate real routes; the
/// factor is policy, not geometry) and rounded to a tenth of a mile.
pub fn road_miles(origin: GeoPoint, destination: GeoPoint, road_correction_factor: f64) -> Decimal {
    let corrected = great_circle_miles(origin, destination) * road_correction_factor;
    Decimal::new((corrected * 10.0).round() as i64, 1)
}
