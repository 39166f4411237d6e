pub mod distance;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PricingPolicy;
use crate::domain::shipment::QuoteRequest;

/// Named contributions to a quote, in the order they are applied and
/// reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeComponent {
    BaseRate,
    DistanceCharge,
    FuelSurcharge,
    ExpediteSurcharge,
    AccidentRecovery,
    VehicleCountAdjustment,
}

impl ChargeComponent {
    pub const ORDERED: [ChargeComponent; 6] = [
        Self::BaseRate,
        Self::DistanceCharge,
        Self::FuelSurcharge,
        Self::ExpediteSurcharge,
        Self::AccidentRecovery,
        Self::VehicleCountAdjustment,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::BaseRate => "base rate",
            Self::DistanceCharge => "distance charge",
            Self::FuelSurcharge => "fuel surcharge",
            Self::ExpediteSurcharge => "expedite surcharge",
            Self::AccidentRecovery => "accident recovery",
            Self::VehicleCountAdjustment => "vehicle count adjustment",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteLineItem {
    pub component: ChargeComponent,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteResult {
    pub total: Decimal,
    pub breakdown: Vec<QuoteLineItem>,
}

impl QuoteResult {
    pub fn component(&self, component: ChargeComponent) -> Decimal {
        self.breakdown
            .iter()
            .find(|line| line.component == component)
            .map(|line| line.amount)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn breakdown_sum(&self) -> Decimal {
        self.breakdown.iter().map(|line| line.amount).sum()
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QuoteValidationError {
    #[error("distance_miles must not be negative, got {distance_miles}")]
    NegativeDistance { distance_miles: Decimal },
    #[error("vehicle_count must be at least 1")]
    ZeroVehicleCount,
    #[error("fuel_price_per_gallon must not be negative, got {price}")]
    NegativeFuelPrice { price: Decimal },
    #[error("delivery_date {delivery} precedes pickup_date {pickup}")]
    InvertedDateRange { pickup: NaiveDate, delivery: NaiveDate },
}

pub trait PricingEngine: Send + Sync {
    fn quote(&self, request: &QuoteRequest) -> Result<QuoteResult, QuoteValidationError>;
}

/// Pure, policy-injected quote calculator. No I/O, no ambient state;
/// identical inputs always produce identical results.
#[derive(Clone, Debug)]
pub struct DeterministicPricingEngine {
    policy: PricingPolicy,
}

impl DeterministicPricingEngine {
    pub fn new(policy: PricingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }
}

impl Default for DeterministicPricingEngine {
    fn default() -> Self {
        Self::new(PricingPolicy::default())
    }
}

impl PricingEngine for DeterministicPricingEngine {
    fn quote(&self, request: &QuoteRequest) -> Result<QuoteResult, QuoteValidationError> {
        compute_quote(request, &self.policy)
    }
}

pub fn compute_quote(
    request: &QuoteRequest,
    policy: &PricingPolicy,
) -> Result<QuoteResult, QuoteValidationError> {
    validate(request)?;

    let base = policy.base_rates.rate(request.vehicle_type);
    let distance_charge = request.distance_miles * policy.per_mile_rates.rate(request.vehicle_type);

    // Surcharge floors at zero: fuel below baseline never discounts.
    let over_baseline =
        (request.fuel_price_per_gallon - policy.fuel_baseline_per_gallon).max(Decimal::ZERO);
    let fuel_surcharge = over_baseline * policy.fuel_surcharge_per_mile * request.distance_miles;

    let subtotal = base + distance_charge + fuel_surcharge;

    let expedite_surcharge = if is_expedited(request, policy.expedite_threshold_days) {
        subtotal * policy.expedite_markup_pct
    } else {
        Decimal::ZERO
    };

    let accident_recovery =
        if request.is_accident_recovery { policy.accident_recovery_fee } else { Decimal::ZERO };

    let per_vehicle = subtotal + expedite_surcharge + accident_recovery;

    // First vehicle at full rate, each additional one discounted.
    let additional_vehicles = Decimal::from(request.vehicle_count - 1);
    let vehicle_count_adjustment =
        per_vehicle * additional_vehicles * (Decimal::ONE - policy.additional_vehicle_discount_pct);

    let total = round_cents(per_vehicle + vehicle_count_adjustment);

    let mut breakdown = vec![
        QuoteLineItem { component: ChargeComponent::BaseRate, amount: round_cents(base) },
        QuoteLineItem {
            component: ChargeComponent::DistanceCharge,
            amount: round_cents(distance_charge),
        },
        QuoteLineItem {
            component: ChargeComponent::FuelSurcharge,
            amount: round_cents(fuel_surcharge),
        },
        QuoteLineItem {
            component: ChargeComponent::ExpediteSurcharge,
            amount: round_cents(expedite_surcharge),
        },
        QuoteLineItem {
            component: ChargeComponent::AccidentRecovery,
            amount: round_cents(accident_recovery),
        },
        QuoteLineItem {
            component: ChargeComponent::VehicleCountAdjustment,
            amount: round_cents(vehicle_count_adjustment),
        },
    ];

    reconcile(&mut breakdown, total);

    Ok(QuoteResult { total, breakdown })
}

fn validate(request: &QuoteRequest) -> Result<(), QuoteValidationError> {
    if request.distance_miles < Decimal::ZERO {
        return Err(QuoteValidationError::NegativeDistance {
            distance_miles: request.distance_miles,
        });
    }

    if request.vehicle_count == 0 {
        return Err(QuoteValidationError::ZeroVehicleCount);
    }

    if request.fuel_price_per_gallon < Decimal::ZERO {
        return Err(QuoteValidationError::NegativeFuelPrice {
            price: request.fuel_price_per_gallon,
        });
    }

    if let (Some(pickup), Some(delivery)) = (request.pickup_date, request.delivery_date) {
        if delivery < pickup {
            return Err(QuoteValidationError::InvertedDateRange { pickup, delivery });
        }
    }

    Ok(())
}

/// A missing date means the shipment is implicitly urgent.
fn is_expedited(request: &QuoteRequest, threshold_days: i64) -> bool {
    match (request.pickup_date, request.delivery_date) {
        (Some(pickup), Some(delivery)) => (delivery - pickup).num_days() < threshold_days,
        _ => true,
    }
}

/// Pushes the rounding residue into the last nonzero component so the
/// breakdown sums to the rounded total exactly. The base rate is always
/// positive, so a nonzero component always exists.
fn reconcile(breakdown: &mut [QuoteLineItem], total: Decimal) {
    let sum: Decimal = breakdown.iter().map(|line| line.amount).sum();
    let residue = total - sum;
    if residue == Decimal::ZERO {
        return;
    }

    if let Some(line) = breakdown.iter_mut().rev().find(|line| line.amount != Decimal::ZERO) {
        line.amount += residue;
    }
}

fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use crate::domain::shipment::{QuoteRequest, VehicleType};

    use super::{
        ChargeComponent, DeterministicPricingEngine, PricingEngine, QuoteValidationError,
    };

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn relaxed_request(vehicle_type: VehicleType, distance_miles: Decimal) -> QuoteRequest {
        QuoteRequest {
            vehicle_type,
            distance_miles,
            vehicle_count: 1,
            is_accident_recovery: false,
            pickup_date: Some(date(2026, 9, 1)),
            delivery_date: Some(date(2026, 9, 15)),
            fuel_price_per_gallon: Decimal::new(350, 2),
        }
    }

    #[test]
    fn sedan_500_miles_no_surcharges_prices_base_plus_distance() {
        let engine = DeterministicPricingEngine::default();
        let result =
            engine.quote(&relaxed_request(VehicleType::Sedan, Decimal::from(500))).expect("quote");

        // 595 base + 500 * 0.70 distance
        assert_eq!(result.total, Decimal::new(94_500, 2));
        assert_eq!(result.component(ChargeComponent::BaseRate), Decimal::new(59_500, 2));
        assert_eq!(result.component(ChargeComponent::DistanceCharge), Decimal::new(35_000, 2));
        assert_eq!(result.component(ChargeComponent::FuelSurcharge), Decimal::ZERO);
        assert_eq!(result.component(ChargeComponent::ExpediteSurcharge), Decimal::ZERO);
        assert_eq!(result.component(ChargeComponent::AccidentRecovery), Decimal::ZERO);
        assert_eq!(result.component(ChargeComponent::VehicleCountAdjustment), Decimal::ZERO);
    }

    #[test]
    fn quote_is_deterministic_for_identical_input() {
        let engine = DeterministicPricingEngine::default();
        let request = QuoteRequest {
            vehicle_type: VehicleType::Truck,
            distance_miles: Decimal::new(12_347, 2),
            vehicle_count: 3,
            is_accident_recovery: true,
            pickup_date: None,
            delivery_date: None,
            fuel_price_per_gallon: Decimal::new(413, 2),
        };

        let first = engine.quote(&request).expect("first quote");
        let second = engine.quote(&request).expect("second quote");
        assert_eq!(first, second);
    }

    #[test]
    fn breakdown_reconciles_exactly_to_total() {
        let engine = DeterministicPricingEngine::default();
        let request = QuoteRequest {
            vehicle_type: VehicleType::Boat,
            distance_miles: Decimal::new(7_777, 1),
            vehicle_count: 3,
            is_accident_recovery: true,
            pickup_date: Some(date(2026, 9, 1)),
            delivery_date: Some(date(2026, 9, 3)),
            fuel_price_per_gallon: Decimal::new(417, 2),
        };

        let result = engine.quote(&request).expect("quote");
        assert_eq!(result.breakdown_sum(), result.total);
        assert_eq!(result.total, result.total.round_dp(2));

        let order: Vec<_> = result.breakdown.iter().map(|line| line.component).collect();
        assert_eq!(order, ChargeComponent::ORDERED);
    }

    #[test]
    fn total_is_monotone_in_distance() {
        let engine = DeterministicPricingEngine::default();
        let mut previous = Decimal::MIN;
        for miles in [0u32, 1, 50, 500, 2_500] {
            let total = engine
                .quote(&relaxed_request(VehicleType::Suv, Decimal::from(miles)))
                .expect("quote")
                .total;
            assert!(total >= previous, "total regressed at {miles} miles");
            previous = total;
        }
    }

    #[test]
    fn negative_distance_is_rejected() {
        let engine = DeterministicPricingEngine::default();
        let error = engine
            .quote(&relaxed_request(VehicleType::Sedan, Decimal::from(-1)))
            .expect_err("negative distance");
        assert!(matches!(error, QuoteValidationError::NegativeDistance { .. }));
    }

    #[test]
    fn zero_vehicle_count_is_rejected_not_priced_at_zero() {
        let engine = DeterministicPricingEngine::default();
        let mut request = relaxed_request(VehicleType::Truck, Decimal::ZERO);
        request.vehicle_count = 0;

        let error = engine.quote(&request).expect_err("zero vehicles");
        assert_eq!(error, QuoteValidationError::ZeroVehicleCount);
    }

    #[test]
    fn negative_fuel_price_is_rejected() {
        let engine = DeterministicPricingEngine::default();
        let mut request = relaxed_request(VehicleType::Sedan, Decimal::from(100));
        request.fuel_price_per_gallon = Decimal::new(-1, 0);

        let error = engine.quote(&request).expect_err("negative fuel price");
        assert!(matches!(error, QuoteValidationError::NegativeFuelPrice { .. }));
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let engine = DeterministicPricingEngine::default();
        let mut request = relaxed_request(VehicleType::Sedan, Decimal::from(100));
        request.pickup_date = Some(date(2026, 9, 15));
        request.delivery_date = Some(date(2026, 9, 1));

        let error = engine.quote(&request).expect_err("inverted dates");
        assert!(matches!(error, QuoteValidationError::InvertedDateRange { .. }));
    }

    #[test]
    fn narrow_date_gap_applies_expedite_markup() {
        let engine = DeterministicPricingEngine::default();
        let mut rushed = relaxed_request(VehicleType::Sedan, Decimal::from(500));
        rushed.pickup_date = Some(date(2026, 9, 1));
        rushed.delivery_date = Some(date(2026, 9, 3));

        let relaxed_total =
            engine.quote(&relaxed_request(VehicleType::Sedan, Decimal::from(500))).unwrap().total;
        let rushed_result = engine.quote(&rushed).expect("rushed quote");

        // +25% of the 945.00 subtotal
        assert_eq!(
            rushed_result.component(ChargeComponent::ExpediteSurcharge),
            Decimal::new(23_625, 2)
        );
        assert!(rushed_result.total > relaxed_total);
    }

    #[test]
    fn missing_dates_are_implicitly_urgent() {
        let engine = DeterministicPricingEngine::default();
        let mut request = relaxed_request(VehicleType::Sedan, Decimal::from(500));
        request.pickup_date = None;
        request.delivery_date = None;

        let result = engine.quote(&request).expect("quote");
        assert!(result.component(ChargeComponent::ExpediteSurcharge) > Decimal::ZERO);
    }

    #[test]
    fn fuel_below_baseline_gives_no_discount() {
        let engine = DeterministicPricingEngine::default();
        let mut cheap_fuel = relaxed_request(VehicleType::Sedan, Decimal::from(500));
        cheap_fuel.fuel_price_per_gallon = Decimal::new(200, 2);

        let at_baseline =
            engine.quote(&relaxed_request(VehicleType::Sedan, Decimal::from(500))).unwrap();
        let below_baseline = engine.quote(&cheap_fuel).expect("quote");

        assert_eq!(below_baseline.total, at_baseline.total);
        assert_eq!(below_baseline.component(ChargeComponent::FuelSurcharge), Decimal::ZERO);
    }

    #[test]
    fn fuel_above_baseline_adds_distance_proportional_surcharge() {
        let engine = DeterministicPricingEngine::default();
        let mut pricey_fuel = relaxed_request(VehicleType::Sedan, Decimal::from(500));
        pricey_fuel.fuel_price_per_gallon = Decimal::new(450, 2);

        let result = engine.quote(&pricey_fuel).expect("quote");
        // (4.50 - 3.50) * 0.05 per mile * 500 miles
        assert_eq!(result.component(ChargeComponent::FuelSurcharge), Decimal::new(2_500, 2));
    }

    #[test]
    fn accident_recovery_adds_the_flat_fee() {
        let engine = DeterministicPricingEngine::default();
        let mut recovery = relaxed_request(VehicleType::Sedan, Decimal::from(500));
        recovery.is_accident_recovery = true;

        let plain =
            engine.quote(&relaxed_request(VehicleType::Sedan, Decimal::from(500))).unwrap().total;
        let result = engine.quote(&recovery).expect("quote");

        assert_eq!(result.component(ChargeComponent::AccidentRecovery), Decimal::new(15_000, 2));
        assert_eq!(result.total - plain, Decimal::new(15_000, 2));
    }

    #[test]
    fn additional_vehicles_are_discounted_not_free() {
        let engine = DeterministicPricingEngine::default();
        let single = relaxed_request(VehicleType::Sedan, Decimal::from(500));
        let mut pair = single.clone();
        pair.vehicle_count = 2;

        let single_total = engine.quote(&single).unwrap().total;
        let pair_result = engine.quote(&pair).expect("quote");

        assert!(pair_result.total > single_total);
        assert!(pair_result.total < single_total * Decimal::from(2));
        // second sedan at 95% of 945.00
        assert_eq!(
            pair_result.component(ChargeComponent::VehicleCountAdjustment),
            Decimal::new(89_775, 2)
        );
    }
}
