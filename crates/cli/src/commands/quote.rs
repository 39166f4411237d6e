use std::str::FromStr;

use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::json;

use carhaul_core::config::{AppConfig, LoadOptions};
use carhaul_core::pricing::distance::road_miles;
use carhaul_core::pricing::PricingEngine as _;
use carhaul_core::{DeterministicPricingEngine, GeoPoint, QuoteRequest, VehicleType};

use crate::commands::CommandResult;

#[derive(Debug, Args)]
pub struct QuoteArgs {
    #[arg(long, help = "Vehicle type (sedan, suv, truck, van, coupe, motorcycle, rv_trailer, boat, other)")]
    pub vehicle_type: String,
    #[arg(long, help = "Billable distance in miles; omit when giving --from/--to")]
    pub distance_miles: Option<String>,
    #[arg(long, help = "Origin coordinates as `lat,lon`", requires = "to")]
    pub from: Option<String>,
    #[arg(long, help = "Destination coordinates as `lat,lon`", requires = "from")]
    pub to: Option<String>,
    #[arg(long, default_value_t = 1, help = "Number of vehicles on the shipment")]
    pub vehicle_count: u32,
    #[arg(long, help = "Apply the accident recovery fee")]
    pub accident_recovery: bool,
    #[arg(long, help = "Pickup date (YYYY-MM-DD)")]
    pub pickup_date: Option<NaiveDate>,
    #[arg(long, help = "Delivery date (YYYY-MM-DD)")]
    pub delivery_date: Option<NaiveDate>,
    #[arg(long, help = "Current fuel price per gallon; defaults to the policy baseline")]
    pub fuel_price: Option<String>,
}

pub fn run(args: &QuoteArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "quote",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let vehicle_type = match VehicleType::from_str(&args.vehicle_type) {
        Ok(vehicle_type) => vehicle_type,
        Err(error) => {
            return CommandResult::failure("quote", "invalid_argument", error.to_string(), 3);
        }
    };

    let distance_miles = match resolve_distance(args, config.pricing.road_correction_factor) {
        Ok(distance_miles) => distance_miles,
        Err(message) => {
            return CommandResult::failure("quote", "invalid_argument", message, 3);
        }
    };

    let fuel_price_per_gallon = match &args.fuel_price {
        Some(raw) => match Decimal::from_str(raw.trim()) {
            Ok(price) => price,
            Err(_) => {
                return CommandResult::failure(
                    "quote",
                    "invalid_argument",
                    format!("--fuel-price must be a decimal number, got `{raw}`"),
                    3,
                );
            }
        },
        None => config.pricing.fuel_baseline_per_gallon,
    };

    let request = QuoteRequest {
        vehicle_type,
        distance_miles,
        vehicle_count: args.vehicle_count,
        is_accident_recovery: args.accident_recovery,
        pickup_date: args.pickup_date,
        delivery_date: args.delivery_date,
        fuel_price_per_gallon,
    };

    let engine = DeterministicPricingEngine::new(config.pricing);
    match engine.quote(&request) {
        Ok(result) => {
            let breakdown: Vec<_> = result
                .breakdown
                .iter()
                .map(|line| {
                    json!({
                        "component": line.component.label(),
                        "amount": line.amount.to_string(),
                    })
                })
                .collect();
            let data = json!({
                "total": result.total.to_string(),
                "distance_miles": distance_miles.to_string(),
                "breakdown": breakdown,
            });
            CommandResult::success_with_data(
                "quote",
                format!("quoted {} at {}", vehicle_type.as_str(), result.total),
                Some(data),
            )
        }
        Err(error) => {
            CommandResult::failure("quote", "quote_validation", error.to_string(), 4)
        }
    }
}

fn resolve_distance(args: &QuoteArgs, road_correction_factor: f64) -> Result<Decimal, String> {
    match (&args.distance_miles, &args.from, &args.to) {
        (Some(raw), None, None) => Decimal::from_str(raw.trim())
            .map_err(|_| format!("--distance-miles must be a decimal number, got `{raw}`")),
        (None, Some(from), Some(to)) => {
            let origin = parse_point("--from", from)?;
            let destination = parse_point("--to", to)?;
            Ok(road_miles(origin, destination, road_correction_factor))
        }
        (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
            Err("give either --distance-miles or --from/--to, not both".to_string())
        }
        (None, _, _) => Err("one of --distance-miles or --from/--to is required".to_string()),
    }
}

fn parse_point(flag: &str, raw: &str) -> Result<GeoPoint, String> {
    let (lat, lon) = raw
        .split_once(',')
        .ok_or_else(|| format!("{flag} must be `lat,lon`, got `{raw}`"))?;
    let lat_deg: f64 =
        lat.trim().parse().map_err(|_| format!("{flag} latitude is not a number: `{lat}`"))?;
    let lon_deg: f64 =
        lon.trim().parse().map_err(|_| format!("{flag} longitude is not a number: `{lon}`"))?;

    if !(-90.0..=90.0).contains(&lat_deg) {
        return Err(format!("{flag} latitude must be in -90..=90, got {lat_deg}"));
    }
    if !(-180.0..=180.0).contains(&lon_deg) {
        return Err(format!("{flag} longitude must be in -180..=180, got {lon_deg}"));
    }

    Ok(GeoPoint { lat_deg, lon_deg })
}
