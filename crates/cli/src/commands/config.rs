use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use carhaul_core::config::{AppConfig, LoadOptions, RateTable};
use carhaul_core::VehicleType;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: Option<&str>| {
        field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "database.url",
        &config.database.url,
        source("database.url", Some("CARHAUL_DATABASE_URL")),
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        source("database.max_connections", Some("CARHAUL_DATABASE_MAX_CONNECTIONS")),
    ));
    lines.push(render_line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        source("database.timeout_secs", Some("CARHAUL_DATABASE_TIMEOUT_SECS")),
    ));

    lines.push(render_line(
        "pricing.base_rates",
        &render_rate_table(&config.pricing.base_rates),
        source("pricing.base_rates", None),
    ));
    lines.push(render_line(
        "pricing.per_mile_rates",
        &render_rate_table(&config.pricing.per_mile_rates),
        source("pricing.per_mile_rates", None),
    ));
    lines.push(render_line(
        "pricing.road_correction_factor",
        &config.pricing.road_correction_factor.to_string(),
        source("pricing.road_correction_factor", Some("CARHAUL_PRICING_ROAD_CORRECTION_FACTOR")),
    ));
    lines.push(render_line(
        "pricing.fuel_baseline_per_gallon",
        &config.pricing.fuel_baseline_per_gallon.to_string(),
        source(
            "pricing.fuel_baseline_per_gallon",
            Some("CARHAUL_PRICING_FUEL_BASELINE_PER_GALLON"),
        ),
    ));
    lines.push(render_line(
        "pricing.fuel_surcharge_per_mile",
        &config.pricing.fuel_surcharge_per_mile.to_string(),
        source("pricing.fuel_surcharge_per_mile", Some("CARHAUL_PRICING_FUEL_SURCHARGE_PER_MILE")),
    ));
    lines.push(render_line(
        "pricing.expedite_threshold_days",
        &config.pricing.expedite_threshold_days.to_string(),
        source("pricing.expedite_threshold_days", Some("CARHAUL_PRICING_EXPEDITE_THRESHOLD_DAYS")),
    ));
    lines.push(render_line(
        "pricing.expedite_markup_pct",
        &config.pricing.expedite_markup_pct.to_string(),
        source("pricing.expedite_markup_pct", Some("CARHAUL_PRICING_EXPEDITE_MARKUP_PCT")),
    ));
    lines.push(render_line(
        "pricing.accident_recovery_fee",
        &config.pricing.accident_recovery_fee.to_string(),
        source("pricing.accident_recovery_fee", Some("CARHAUL_PRICING_ACCIDENT_RECOVERY_FEE")),
    ));
    lines.push(render_line(
        "pricing.additional_vehicle_discount_pct",
        &config.pricing.additional_vehicle_discount_pct.to_string(),
        source(
            "pricing.additional_vehicle_discount_pct",
            Some("CARHAUL_PRICING_ADDITIONAL_VEHICLE_DISCOUNT_PCT"),
        ),
    ));

    lines.push(render_line(
        "payment.upfront_pct",
        &config.payment.upfront_pct.to_string(),
        source("payment.upfront_pct", Some("CARHAUL_PAYMENT_UPFRONT_PCT")),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", Some("CARHAUL_LOGGING_LEVEL")),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", Some("CARHAUL_LOGGING_FORMAT")),
    ));

    lines.join("\n")
}

fn render_rate_table(table: &RateTable) -> String {
    VehicleType::ALL
        .into_iter()
        .map(|vehicle_type| format!("{}={}", vehicle_type.as_str(), table.rate(vehicle_type)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("carhaul.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/carhaul.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
