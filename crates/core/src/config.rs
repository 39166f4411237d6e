use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::shipment::VehicleType;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub pricing: PricingPolicy,
    pub payment: PaymentPolicy,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Per-vehicle-type dollar table. One field per variant keeps the mapping
/// total by construction; there is no fallback path for a missing entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateTable {
    pub sedan: Decimal,
    pub suv: Decimal,
    pub truck: Decimal,
    pub van: Decimal,
    pub coupe: Decimal,
    pub motorcycle: Decimal,
    pub rv_trailer: Decimal,
    pub boat: Decimal,
    pub other: Decimal,
}

impl RateTable {
    pub fn rate(&self, vehicle_type: VehicleType) -> Decimal {
        match vehicle_type {
            VehicleType::Sedan => self.sedan,
            VehicleType::Suv => self.suv,
            VehicleType::Truck => self.truck,
            VehicleType::Van => self.van,
            VehicleType::Coupe => self.coupe,
            VehicleType::Motorcycle => self.motorcycle,
            VehicleType::RvTrailer => self.rv_trailer,
            VehicleType::Boat => self.boat,
            VehicleType::Other => self.other,
        }
    }
}

/// Every constant in the quote formula is product policy, not code. Defaults
/// below are the shipped policy; deployments override them via
/// `carhaul.toml` or `CARHAUL_PRICING_*`.
#[derive(Clone, Debug)]
pub struct PricingPolicy {
    pub base_rates: RateTable,
    pub per_mile_rates: RateTable,
    /// Straight-line miles underestimate real routes; billable distance is
    /// great-circle distance times this factor.
    pub road_correction_factor: f64,
    pub fuel_baseline_per_gallon: Decimal,
    /// Dollars added per mile for each dollar the fuel price sits above the
    /// baseline. The surcharge floors at zero below baseline.
    pub fuel_surcharge_per_mile: Decimal,
    /// Pickup/delivery gaps under this many days (or missing dates) count
    /// as expedited.
    pub expedite_threshold_days: i64,
    pub expedite_markup_pct: Decimal,
    pub accident_recovery_fee: Decimal,
    /// Each vehicle after the first is billed at (1 - this) of the
    /// per-vehicle total.
    pub additional_vehicle_discount_pct: Decimal,
}

#[derive(Clone, Debug)]
pub struct PaymentPolicy {
    /// Share of the quoted total captured at booking; the rest stays on
    /// hold until delivery confirmation.
    pub upfront_pct: Decimal,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://carhaul.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            pricing: PricingPolicy::default(),
            payment: PaymentPolicy { upfront_pct: Decimal::new(20, 2) },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            base_rates: RateTable {
                sedan: Decimal::new(595, 0),
                suv: Decimal::new(695, 0),
                truck: Decimal::new(795, 0),
                van: Decimal::new(745, 0),
                coupe: Decimal::new(610, 0),
                motorcycle: Decimal::new(450, 0),
                rv_trailer: Decimal::new(995, 0),
                boat: Decimal::new(1095, 0),
                // Unclassified vehicles take the mid-tier SUV rate.
                other: Decimal::new(695, 0),
            },
            per_mile_rates: RateTable {
                sedan: Decimal::new(70, 2),
                suv: Decimal::new(80, 2),
                truck: Decimal::new(95, 2),
                van: Decimal::new(85, 2),
                coupe: Decimal::new(72, 2),
                motorcycle: Decimal::new(55, 2),
                rv_trailer: Decimal::new(125, 2),
                boat: Decimal::new(140, 2),
                other: Decimal::new(80, 2),
            },
            road_correction_factor: 1.2,
            fuel_baseline_per_gallon: Decimal::new(350, 2),
            fuel_surcharge_per_mile: Decimal::new(5, 2),
            expedite_threshold_days: 7,
            expedite_markup_pct: Decimal::new(25, 2),
            accident_recovery_fee: Decimal::new(150, 0),
            additional_vehicle_discount_pct: Decimal::new(5, 2),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    pricing: Option<PricingPatch>,
    payment: Option<PaymentPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RateTablePatch {
    sedan: Option<String>,
    suv: Option<String>,
    truck: Option<String>,
    van: Option<String>,
    coupe: Option<String>,
    motorcycle: Option<String>,
    rv_trailer: Option<String>,
    boat: Option<String>,
    other: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PricingPatch {
    base_rates: Option<RateTablePatch>,
    per_mile_rates: Option<RateTablePatch>,
    road_correction_factor: Option<f64>,
    fuel_baseline_per_gallon: Option<String>,
    fuel_surcharge_per_mile: Option<String>,
    expedite_threshold_days: Option<i64>,
    expedite_markup_pct: Option<String>,
    accident_recovery_fee: Option<String>,
    additional_vehicle_discount_pct: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PaymentPatch {
    upfront_pct: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("carhaul.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(base_rates) = pricing.base_rates {
                apply_rate_patch(&mut self.pricing.base_rates, "pricing.base_rates", base_rates)?;
            }
            if let Some(per_mile_rates) = pricing.per_mile_rates {
                apply_rate_patch(
                    &mut self.pricing.per_mile_rates,
                    "pricing.per_mile_rates",
                    per_mile_rates,
                )?;
            }
            if let Some(road_correction_factor) = pricing.road_correction_factor {
                self.pricing.road_correction_factor = road_correction_factor;
            }
            if let Some(value) = pricing.fuel_baseline_per_gallon {
                self.pricing.fuel_baseline_per_gallon =
                    parse_decimal("pricing.fuel_baseline_per_gallon", &value)?;
            }
            if let Some(value) = pricing.fuel_surcharge_per_mile {
                self.pricing.fuel_surcharge_per_mile =
                    parse_decimal("pricing.fuel_surcharge_per_mile", &value)?;
            }
            if let Some(expedite_threshold_days) = pricing.expedite_threshold_days {
                self.pricing.expedite_threshold_days = expedite_threshold_days;
            }
            if let Some(value) = pricing.expedite_markup_pct {
                self.pricing.expedite_markup_pct =
                    parse_decimal("pricing.expedite_markup_pct", &value)?;
            }
            if let Some(value) = pricing.accident_recovery_fee {
                self.pricing.accident_recovery_fee =
                    parse_decimal("pricing.accident_recovery_fee", &value)?;
            }
            if let Some(value) = pricing.additional_vehicle_discount_pct {
                self.pricing.additional_vehicle_discount_pct =
                    parse_decimal("pricing.additional_vehicle_discount_pct", &value)?;
            }
        }

        if let Some(payment) = patch.payment {
            if let Some(value) = payment.upfront_pct {
                self.payment.upfront_pct = parse_decimal("payment.upfront_pct", &value)?;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CARHAUL_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("CARHAUL_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("CARHAUL_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CARHAUL_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("CARHAUL_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CARHAUL_PRICING_ROAD_CORRECTION_FACTOR") {
            self.pricing.road_correction_factor =
                parse_f64("CARHAUL_PRICING_ROAD_CORRECTION_FACTOR", &value)?;
        }
        if let Some(value) = read_env("CARHAUL_PRICING_FUEL_BASELINE_PER_GALLON") {
            self.pricing.fuel_baseline_per_gallon =
                parse_env_decimal("CARHAUL_PRICING_FUEL_BASELINE_PER_GALLON", &value)?;
        }
        if let Some(value) = read_env("CARHAUL_PRICING_FUEL_SURCHARGE_PER_MILE") {
            self.pricing.fuel_surcharge_per_mile =
                parse_env_decimal("CARHAUL_PRICING_FUEL_SURCHARGE_PER_MILE", &value)?;
        }
        if let Some(value) = read_env("CARHAUL_PRICING_EXPEDITE_THRESHOLD_DAYS") {
            self.pricing.expedite_threshold_days =
                parse_i64("CARHAUL_PRICING_EXPEDITE_THRESHOLD_DAYS", &value)?;
        }
        if let Some(value) = read_env("CARHAUL_PRICING_EXPEDITE_MARKUP_PCT") {
            self.pricing.expedite_markup_pct =
                parse_env_decimal("CARHAUL_PRICING_EXPEDITE_MARKUP_PCT", &value)?;
        }
        if let Some(value) = read_env("CARHAUL_PRICING_ACCIDENT_RECOVERY_FEE") {
            self.pricing.accident_recovery_fee =
                parse_env_decimal("CARHAUL_PRICING_ACCIDENT_RECOVERY_FEE", &value)?;
        }
        if let Some(value) = read_env("CARHAUL_PRICING_ADDITIONAL_VEHICLE_DISCOUNT_PCT") {
            self.pricing.additional_vehicle_discount_pct =
                parse_env_decimal("CARHAUL_PRICING_ADDITIONAL_VEHICLE_DISCOUNT_PCT", &value)?;
        }

        if let Some(value) = read_env("CARHAUL_PAYMENT_UPFRONT_PCT") {
            self.payment.upfront_pct = parse_env_decimal("CARHAUL_PAYMENT_UPFRONT_PCT", &value)?;
        }

        let log_level = read_env("CARHAUL_LOGGING_LEVEL").or_else(|| read_env("CARHAUL_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CARHAUL_LOGGING_FORMAT").or_else(|| read_env("CARHAUL_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_pricing(&self.pricing)?;
        validate_payment(&self.payment)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn apply_rate_patch(
    table: &mut RateTable,
    section: &str,
    patch: RateTablePatch,
) -> Result<(), ConfigError> {
    let entries = [
        (&mut table.sedan, "sedan", patch.sedan),
        (&mut table.suv, "suv", patch.suv),
        (&mut table.truck, "truck", patch.truck),
        (&mut table.van, "van", patch.van),
        (&mut table.coupe, "coupe", patch.coupe),
        (&mut table.motorcycle, "motorcycle", patch.motorcycle),
        (&mut table.rv_trailer, "rv_trailer", patch.rv_trailer),
        (&mut table.boat, "boat", patch.boat),
        (&mut table.other, "other", patch.other),
    ];

    for (slot, key, value) in entries {
        if let Some(value) = value {
            *slot = parse_decimal(&format!("{section}.{key}"), &value)?;
        }
    }

    Ok(())
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("carhaul.toml"), PathBuf::from("config/carhaul.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_pricing(pricing: &PricingPolicy) -> Result<(), ConfigError> {
    for vehicle_type in VehicleType::ALL {
        if pricing.base_rates.rate(vehicle_type) <= Decimal::ZERO {
            return Err(ConfigError::Validation(format!(
                "pricing.base_rates.{} must be greater than zero",
                vehicle_type.as_str()
            )));
        }
        if pricing.per_mile_rates.rate(vehicle_type) <= Decimal::ZERO {
            return Err(ConfigError::Validation(format!(
                "pricing.per_mile_rates.{} must be greater than zero",
                vehicle_type.as_str()
            )));
        }
    }

    if !(1.0..=3.0).contains(&pricing.road_correction_factor) {
        return Err(ConfigError::Validation(
            "pricing.road_correction_factor must be in range 1.0..=3.0".to_string(),
        ));
    }

    if pricing.fuel_baseline_per_gallon <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "pricing.fuel_baseline_per_gallon must be greater than zero".to_string(),
        ));
    }

    if pricing.fuel_surcharge_per_mile < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "pricing.fuel_surcharge_per_mile must not be negative".to_string(),
        ));
    }

    if !(0..=60).contains(&pricing.expedite_threshold_days) {
        return Err(ConfigError::Validation(
            "pricing.expedite_threshold_days must be in range 0..=60".to_string(),
        ));
    }

    if pricing.expedite_markup_pct < Decimal::ZERO || pricing.expedite_markup_pct > Decimal::ONE {
        return Err(ConfigError::Validation(
            "pricing.expedite_markup_pct must be in range 0..=1".to_string(),
        ));
    }

    if pricing.accident_recovery_fee < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "pricing.accident_recovery_fee must not be negative".to_string(),
        ));
    }

    if pricing.additional_vehicle_discount_pct < Decimal::ZERO
        || pricing.additional_vehicle_discount_pct >= Decimal::ONE
    {
        return Err(ConfigError::Validation(
            "pricing.additional_vehicle_discount_pct must be in range 0..<1".to_string(),
        ));
    }

    Ok(())
}

fn validate_payment(payment: &PaymentPolicy) -> Result<(), ConfigError> {
    if payment.upfront_pct <= Decimal::ZERO || payment.upfront_pct >= Decimal::ONE {
        return Err(ConfigError::Validation(
            "payment.upfront_pct must be strictly between 0 and 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    if logging.level.trim().is_empty() {
        return Err(ConfigError::Validation("logging.level must not be empty".to_string()));
    }

    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value.trim()).map_err(|_| {
        ConfigError::Validation(format!("`{key}` must be a decimal number, got `{value}`"))
    })
}

fn parse_env_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value.trim()).map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;

    use crate::domain::shipment::VehicleType;

    use super::{AppConfig, ConfigError, LoadOptions, LogFormat, PricingPolicy};

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex poisoned")
    }

    #[test]
    fn default_config_validates() {
        let _guard = env_lock();
        let config = AppConfig::default();
        config.validate().expect("shipped defaults must validate");
        assert_eq!(config.payment.upfront_pct, Decimal::new(20, 2));
    }

    #[test]
    fn default_base_rates_order_light_to_heavy_classes() {
        let pricing = PricingPolicy::default();
        let sedan = pricing.base_rates.rate(VehicleType::Sedan);
        let suv = pricing.base_rates.rate(VehicleType::Suv);
        let truck = pricing.base_rates.rate(VehicleType::Truck);
        let rv = pricing.base_rates.rate(VehicleType::RvTrailer);
        let boat = pricing.base_rates.rate(VehicleType::Boat);

        assert!(sedan < suv && suv < truck && truck < rv && rv < boat);
    }

    #[test]
    fn file_patch_overrides_policy_constants() {
        let _guard = env_lock();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("carhaul.toml");
        fs::write(
            &path,
            r#"
[payment]
upfront_pct = "0.30"

[pricing]
expedite_markup_pct = "0.10"

[pricing.base_rates]
sedan = "500"
"#,
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(path),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect("load patched config");

        assert_eq!(config.payment.upfront_pct, Decimal::new(30, 2));
        assert_eq!(config.pricing.expedite_markup_pct, Decimal::new(10, 2));
        assert_eq!(config.pricing.base_rates.rate(VehicleType::Sedan), Decimal::new(500, 0));
        // untouched entries keep their defaults
        assert_eq!(config.pricing.base_rates.rate(VehicleType::Boat), Decimal::new(1095, 0));
    }

    #[test]
    fn unknown_rate_table_key_is_rejected() {
        let _guard = env_lock();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("carhaul.toml");
        fs::write(&path, "[pricing.base_rates]\nhovercraft = \"900\"\n").expect("write config");

        let error = AppConfig::load(LoadOptions {
            config_path: Some(path),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect_err("unknown vehicle key must fail");

        assert!(matches!(error, ConfigError::ParseFile { .. }));
    }

    #[test]
    fn out_of_range_upfront_pct_fails_validation() {
        let _guard = env_lock();
        let mut config = AppConfig::default();
        config.payment.upfront_pct = Decimal::ONE;

        let error = config.validate().expect_err("full prepayment is not a split");
        assert!(matches!(error, ConfigError::Validation(_)));
    }

    #[test]
    fn env_override_beats_file_value() {
        let _guard = env_lock();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("carhaul.toml");
        fs::write(&path, "[payment]\nupfront_pct = \"0.30\"\n").expect("write config");

        std::env::set_var("CARHAUL_PAYMENT_UPFRONT_PCT", "0.25");
        let result = AppConfig::load(LoadOptions {
            config_path: Some(path),
            require_file: true,
            ..LoadOptions::default()
        });
        std::env::remove_var("CARHAUL_PAYMENT_UPFRONT_PCT");

        let config = result.expect("load with env override");
        assert_eq!(config.payment.upfront_pct, Decimal::new(25, 2));
    }

    #[test]
    fn malformed_env_override_is_reported_with_key() {
        let _guard = env_lock();
        std::env::set_var("CARHAUL_PAYMENT_UPFRONT_PCT", "a-fifth");
        let result = AppConfig::load(LoadOptions::default());
        std::env::remove_var("CARHAUL_PAYMENT_UPFRONT_PCT");

        let error = result.expect_err("malformed decimal must fail");
        assert!(matches!(
            error,
            ConfigError::InvalidEnvOverride { ref key, .. } if key == "CARHAUL_PAYMENT_UPFRONT_PCT"
        ));
    }

    #[test]
    fn missing_required_file_is_reported() {
        let _guard = env_lock();
        let error = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect_err("missing required file must fail");

        assert!(matches!(error, ConfigError::MissingConfigFile(_)));
    }

    #[test]
    fn log_format_parses_known_values_only() {
        assert_eq!("pretty".parse::<LogFormat>().expect("pretty"), LogFormat::Pretty);
        assert!("yaml".parse::<LogFormat>().is_err());
    }
}
