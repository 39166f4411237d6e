use std::str::FromStr;

use clap::Args;
use rust_decimal::Decimal;
use serde_json::json;

use carhaul_core::config::{AppConfig, LoadOptions};
use carhaul_core::PaymentSplit;

use crate::commands::CommandResult;

#[derive(Debug, Args)]
pub struct SplitArgs {
    #[arg(long, help = "Quoted total to split into upfront and remaining amounts")]
    pub total: String,
    #[arg(long, help = "Override the configured upfront percentage (e.g. 0.25)")]
    pub upfront_pct: Option<String>,
}

pub fn run(args: &SplitArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "split",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let total = match Decimal::from_str(args.total.trim()) {
        Ok(total) if total >= Decimal::ZERO => total,
        Ok(total) => {
            return CommandResult::failure(
                "split",
                "invalid_argument",
                format!("--total must not be negative, got {total}"),
                3,
            );
        }
        Err(_) => {
            return CommandResult::failure(
                "split",
                "invalid_argument",
                format!("--total must be a decimal number, got `{}`", args.total),
                3,
            );
        }
    };

    let upfront_pct = match &args.upfront_pct {
        Some(raw) => match Decimal::from_str(raw.trim()) {
            Ok(pct) if pct > Decimal::ZERO && pct < Decimal::ONE => pct,
            Ok(pct) => {
                return CommandResult::failure(
                    "split",
                    "invalid_argument",
                    format!("--upfront-pct must be strictly between 0 and 1, got {pct}"),
                    3,
                );
            }
            Err(_) => {
                return CommandResult::failure(
                    "split",
                    "invalid_argument",
                    format!("--upfront-pct must be a decimal number, got `{raw}`"),
                    3,
                );
            }
        },
        None => config.payment.upfront_pct,
    };

    let split = PaymentSplit::of(total, upfront_pct);
    let data = json!({
        "total": total.to_string(),
        "upfront_pct": upfront_pct.to_string(),
        "upfront": split.upfront.to_string(),
        "remaining": split.remaining.to_string(),
    });

    CommandResult::success_with_data(
        "split",
        format!("{} splits into {} upfront and {} on delivery", total, split.upfront, split.remaining),
        Some(data),
    )
}
