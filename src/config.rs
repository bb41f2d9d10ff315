use std::env;
use std::str::FromStr;
use std::time::Duration;

use bigdecimal::BigDecimal;

use crate::domain::pricing::PricingConfig;

/// Runtime configuration read from the environment, with defaults for
/// everything but the database connection.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub pricing: PricingConfig,
    pub sweep_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> AppConfig {
        AppConfig {
            pricing: PricingConfig {
                free_shipping_threshold: decimal_var("FREE_SHIPPING_THRESHOLD", "1000"),
                flat_shipping_fee: decimal_var("FLAT_SHIPPING_FEE", "100"),
                tax_rate: decimal_var("TAX_RATE", "0"),
            },
            sweep_interval: Duration::from_secs(int_var("DEAL_SWEEP_INTERVAL_SECS", 300)),
        }
    }
}

fn decimal_var(name: &str, default: &str) -> BigDecimal {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    BigDecimal::from_str(&raw).unwrap_or_else(|_| {
        log::warn!("{name}={raw} is not a valid decimal, using {default}");
        BigDecimal::from_str(default).unwrap_or_default()
    })
}

fn int_var(name: &str, default: u64) -> u64 {
    let Ok(raw) = env::var(name) else {
        return default;
    };
    raw.parse().unwrap_or_else(|_| {
        log::warn!("{name}={raw} is not a valid integer, using {default}");
        default
    })
}
