//! Application configuration loaded from environment variables.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use strum::{Display, EnumString};

use crate::arbitrage::combination::{one_x_two, parse_combinations, Combination};
use crate::error::ConfigError;
use crate::market::catalog::ClassificationRules;
use crate::orderbook::odds::to_minor_units;

/// USDC on SX Network.
pub const USDC_ADDRESS: &str = "0x6629Ce1Cf35Cc1329ebB4F63202F3f197b3F050B";

/// Largest supported token decimals.
const MAX_TOKEN_DECIMALS: u32 = 18;

/// Console log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Exchange API ===
    /// REST API base URL.
    #[serde(default = "default_api_url")]
    pub sxbet_api_url: String,

    /// Optional API key sent as `X-Api-Key`.
    #[serde(default)]
    pub sxbet_api_key: Option<String>,

    /// Base token address orders are filtered by.
    #[serde(default = "default_base_token")]
    pub base_token: String,

    /// Decimals of the base token (6 for USDC).
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u32,

    // === Market Catalog ===
    /// Sport to scan (5 = soccer).
    #[serde(default = "default_sport_id")]
    pub sport_id: u32,

    /// Only fetch main-line markets.
    #[serde(default = "default_true")]
    pub only_main_line: bool,

    /// Market types eligible for arbitrage (1 = 1X2).
    #[serde(default = "default_market_types")]
    pub market_types: Vec<u32>,

    /// Outcome labels identifying the tie market.
    #[serde(default = "default_tie_labels")]
    pub tie_labels: Vec<String>,

    // === Engine Parameters ===
    /// Minimum taker-fillable size, display units.
    #[serde(default = "default_min_order_size")]
    pub min_order_size: Decimal,

    /// Minimum profit percentage to report.
    #[serde(default = "default_min_profit_percent")]
    pub min_profit_percent: Decimal,

    /// Total stake used for stake distribution, display units.
    #[serde(default = "default_target_stake_total")]
    pub target_stake_total: Decimal,

    /// Combination definitions (`role:outcome+role:outcome+...`), 1X2 pair when unset.
    #[serde(default)]
    pub arb_combinations: Option<Vec<String>>,

    // === Polling ===
    /// Monitor poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// HTTP timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// Maximum in-flight order requests.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    // === Server Configuration ===
    /// HTTP server port for health/metrics endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Log output format: pretty or json.
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log every combination report, not only opportunities.
    #[serde(default)]
    pub verbose: bool,
}

fn default_api_url() -> String {
    "https://api.sx.bet".to_string()
}

fn default_base_token() -> String {
    USDC_ADDRESS.to_string()
}

fn default_token_decimals() -> u32 {
    6
}

fn default_sport_id() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_market_types() -> Vec<u32> {
    vec![1]
}

fn default_tie_labels() -> Vec<String> {
    ["tie", "draw", "x"].iter().map(|s| s.to_string()).collect()
}

fn default_min_order_size() -> Decimal {
    Decimal::ONE // 1 USDC
}

fn default_min_profit_percent() -> Decimal {
    Decimal::new(5, 1) // 0.5%
}

fn default_target_stake_total() -> Decimal {
    Decimal::new(100, 0) // 100 USDC
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

fn default_max_concurrent_requests() -> usize {
    8
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    LogFormat::Pretty.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sxbet_api_url: default_api_url(),
            sxbet_api_key: None,
            base_token: default_base_token(),
            token_decimals: default_token_decimals(),
            sport_id: default_sport_id(),
            only_main_line: true,
            market_types: default_market_types(),
            tie_labels: default_tie_labels(),
            min_order_size: default_min_order_size(),
            min_profit_percent: default_min_profit_percent(),
            target_stake_total: default_target_stake_total(),
            arb_combinations: None,
            poll_interval_ms: default_poll_interval_ms(),
            http_timeout_ms: default_http_timeout_ms(),
            max_concurrent_requests: default_max_concurrent_requests(),
            port: default_port(),
            rust_log: default_log_level(),
            log_format: default_log_format(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sxbet_api_url.trim().is_empty() {
            return Err(ConfigError::Empty("SXBET_API_URL"));
        }

        if self.base_token.trim().is_empty() {
            return Err(ConfigError::Empty("BASE_TOKEN"));
        }

        if self.token_decimals > MAX_TOKEN_DECIMALS {
            return Err(ConfigError::OutOfRange {
                name: "TOKEN_DECIMALS",
                value: Decimal::from(self.token_decimals),
            });
        }

        if self.market_types.is_empty() {
            return Err(ConfigError::Empty("MARKET_TYPES"));
        }

        if self.min_order_size <= Decimal::ZERO {
            return Err(ConfigError::NotPositive {
                name: "MIN_ORDER_SIZE",
                value: self.min_order_size,
            });
        }

        if self.min_profit_percent < Decimal::ZERO {
            return Err(ConfigError::NegativeThreshold {
                name: "MIN_PROFIT_PERCENT",
                value: self.min_profit_percent,
            });
        }

        if self.target_stake_total <= Decimal::ZERO {
            return Err(ConfigError::NotPositive {
                name: "TARGET_STAKE_TOTAL",
                value: self.target_stake_total,
            });
        }

        for (name, value) in [
            ("POLL_INTERVAL_MS", self.poll_interval_ms),
            ("HTTP_TIMEOUT_MS", self.http_timeout_ms),
            ("MAX_CONCURRENT_REQUESTS", self.max_concurrent_requests as u64),
        ] {
            if value == 0 {
                return Err(ConfigError::NotPositive {
                    name,
                    value: Decimal::ZERO,
                });
            }
        }

        self.min_order_size_minor()?;
        self.combinations()?;
        self.log_format()?;

        Ok(())
    }

    /// Minimum order size in token minor units.
    ///
    /// A size that truncates to zero minor units is rejected.
    pub fn min_order_size_minor(&self) -> Result<u128, ConfigError> {
        let minor = to_minor_units("MIN_ORDER_SIZE", self.min_order_size, self.token_decimals)?;
        if minor == 0 {
            return Err(ConfigError::NotPositive {
                name: "MIN_ORDER_SIZE",
                value: self.min_order_size,
            });
        }
        Ok(minor)
    }

    /// Configured combinations, or the 1X2 defaults.
    pub fn combinations(&self) -> Result<Vec<Combination>, ConfigError> {
        match &self.arb_combinations {
            Some(definitions) => parse_combinations(definitions),
            None => Ok(one_x_two()),
        }
    }

    /// Market classification rules for the catalog.
    pub fn classification_rules(&self) -> ClassificationRules {
        ClassificationRules::new(self.market_types.iter().copied(), self.tie_labels.as_slice())
    }

    /// Parsed log format.
    pub fn log_format(&self) -> Result<LogFormat, ConfigError> {
        self.log_format
            .trim()
            .parse()
            .map_err(|_| ConfigError::LogFormat(self.log_format.clone()))
    }

    /// Poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// HTTP timeout as a duration.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::ArbEngine;
    use rust_decimal_macros::dec;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        envy::from_iter(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
        .unwrap()
    }

    #[test]
    fn default_values_are_sensible() {
        let config = from_pairs(&[]);

        assert_eq!(config.sxbet_api_url, "https://api.sx.bet");
        assert_eq!(config.base_token, USDC_ADDRESS);
        assert_eq!(config.token_decimals, 6);
        assert_eq!(config.sport_id, 5);
        assert_eq!(config.market_types, vec![1]);
        assert_eq!(config.min_order_size, dec!(1));
        assert_eq!(config.min_profit_percent, dec!(0.5));
        assert_eq!(config.target_stake_total, dec!(100));
        assert_eq!(config.min_order_size_minor().unwrap(), 1_000_000);
        assert_eq!(config.combinations().unwrap().len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_lists_and_combinations() {
        let config = from_pairs(&[
            ("MARKET_TYPES", "1,52"),
            ("TIE_LABELS", "Tie,Draw"),
            ("ARB_COMBINATIONS", "team_one:yes+tie:yes+team_two:yes"),
            ("MIN_ORDER_SIZE", "2.5"),
            ("LOG_FORMAT", "JSON"),
        ]);

        assert_eq!(config.market_types, vec![1, 52]);
        assert_eq!(config.tie_labels, vec!["Tie", "Draw"]);
        assert_eq!(config.combinations().unwrap().len(), 1);
        assert_eq!(config.min_order_size_minor().unwrap(), 2_500_000);
        assert_eq!(config.log_format().unwrap(), LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_negative_profit_threshold() {
        let config = Config {
            min_profit_percent: dec!(-0.1),
            ..Config::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::NegativeThreshold { name: "MIN_PROFIT_PERCENT", .. })
        ));
    }

    #[test]
    fn validate_rejects_non_positive_sizes() {
        let zero_size = Config {
            min_order_size: Decimal::ZERO,
            ..Config::default()
        };
        assert!(zero_size.validate().is_err());

        let zero_stake = Config {
            target_stake_total: dec!(-5),
            ..Config::default()
        };
        assert!(zero_stake.validate().is_err());

        let zero_poll = Config {
            poll_interval_ms: 0,
            ..Config::default()
        };
        assert!(zero_poll.validate().is_err());
    }

    #[test]
    fn validate_rejects_min_size_below_one_minor_unit() {
        let config = from_pairs(&[("MIN_ORDER_SIZE", "0.0000001")]);

        assert_eq!(
            config.validate(),
            Err(ConfigError::NotPositive {
                name: "MIN_ORDER_SIZE",
                value: dec!(0.0000001),
            })
        );
        assert!(ArbEngine::from_config(&config).is_err());

        let one_unit = from_pairs(&[("MIN_ORDER_SIZE", "0.000001")]);
        assert_eq!(one_unit.min_order_size_minor().unwrap(), 1);
    }

    #[test]
    fn validate_rejects_bad_combinations() {
        let empty = Config {
            arb_combinations: Some(vec![]),
            ..Config::default()
        };
        assert_eq!(empty.validate(), Err(ConfigError::NoCombinations));

        let malformed = Config {
            arb_combinations: Some(vec!["team_one:yes+team_one:no".to_string()]),
            ..Config::default()
        };
        assert!(matches!(
            malformed.validate(),
            Err(ConfigError::InvalidCombination { .. })
        ));
    }

    #[test]
    fn validate_rejects_unknown_log_format() {
        let config = Config {
            log_format: "xml".to_string(),
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::LogFormat("xml".to_string())));
    }
}
