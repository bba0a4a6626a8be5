//! Unified error types for the odds monitor and arbitrage scanner.

use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the scanner.
#[derive(Error, Debug)]
pub enum BotError {
    /// Environment could not be deserialized into a configuration.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration was loaded but is structurally invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Market catalog or order source error.
    #[error("market error: {0}")]
    Market(#[from] MarketError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors. These are fatal: the engine refuses to start.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A threshold that must be zero or greater is negative.
    #[error("{name} must not be negative (got {value})")]
    NegativeThreshold {
        /// Option name.
        name: &'static str,
        /// Offending value.
        value: Decimal,
    },

    /// A value that must be strictly positive is zero or negative.
    #[error("{name} must be greater than zero (got {value})")]
    NotPositive {
        /// Option name.
        name: &'static str,
        /// Offending value.
        value: Decimal,
    },

    /// A decimal value does not fit the integer minor-unit range.
    #[error("{name} is out of range: {value}")]
    OutOfRange {
        /// Option name.
        name: &'static str,
        /// Offending value.
        value: Decimal,
    },

    /// No arbitrage combinations were configured.
    #[error("at least one arbitrage combination must be configured")]
    NoCombinations,

    /// A combination definition could not be parsed or is inconsistent.
    #[error("invalid combination '{definition}': {reason}")]
    InvalidCombination {
        /// Definition text.
        definition: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A required string option is empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// Log format is not one of the supported values.
    #[error("unsupported log format '{0}' (expected pretty or json)")]
    LogFormat(String),
}

/// Market catalog and order source errors.
#[derive(Error, Debug)]
pub enum MarketError {
    /// The API answered with a non-success envelope.
    #[error("{endpoint} returned status '{status}'")]
    ApiStatus {
        /// Endpoint path.
        endpoint: String,
        /// Status field from the envelope.
        status: String,
    },

    /// Request failed at the transport level.
    #[error("request to {endpoint} failed: {reason}")]
    RequestFailed {
        /// Endpoint path.
        endpoint: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to parse an API payload.
    #[error("failed to parse market data: {0}")]
    ParseError(String),

    /// Market id is not part of the catalog.
    #[error("unknown market {0}")]
    UnknownMarket(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Data-quality problem with a single order.
///
/// Anomalies are reported back to the caller alongside the computed snapshot.
/// They never abort processing of the rest of the book.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnomalyKind {
    /// The implied probability numerator is absent.
    #[error("implied probability is missing")]
    MissingProbability,

    /// The implied probability numerator is zero or negative.
    #[error("implied probability {0} is not positive")]
    NonPositiveProbability(i128),

    /// The implied probability is 100% or more, so decimal odds would be <= 1.
    #[error("implied probability {0} is not below the 1e20 denominator")]
    ProbabilityOutOfRange(i128),

    /// A size field is negative.
    #[error("negative {field}: {value}")]
    NegativeSize {
        /// Which size field.
        field: &'static str,
        /// Offending value.
        value: i128,
    },

    /// More has been filled than was offered.
    #[error("filled size {filled} exceeds total size {total}")]
    OverFilled {
        /// Filled size.
        filled: i128,
        /// Total size.
        total: i128,
    },

    /// Taker size computation does not fit in 128 bits.
    #[error("remaining size {0} overflows taker size computation")]
    Overflow(u128),

    /// Order was delivered for a different market than the update.
    #[error("order belongs to market {0}")]
    ForeignMarket(String),
}

/// An anomaly attached to the order that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anomaly {
    /// Market the update was for.
    pub market_id: String,
    /// Offending order.
    pub order_id: String,
    /// What was wrong.
    pub kind: AnomalyKind,
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order {} in {}: {}", self.order_id, self.market_id, self.kind)
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;
