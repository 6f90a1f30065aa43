//! Configuration error types.

use thiserror::Error;

/// Result type alias for configuration and construction.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while building controller components from configuration.
///
/// All of these are fatal: the controller refuses to start rather than
/// run against a malformed ladder or window.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("pool must contain at least one unit")]
    EmptyPool,

    #[error("load window must hold at least one sample")]
    EmptyWindow,

    #[error("peak threshold must be positive and finite, got {0}")]
    Peak(f64),

    #[error("ladder for {units} units needs {expected} entries per table, got up={up} down={down}")]
    LadderLength {
        units: u32,
        expected: usize,
        up: usize,
        down: usize,
    },

    #[error("ladder tables must start at zero")]
    LadderOrigin,

    #[error("{table} thresholds decrease at index {index}")]
    NotMonotonic { table: &'static str, index: usize },

    #[error("top up-threshold must be unbounded, got {0}")]
    BoundedTop(f64),

    #[error("down[{lower}] = {down} exceeds up[{upper}] = {up}")]
    Crossed {
        lower: usize,
        upper: usize,
        down: f64,
        up: f64,
    },

    #[error("window peak {window} does not match ladder peak {ladder}")]
    PeakMismatch { window: f64, ladder: f64 },

    #[error("invalid duration for {field}: {value:?}")]
    Duration { field: &'static str, value: String },

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
