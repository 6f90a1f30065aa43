//! Controller error types.

use thiserror::Error;

/// Failure to change the state of a single pool unit.
///
/// These never abort a scaling step; the remaining units are still tried.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("unit {0} does not exist")]
    NoSuchUnit(u32),

    #[error("unit {0} cannot be taken offline")]
    Pinned(u32),

    #[error("unit {index} refused the request: {reason}")]
    Refused { index: u32, reason: String },

    #[error("i/o error on unit {index}: {source}")]
    Io {
        index: u32,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from controller lifecycle operations.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("controller loop is already running")]
    AlreadyRunning,

    #[error("configuration error: {0}")]
    Config(#[from] coreplug_core::ConfigError),
}

pub type ControllerResult<T> = Result<T, ControllerError>;
