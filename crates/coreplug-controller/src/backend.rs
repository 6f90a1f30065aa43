//! Host collaborator interfaces.
//!
//! The controller never touches hardware directly. Hosts plug in a
//! [`LoadSource`] and a [`CoreControl`]; both are called from blocking
//! worker threads, never while the controller's state lock is held.

use crate::error::UnitError;

/// Produces one load reading per tick.
pub trait LoadSource: Send + Sync {
    /// Current queued-work depth, or `None` if it could not be read.
    fn load_sample(&self) -> Option<f64>;
}

/// Brings individual pool units online and offline.
///
/// Units are indexed from 0. Unit 0 is expected to stay online.
pub trait CoreControl: Send + Sync {
    /// Number of units currently online.
    fn online_count(&self) -> u32;

    /// Whether unit `index` is online. Out-of-range indices are offline.
    fn is_online(&self, index: u32) -> bool;

    fn activate(&self, index: u32) -> Result<(), UnitError>;

    fn deactivate(&self, index: u32) -> Result<(), UnitError>;
}
