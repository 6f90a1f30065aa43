//! coreplug-controller — adaptive pool-unit scaling.
//!
//! Samples a load metric on a timer, smooths it, and keeps the number of
//! online pool units inside the band the threshold ladder selects.
//!
//! # Architecture
//!
//! ```text
//! ScalingController
//!   ├── tick loop (one tokio task)
//!   │   ├── LoadSource::load_sample()
//!   │   ├── LoadWindow → ThresholdLadder → ScaleDecision
//!   │   ├── set_cpus() → CoreControl::{activate, deactivate}
//!   │   └── SamplingClock → next deadline (idle / busy)
//!   └── SignalCoordinator
//!       ├── on_suspend()        collapse to one unit, stop ticking
//!       ├── on_resume()         one extra unit, fast tick
//!       ├── on_activity_pulse() fast tick
//!       └── set_enabled()       off = every unit online
//! ```
//!
//! # Fail-open
//!
//! When disabled, or when the load source cannot be read, the controller
//! brings every unit online rather than leave the host under-provisioned.

pub mod apply;
pub mod backend;
pub mod controller;
pub mod error;
mod schedule;
pub mod signals;
pub mod sim;

pub use apply::{ApplyReport, set_cpus};
pub use backend::{CoreControl, LoadSource};
pub use controller::{ControllerStatus, ScalingController, TickReport};
pub use error::{ControllerError, ControllerResult, UnitError};
pub use signals::SignalCoordinator;
