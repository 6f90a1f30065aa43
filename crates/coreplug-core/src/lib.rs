//! coreplug-core — decision primitives for the unit-scaling controller.
//!
//! # Pipeline
//!
//! ```text
//! LoadSample ──► LoadWindow::push() ──► smoothed average
//!                                           │
//!                      ThresholdLadder::decide(avg, raw, online)
//!                                           │
//!                                    ScaleDecision
//!                                           │
//!                 SamplingClock::next_delay(scaled_up) ──► next tick
//! ```
//!
//! Everything here is synchronous and free of I/O; the controller crate
//! owns the scheduling and the calls into the host.

pub mod clock;
pub mod config;
pub mod error;
pub mod ladder;
pub mod types;
pub mod window;

pub use clock::SamplingClock;
pub use config::PlugConfig;
pub use error::{ConfigError, ConfigResult};
pub use ladder::{LadderMode, ThresholdLadder};
pub use types::{ControllerState, LoadSample, SamplingInterval, ScaleDecision};
pub use window::LoadWindow;
