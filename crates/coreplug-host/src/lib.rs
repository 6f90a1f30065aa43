//! coreplug-host — Linux adapters for the scaling controller.
//!
//! - [`SysfsCores`] brings CPUs up and down through
//!   `/sys/devices/system/cpu/cpuN/online`.
//! - [`ProcStatLoad`] reads the runnable-task count from `/proc/stat`.
//!
//! Both do plain blocking file I/O; the controller only calls them from
//! the blocking pool.

pub mod procfs;
pub mod sysfs;

pub use procfs::ProcStatLoad;
pub use sysfs::SysfsCores;
