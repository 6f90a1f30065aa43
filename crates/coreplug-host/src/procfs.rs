//! Run-queue depth from `/proc/stat`.

use std::path::PathBuf;

use tracing::warn;

use coreplug_controller::LoadSource;

pub const DEFAULT_PROC_STAT: &str = "/proc/stat";

/// Default multiplier: ladders are tuned in tenths of a runnable task.
pub const DEFAULT_LOAD_SCALE: f64 = 10.0;

/// Load source reading the `procs_running` line of `/proc/stat`.
#[derive(Debug, Clone)]
pub struct ProcStatLoad {
    path: PathBuf,
    scale: f64,
}

impl ProcStatLoad {
    pub fn new(path: impl Into<PathBuf>, scale: f64) -> Self {
        Self {
            path: path.into(),
            scale,
        }
    }
}

impl Default for ProcStatLoad {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_STAT, DEFAULT_LOAD_SCALE)
    }
}

impl LoadSource for ProcStatLoad {
    fn load_sample(&self) -> Option<f64> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read load source");
                return None;
            }
        };
        match parse_procs_running(&content) {
            Some(running) => Some(running as f64 * self.scale),
            None => {
                warn!(path = %self.path.display(), "no procs_running line in load source");
                None
            }
        }
    }
}

/// Extract the runnable-task count from `/proc/stat` contents.
pub fn parse_procs_running(content: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        let rest = line.strip_prefix("procs_running")?;
        rest.trim().parse().ok()
    })
}
