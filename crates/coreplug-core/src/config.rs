//! coreplug.toml configuration parser.
//!
//! Every section is optional; missing values fall back to the tuned
//! four-unit defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::{DEFAULT_BUSY, DEFAULT_IDLE, DEFAULT_KICK, SamplingClock};
use crate::error::{ConfigError, ConfigResult};
use crate::ladder::{LadderMode, ThresholdLadder};
use crate::window::LoadWindow;

pub const DEFAULT_UNITS: u32 = 4;
pub const DEFAULT_WINDOW: usize = 5;
pub const DEFAULT_PEAK: f64 = 30.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlugConfig {
    /// Initial value of the enable switch.
    pub enabled: Option<bool>,
    pub pool: PoolConfig,
    pub window: WindowConfig,
    pub ladder: LadderConfig,
    pub sampling: SamplingConfig,
    pub host: HostConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub units: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub size: Option<usize>,
    /// Initial fill value; defaults to the peak threshold.
    pub sentinel: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LadderConfig {
    pub mode: Option<LadderMode>,
    pub peak: Option<f64>,
    pub up: Option<Vec<f64>>,
    pub down: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub idle: Option<String>,
    pub busy: Option<String>,
    pub kick: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub sysfs_root: Option<PathBuf>,
    pub proc_stat: Option<PathBuf>,
    /// Multiplier applied to the raw runnable-task count.
    pub load_scale: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub listen: Option<String>,
}

impl PlugConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn units(&self) -> ConfigResult<u32> {
        match self.pool.units.unwrap_or(DEFAULT_UNITS) {
            0 => Err(ConfigError::EmptyPool),
            n => Ok(n),
        }
    }

    pub fn peak(&self) -> f64 {
        self.ladder.peak.unwrap_or(DEFAULT_PEAK)
    }

    /// Build the ladder from explicit tables, or the canonical preset for
    /// the pool size when tables are omitted.
    pub fn build_ladder(&self) -> ConfigResult<ThresholdLadder> {
        let units = self.units()?;
        let peak = self.peak();
        let mode = self.ladder.mode.unwrap_or_default();

        let ladder = match (&self.ladder.up, &self.ladder.down) {
            (Some(up), Some(down)) => {
                ThresholdLadder::new(units, up.clone(), down.clone(), peak, mode)?
            }
            _ => ThresholdLadder::canonical(units, peak)?.with_mode(mode),
        };
        Ok(ladder)
    }

    /// Shares the ladder's peak; the sentinel defaults to it.
    pub fn build_window(&self) -> ConfigResult<LoadWindow> {
        let peak = self.peak();
        LoadWindow::new(
            self.window.size.unwrap_or(DEFAULT_WINDOW),
            self.window.sentinel.unwrap_or(peak),
            peak,
        )
    }

    pub fn build_clock(&self) -> ConfigResult<SamplingClock> {
        let s = &self.sampling;
        Ok(SamplingClock::new(
            duration_or("sampling.idle", s.idle.as_deref(), DEFAULT_IDLE)?,
            duration_or("sampling.busy", s.busy.as_deref(), DEFAULT_BUSY)?,
            duration_or("sampling.kick", s.kick.as_deref(), DEFAULT_KICK)?,
        ))
    }

    /// Build every component once so errors surface before start-up.
    pub fn validate(&self) -> ConfigResult<()> {
        self.build_ladder()?;
        self.build_window()?;
        self.build_clock()?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn duration_or(field: &'static str, value: Option<&str>, default: Duration) -> ConfigResult<Duration> {
    match value {
        None => Ok(default),
        Some(v) => parse_duration(v).ok_or_else(|| ConfigError::Duration {
            field,
            value: v.to_string(),
        }),
    }
}

/// Parse a duration string like "500ms", "1s" or "2m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim().parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        None
    }
}
