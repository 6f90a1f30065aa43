//! Threshold ladder — maps a smoothed load average to a target unit count.
//!
//! # Tables
//!
//! For a pool of `N` units the ladder holds two tables of `N + 1` entries:
//!
//! ```text
//! up   = [0, u1, u2, ..., +inf]
//! down = [0, d1, d2, ..., dN]
//! ```
//!
//! Both tables are non-decreasing and `down[c-1] <= up[c]` for every `c`.
//!
//! # Decision
//!
//! A raw sample above the peak threshold selects `N` outright. Otherwise,
//! in [`LadderMode::Banded`], band `c` is the first `c` in `1..=N` with
//!
//! ```text
//! down[c-1] <= avg  &&  avg <= up[c]  &&  avg <= down[c]
//! ```
//!
//! Values that sit on a shared boundary resolve to the lower band.
//! [`LadderMode::Stepped`] instead compares the average with the online
//! count, scaling up past `up[i]` and down below `down[i]`.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{LoadSample, ScaleDecision};

/// How the ladder turns an average into a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LadderMode {
    /// Select the first band containing the average.
    #[default]
    Banded,
    /// Step relative to the online count using separate up/down edges.
    Stepped,
}

/// Static per-unit-count up/down boundaries.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdLadder {
    up: Vec<f64>,
    down: Vec<f64>,
    peak: f64,
    mode: LadderMode,
}

impl ThresholdLadder {
    /// Build a ladder for `units` units, rejecting malformed tables.
    pub fn new(
        units: u32,
        up: Vec<f64>,
        down: Vec<f64>,
        peak: f64,
        mode: LadderMode,
    ) -> ConfigResult<Self> {
        if units == 0 {
            return Err(ConfigError::EmptyPool);
        }
        if !(peak.is_finite() && peak > 0.0) {
            return Err(ConfigError::Peak(peak));
        }

        let expected = units as usize + 1;
        if up.len() != expected || down.len() != expected {
            return Err(ConfigError::LadderLength {
                units,
                expected,
                up: up.len(),
                down: down.len(),
            });
        }
        if up[0] != 0.0 || down[0] != 0.0 {
            return Err(ConfigError::LadderOrigin);
        }
        check_monotonic("up", &up)?;
        check_monotonic("down", &down)?;

        let top = up[units as usize];
        if top != f64::INFINITY {
            return Err(ConfigError::BoundedTop(top));
        }
        for c in 1..expected {
            if down[c - 1] > up[c] {
                return Err(ConfigError::Crossed {
                    lower: c - 1,
                    upper: c,
                    down: down[c - 1],
                    up: up[c],
                });
            }
        }

        Ok(Self {
            up,
            down,
            peak,
            mode,
        })
    }

    /// The tuned tables for 2- and 4-unit pools, or an even split otherwise.
    pub fn canonical(units: u32, peak: f64) -> ConfigResult<Self> {
        let inf = f64::INFINITY;
        match units {
            2 => Self::new(
                2,
                vec![0.0, 11.0, inf],
                vec![0.0, 8.0, peak],
                peak,
                LadderMode::Banded,
            ),
            4 => Self::new(
                4,
                vec![0.0, 11.0, 18.0, 27.0, inf],
                vec![0.0, 8.0, 15.0, 24.0, peak],
                peak,
                LadderMode::Banded,
            ),
            _ => Self::evenly_spaced(units, peak),
        }
    }

    /// Split `[0, peak]` into `units` equal bands with a little up-headroom.
    pub fn evenly_spaced(units: u32, peak: f64) -> ConfigResult<Self> {
        if units == 0 {
            return Err(ConfigError::EmptyPool);
        }
        let step = peak / f64::from(units);
        let mut up = vec![0.0];
        let mut down = vec![0.0];
        for c in 1..=units {
            down.push(step * f64::from(c));
            if c == units {
                up.push(f64::INFINITY);
            } else {
                up.push(step * (f64::from(c) + 0.35));
            }
        }
        Self::new(units, up, down, peak, LadderMode::Banded)
    }

    /// Same tables, different decision mode.
    pub fn with_mode(mut self, mode: LadderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Number of units in the pool.
    pub fn units(&self) -> u32 {
        (self.up.len() - 1) as u32
    }

    pub fn peak(&self) -> f64 {
        self.peak
    }

    pub fn mode(&self) -> LadderMode {
        self.mode
    }

    pub fn up(&self) -> &[f64] {
        &self.up
    }

    pub fn down(&self) -> &[f64] {
        &self.down
    }

    /// The first band containing `avg`, if any.
    pub fn band(&self, avg: f64) -> Option<u32> {
        (1..self.up.len())
            .find(|&c| self.down[c - 1] <= avg && avg <= self.up[c] && avg <= self.down[c])
            .map(|c| c as u32)
    }

    /// Decide the target unit count for this tick.
    ///
    /// `smoothed` must already include `raw`.
    pub fn decide(&self, smoothed: f64, raw: LoadSample, online: u32) -> ScaleDecision {
        if raw.value() > self.peak {
            return ScaleDecision::ScaleTo(self.units());
        }

        let target = match self.mode {
            LadderMode::Banded => self.band(smoothed),
            LadderMode::Stepped => self.step(smoothed, online),
        };

        match target {
            Some(c) if c != online => ScaleDecision::ScaleTo(c),
            _ => ScaleDecision::NoChange,
        }
    }

    fn step(&self, avg: f64, online: u32) -> Option<u32> {
        let units = self.units();
        let up = (1..units)
            .rev()
            .find(|&i| avg > self.up[i as usize] && online <= i)
            .map(|i| i + 1);
        up.or_else(|| {
            (1..units).find(|&i| avg < self.down[i as usize] && online > i)
        })
    }
}

fn check_monotonic(table: &'static str, values: &[f64]) -> ConfigResult<()> {
    for (index, pair) in values.windows(2).enumerate() {
        // Written negated so NaN entries fail too.
        if !(pair[0] <= pair[1]) {
            return Err(ConfigError::NotMonotonic {
                table,
                index: index + 1,
            });
        }
    }
    Ok(())
}
