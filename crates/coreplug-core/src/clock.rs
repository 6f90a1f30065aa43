//! Sampling clock — picks the delay before the next tick.

use std::time::Duration;

use crate::types::SamplingInterval;

pub const DEFAULT_IDLE: Duration = Duration::from_millis(1000);
pub const DEFAULT_BUSY: Duration = Duration::from_millis(500);
pub const DEFAULT_KICK: Duration = Duration::from_millis(10);

/// Tracks the current tick cadence and whether ticks are paused.
#[derive(Debug, Clone)]
pub struct SamplingClock {
    idle: Duration,
    busy: Duration,
    /// Delay used for out-of-band re-evaluation.
    kick: Duration,
    interval: SamplingInterval,
    /// Set while suspended; no periodic ticks are scheduled.
    quiescent: bool,
}

impl SamplingClock {
    pub fn new(idle: Duration, busy: Duration, kick: Duration) -> Self {
        Self {
            idle,
            busy,
            kick,
            interval: SamplingInterval::Idle,
            quiescent: false,
        }
    }

    /// Record the outcome of a tick and return the delay until the next one.
    pub fn next_delay(&mut self, scale_up_occurred: bool) -> Duration {
        self.interval = if scale_up_occurred {
            SamplingInterval::Busy
        } else {
            SamplingInterval::Idle
        };
        self.current_delay()
    }

    /// Delay for a near-immediate tick after resume or activity.
    pub fn fast_kick(&self) -> Duration {
        self.kick
    }

    pub fn interval(&self) -> SamplingInterval {
        self.interval
    }

    pub fn current_delay(&self) -> Duration {
        match self.interval {
            SamplingInterval::Idle => self.idle,
            SamplingInterval::Busy => self.busy,
        }
    }

    pub fn quiesce(&mut self) {
        self.quiescent = true;
    }

    /// Leave quiescence; the cadence restarts from idle.
    pub fn wake(&mut self) {
        self.quiescent = false;
        self.interval = SamplingInterval::Idle;
    }

    pub fn is_quiescent(&self) -> bool {
        self.quiescent
    }
}

impl Default for SamplingClock {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE, DEFAULT_BUSY, DEFAULT_KICK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_up_switches_to_busy_cadence() {
        let mut clock = SamplingClock::default();
        assert_eq!(clock.next_delay(true), Duration::from_millis(500));
        assert_eq!(clock.interval(), SamplingInterval::Busy);

        assert_eq!(clock.next_delay(false), Duration::from_millis(1000));
        assert_eq!(clock.interval(), SamplingInterval::Idle);
    }

    #[test]
    fn fast_kick_ignores_current_interval() {
        let mut clock = SamplingClock::default();
        clock.next_delay(true);
        assert_eq!(clock.fast_kick(), Duration::from_millis(10));
    }

    #[test]
    fn wake_resets_to_idle() {
        let mut clock = SamplingClock::default();
        clock.next_delay(true);
        clock.quiesce();
        assert!(clock.is_quiescent());

        clock.wake();
        assert!(!clock.is_quiescent());
        assert_eq!(clock.interval(), SamplingInterval::Idle);
    }
}
