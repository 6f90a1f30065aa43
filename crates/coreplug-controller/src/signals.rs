//! Signal coordinator — external triggers turned into controller changes.
//!
//! Suspend, resume, activity pulses and the enable switch arrive from
//! arbitrary tasks. Each handler takes the controller's operations lock
//! before touching units, so a suspend never races a tick that is still
//! bringing units online.
//!
//! Signals delivered before the loop starts, or after it stops, are
//! ignored and reported as such.

use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::controller::Inner;

/// Cloneable handle for delivering host signals to a controller.
#[derive(Clone)]
pub struct SignalCoordinator {
    inner: Arc<Inner>,
}

impl SignalCoordinator {
    pub(crate) fn new(inner: Arc<Inner>) -> Self {
        Self { inner }
    }

    fn accepting(&self, signal: &'static str) -> bool {
        let running = self.inner.is_running();
        if !running {
            debug!(signal, "controller not running, signal ignored");
        }
        running
    }

    /// Request a near-immediate re-evaluation.
    ///
    /// Does nothing while suspended or disabled. Returns whether a tick
    /// was scheduled.
    pub fn on_activity_pulse(&self) -> bool {
        if !self.accepting("activity") {
            return false;
        }

        let kick = {
            let shared = self.inner.lock();
            (shared.enabled && !shared.clock.is_quiescent()).then(|| shared.clock.fast_kick())
        };

        match kick {
            Some(delay) => {
                self.inner.schedule.kick(delay);
                trace!("activity pulse, fast tick scheduled");
                true
            }
            None => false,
        }
    }

    /// Collapse the pool to one unit and stop periodic ticks.
    ///
    /// Waits for an in-flight tick to finish first. Returns whether the
    /// signal was handled.
    pub async fn on_suspend(&self) -> bool {
        if !self.accepting("suspend") {
            return false;
        }

        let _ops = self.inner.ops.lock().await;
        self.inner.schedule.cancel();

        let was_quiescent = {
            let mut shared = self.inner.lock();
            let was = shared.clock.is_quiescent();
            shared.clock.quiesce();
            was
        };
        if !was_quiescent {
            info!("suspending, collapsing pool to one unit");
        }

        if let Some(report) = self.inner.apply(|_| 1).await {
            debug!(from = report.from, failed = report.failed, "pool collapsed");
        }
        true
    }

    /// Leave suspension: bring one extra unit up and tick soon.
    ///
    /// While disabled the pool is held at maximum instead and no tick is
    /// scheduled. Returns whether the signal was handled.
    pub async fn on_resume(&self) -> bool {
        if !self.accepting("resume") {
            return false;
        }

        let _ops = self.inner.ops.lock().await;
        let (was_quiescent, enabled, kick) = {
            let mut shared = self.inner.lock();
            let was = shared.clock.is_quiescent();
            shared.clock.wake();
            (was, shared.enabled, shared.clock.fast_kick())
        };

        if !enabled {
            let pool_size = self.inner.pool_size;
            self.inner.apply(move |_| pool_size).await;
            info!("resumed while disabled, pool held at maximum");
            return true;
        }

        if was_quiescent {
            let pool_size = self.inner.pool_size;
            self.inner
                .apply(move |online| (online + 1).min(pool_size))
                .await;
            info!("resumed, fast tick scheduled");
        } else {
            debug!("resume while active");
        }
        self.inner.schedule.kick(kick);
        true
    }

    /// Flip the enable switch.
    ///
    /// Disabling cancels the pending tick and brings every unit online;
    /// enabling schedules a fast tick unless suspended. Returns whether
    /// the signal was handled.
    pub async fn set_enabled(&self, enabled: bool) -> bool {
        if !self.accepting("enable") {
            return false;
        }

        let _ops = self.inner.ops.lock().await;
        let (changed, quiescent, kick) = {
            let mut shared = self.inner.lock();
            let changed = shared.enabled != enabled;
            shared.enabled = enabled;
            (changed, shared.clock.is_quiescent(), shared.clock.fast_kick())
        };

        if !changed {
            return true;
        }

        if enabled {
            info!("scaling enabled");
            if !quiescent {
                self.inner.schedule.kick(kick);
            }
        } else {
            info!("scaling disabled, bringing every unit online");
            self.inner.schedule.cancel();
            let pool_size = self.inner.pool_size;
            self.inner.apply(move |_| pool_size).await;
        }
        true
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.lock().enabled
    }
}
