//! Scaling controller — the periodic tick and its loop.
//!
//! The controller owns the load window, the ladder and the sampling clock,
//! and drives the host's [`CoreControl`] from a single tokio task.
//!
//! # Locking
//!
//! ```text
//! ops    (tokio Mutex)  held by any path that changes units: tick,
//!                       suspend, resume, enable/disable
//! shared (std Mutex)    window + clock + enabled flag; held only for
//!                       in-memory reads and writes
//! ```
//!
//! Host calls run on the blocking pool while `ops` is held and `shared`
//! is released, so one change is always applied unit by unit and two
//! changes never overlap.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use coreplug_core::{
    ConfigError, ControllerState, LadderMode, LoadSample, LoadWindow, PlugConfig, SamplingClock,
    SamplingInterval, ScaleDecision, ThresholdLadder,
};

use crate::apply::{ApplyReport, set_cpus};
use crate::backend::{CoreControl, LoadSource};
use crate::error::{ControllerError, ControllerResult};
use crate::schedule::TickSchedule;
use crate::signals::SignalCoordinator;

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickReport {
    /// The controller is suspended; nothing was read or changed.
    Skipped,
    /// The controller is disabled; the pool was held at maximum.
    Disabled(ApplyReport),
    /// The load source failed; the pool was maximized.
    Unreadable(ApplyReport),
    /// The ladder was evaluated.
    Evaluated {
        sample: LoadSample,
        smoothed: f64,
        decision: ScaleDecision,
        applied: ApplyReport,
        next_delay: Duration,
    },
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub state: ControllerState,
    pub enabled: bool,
    pub running: bool,
    pub interval: SamplingInterval,
    pub interval_ms: u64,
    pub pool_size: u32,
    pub online: u32,
    pub smoothed: f64,
    pub window: Vec<f64>,
    pub ladder_mode: LadderMode,
    /// Ticks that evaluated the ladder.
    pub evaluations: u64,
    pub tick_pending: bool,
}

/// Mutable state shared by the tick and the signal handlers.
pub(crate) struct Shared {
    pub(crate) window: LoadWindow,
    pub(crate) clock: SamplingClock,
    pub(crate) enabled: bool,
}

impl Shared {
    pub(crate) fn state(&self) -> ControllerState {
        if self.clock.is_quiescent() {
            ControllerState::Suspended
        } else {
            ControllerState::Active
        }
    }
}

pub(crate) struct Inner {
    pub(crate) pool_size: u32,
    ladder: ThresholdLadder,
    shared: Mutex<Shared>,
    /// Serializes every path that issues unit operations.
    pub(crate) ops: tokio::sync::Mutex<()>,
    pub(crate) schedule: TickSchedule,
    pub(crate) control: Arc<dyn CoreControl>,
    source: Arc<dyn LoadSource>,
    running: AtomicBool,
    evaluations: AtomicU64,
}

impl Inner {
    pub(crate) fn lock(&self) -> MutexGuard<'_, Shared> {
        // Shared holds plain values; a poisoned guard is still consistent.
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run `set_cpus` on the blocking pool. `target` receives the current
    /// online count.
    pub(crate) async fn apply<F>(self: &Arc<Self>, target: F) -> Option<ApplyReport>
    where
        F: FnOnce(u32) -> u32 + Send + 'static,
    {
        let inner = Arc::clone(self);
        let result = tokio::task::spawn_blocking(move || {
            let target = target(inner.control.online_count());
            set_cpus(inner.control.as_ref(), target, inner.pool_size)
        })
        .await;

        match result {
            Ok(report) => Some(report),
            Err(e) => {
                error!(error = %e, "unit operation task failed");
                None
            }
        }
    }

    fn maximize(&self) -> ApplyReport {
        set_cpus(self.control.as_ref(), self.pool_size, self.pool_size)
    }

    /// The body of one tick. Blocking; call with `ops` held.
    fn evaluate(&self) -> TickReport {
        let (quiescent, enabled) = {
            let shared = self.lock();
            (shared.clock.is_quiescent(), shared.enabled)
        };

        if quiescent {
            debug!("controller suspended, tick skipped");
            return TickReport::Skipped;
        }

        if !enabled {
            let applied = self.maximize();
            debug!(online = applied.target, "controller disabled, pool held at maximum");
            return TickReport::Disabled(applied);
        }

        let Some(raw) = self.source.load_sample() else {
            warn!("load sample unavailable, maximizing pool");
            let applied = self.maximize();
            let delay = self.lock().clock.next_delay(false);
            self.schedule.rearm(delay);
            return TickReport::Unreadable(applied);
        };

        let sample = LoadSample::new(raw);
        let online = self.control.online_count();

        let (smoothed, decision) = {
            let mut shared = self.lock();
            let smoothed = shared.window.push(sample);
            if shared.window.instantaneous_peak(sample) {
                debug!(sample = sample.value(), "load peak, ladder bypassed");
            }
            (smoothed, self.ladder.decide(smoothed, sample, online))
        };

        let applied = match decision {
            ScaleDecision::ScaleTo(target) => set_cpus(self.control.as_ref(), target, self.pool_size),
            ScaleDecision::NoChange => ApplyReport::unchanged(online),
        };

        let next_delay = self.lock().clock.next_delay(applied.scaled_up());
        self.schedule.rearm(next_delay);
        self.evaluations.fetch_add(1, Ordering::Relaxed);

        debug!(
            sample = sample.value(),
            smoothed,
            online,
            ?decision,
            next_ms = next_delay.as_millis() as u64,
            "tick evaluated"
        );

        TickReport::Evaluated {
            sample,
            smoothed,
            decision,
            applied,
            next_delay,
        }
    }
}

/// Decides how many pool units should be online and keeps them there.
///
/// Cheap to clone; all clones share one controller.
#[derive(Clone)]
pub struct ScalingController {
    inner: Arc<Inner>,
}

impl ScalingController {
    /// Create a controller. It does nothing until [`spawn`](Self::spawn)
    /// or [`run`](Self::run).
    ///
    /// The window and the ladder must agree on the peak threshold.
    pub fn new(
        ladder: ThresholdLadder,
        window: LoadWindow,
        clock: SamplingClock,
        control: Arc<dyn CoreControl>,
        source: Arc<dyn LoadSource>,
    ) -> ControllerResult<Self> {
        if window.peak() != ladder.peak() {
            return Err(ConfigError::PeakMismatch {
                window: window.peak(),
                ladder: ladder.peak(),
            }
            .into());
        }

        Ok(Self {
            inner: Arc::new(Inner {
                pool_size: ladder.units(),
                ladder,
                shared: Mutex::new(Shared {
                    window,
                    clock,
                    enabled: true,
                }),
                ops: tokio::sync::Mutex::new(()),
                schedule: TickSchedule::new(),
                control,
                source,
                running: AtomicBool::new(false),
                evaluations: AtomicU64::new(0),
            }),
        })
    }

    /// Build every component from a parsed config file.
    pub fn from_config(
        config: &PlugConfig,
        control: Arc<dyn CoreControl>,
        source: Arc<dyn LoadSource>,
    ) -> ControllerResult<Self> {
        let controller = Self::new(
            config.build_ladder()?,
            config.build_window()?,
            config.build_clock()?,
            control,
            source,
        )?;
        Ok(controller.with_enabled(config.enabled()))
    }

    /// Set the initial value of the enable switch.
    pub fn with_enabled(self, enabled: bool) -> Self {
        self.inner.lock().enabled = enabled;
        self
    }

    /// Handle for delivering suspend, resume, activity and enable signals.
    pub fn signals(&self) -> SignalCoordinator {
        SignalCoordinator::new(Arc::clone(&self.inner))
    }

    pub fn pool_size(&self) -> u32 {
        self.inner.pool_size
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    /// Start the tick loop on a new task.
    ///
    /// The controller accepts signals as soon as this returns.
    pub fn spawn(&self, shutdown: watch::Receiver<bool>) -> ControllerResult<JoinHandle<()>> {
        self.begin()?;
        let this = self.clone();
        Ok(tokio::spawn(async move {
            this.drive(shutdown).await;
        }))
    }

    /// Run the tick loop on the current task until `shutdown` changes.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> ControllerResult<()> {
        self.begin()?;
        self.drive(shutdown).await;
        Ok(())
    }

    /// Run one tick now, waiting for any in-flight unit change first.
    pub async fn tick(&self) -> Option<TickReport> {
        let _ops = self.inner.ops.lock().await;
        let inner = Arc::clone(&self.inner);
        match tokio::task::spawn_blocking(move || inner.evaluate()).await {
            Ok(report) => Some(report),
            Err(e) => {
                error!(error = %e, "tick task failed");
                None
            }
        }
    }

    /// Snapshot of the controller. The online count is read on the
    /// blocking pool, like every other host call.
    pub async fn status(&self) -> ControllerStatus {
        let control = Arc::clone(&self.inner.control);
        let online = match tokio::task::spawn_blocking(move || control.online_count()).await {
            Ok(online) => online,
            Err(e) => {
                error!(error = %e, "online count task failed");
                0
            }
        };

        let shared = self.inner.lock();
        ControllerStatus {
            state: shared.state(),
            enabled: shared.enabled,
            running: self.inner.is_running(),
            interval: shared.clock.interval(),
            interval_ms: shared.clock.current_delay().as_millis() as u64,
            pool_size: self.inner.pool_size,
            online,
            smoothed: shared.window.smoothed(),
            window: shared.window.samples(),
            ladder_mode: self.inner.ladder.mode(),
            evaluations: self.inner.evaluations.load(Ordering::Relaxed),
            tick_pending: self.inner.schedule.pending().is_some(),
        }
    }

    fn begin(&self) -> ControllerResult<()> {
        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ControllerError::AlreadyRunning);
        }

        let kick = self.inner.lock().clock.fast_kick();
        self.inner.schedule.kick(kick);
        info!(
            pool_size = self.inner.pool_size,
            mode = ?self.inner.ladder.mode(),
            "scaling controller started"
        );
        Ok(())
    }

    async fn drive(&self, mut shutdown: watch::Receiver<bool>) {
        let mut deadline = self.inner.schedule.subscribe();

        loop {
            let next = *deadline.borrow_and_update();
            let wait = async move {
                match next {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = wait => {
                    if let Some(at) = next {
                        self.inner.schedule.consume(at);
                    }
                    self.tick().await;
                }
                changed = deadline.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = shutdown.changed() => {
                    info!("scaling controller shutting down");
                    break;
                }
            }
        }

        self.inner.schedule.cancel();
        self.inner.running.store(false, Ordering::SeqCst);
    }
}
