//! In-memory host backends.
//!
//! `SimulatedPool` and `ScriptedLoad` stand in for real hardware when the
//! daemon runs with `--simulate`, and drive the controller in tests.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::backend::{CoreControl, LoadSource};
use crate::error::UnitError;

/// One unit operation issued against a [`SimulatedPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOp {
    Activate(u32),
    Deactivate(u32),
}

#[derive(Debug)]
struct PoolState {
    online: Vec<bool>,
    failing: HashSet<u32>,
    ops: Vec<UnitOp>,
}

/// A pool of units held in memory.
#[derive(Debug)]
pub struct SimulatedPool {
    state: Mutex<PoolState>,
    /// Artificial per-operation delay.
    latency: Duration,
}

impl SimulatedPool {
    /// A pool of `size` units with the first `online` of them up.
    pub fn new(size: u32, online: u32) -> Self {
        let online = online.clamp(1, size.max(1));
        Self {
            state: Mutex::new(PoolState {
                online: (0..size).map(|i| i < online).collect(),
                failing: HashSet::new(),
                ops: Vec::new(),
            }),
            latency: Duration::ZERO,
        }
    }

    /// Sleep this long inside every activate/deactivate call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make every future operation on `index` fail.
    pub fn fail_unit(&self, index: u32) {
        self.lock().failing.insert(index);
    }

    /// Every operation attempted so far, in order.
    pub fn ops(&self) -> Vec<UnitOp> {
        self.lock().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.lock().ops.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        // A panicking test thread must not wedge the pool for the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set(&self, index: u32, online: bool) -> Result<(), UnitError> {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        let mut state = self.lock();
        state.ops.push(if online {
            UnitOp::Activate(index)
        } else {
            UnitOp::Deactivate(index)
        });
        if index as usize >= state.online.len() {
            return Err(UnitError::NoSuchUnit(index));
        }
        if index == 0 && !online {
            return Err(UnitError::Pinned(0));
        }
        if state.failing.contains(&index) {
            return Err(UnitError::Refused {
                index,
                reason: "simulated failure".to_string(),
            });
        }
        state.online[index as usize] = online;
        Ok(())
    }
}

impl CoreControl for SimulatedPool {
    fn online_count(&self) -> u32 {
        self.lock().online.iter().filter(|&&on| on).count() as u32
    }

    fn is_online(&self, index: u32) -> bool {
        self.lock().online.get(index as usize).copied().unwrap_or(false)
    }

    fn activate(&self, index: u32) -> Result<(), UnitError> {
        self.set(index, true)
    }

    fn deactivate(&self, index: u32) -> Result<(), UnitError> {
        self.set(index, false)
    }
}

/// Replays queued readings, then repeats a fallback value.
#[derive(Debug)]
pub struct ScriptedLoad {
    queue: Mutex<VecDeque<Option<f64>>>,
    fallback: Mutex<Option<f64>>,
    reads: AtomicU64,
}

impl ScriptedLoad {
    pub fn new(fallback: f64) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Some(fallback)),
            reads: AtomicU64::new(0),
        }
    }

    /// Queue readings to be returned before the fallback.
    pub fn push(&self, samples: impl IntoIterator<Item = f64>) {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.extend(samples.into_iter().map(Some));
    }

    /// Queue a reading that fails.
    pub fn push_unreadable(&self) {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(None);
    }

    pub fn set_fallback(&self, value: f64) {
        *self.fallback.lock().unwrap_or_else(|e| e.into_inner()) = Some(value);
    }

    /// Number of readings taken so far.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }
}

impl LoadSource for ScriptedLoad {
    fn load_sample(&self) -> Option<f64> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let queued = self
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match queued {
            Some(sample) => sample,
            None => *self.fallback.lock().unwrap_or_else(|e| e.into_inner()),
        }
    }
}
