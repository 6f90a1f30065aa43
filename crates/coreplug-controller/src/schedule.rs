//! Tick schedule — holds at most one pending tick deadline.
//!
//! The loop task watches the deadline and sleeps until it. A fast-kick
//! replaces whatever is pending; a post-tick re-arm only moves the
//! deadline earlier, so a kick that landed mid-tick is not lost.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Debug)]
pub(crate) struct TickSchedule {
    deadline: watch::Sender<Option<Instant>>,
}

impl TickSchedule {
    pub(crate) fn new() -> Self {
        let (deadline, _) = watch::channel(None);
        Self { deadline }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Option<Instant>> {
        self.deadline.subscribe()
    }

    /// Replace the pending tick with one `delay` from now.
    pub(crate) fn kick(&self, delay: Duration) {
        self.deadline.send_replace(Some(Instant::now() + delay));
    }

    /// Schedule a tick `delay` from now unless an earlier one is pending.
    pub(crate) fn rearm(&self, delay: Duration) {
        let at = Instant::now() + delay;
        self.deadline.send_if_modified(|slot| match slot {
            Some(pending) if *pending <= at => false,
            _ => {
                *slot = Some(at);
                true
            }
        });
    }

    /// Drop the pending tick, if any.
    pub(crate) fn cancel(&self) {
        self.deadline.send_if_modified(|slot| slot.take().is_some());
    }

    /// Retire the deadline `at` once it fires. A newer deadline is kept.
    pub(crate) fn consume(&self, at: Instant) {
        self.deadline.send_if_modified(|slot| {
            if *slot == Some(at) {
                *slot = None;
                true
            } else {
                false
            }
        });
    }

    pub(crate) fn pending(&self) -> Option<Instant> {
        *self.deadline.borrow()
    }
}
