//! Applying a target unit count against the host.

use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::backend::CoreControl;

/// Outcome of one [`set_cpus`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyReport {
    /// Online count before any change.
    pub from: u32,
    /// Target after clamping to `1..=pool`.
    pub target: u32,
    /// Units whose state actually changed.
    pub changed: u32,
    /// Units the host refused to change.
    pub failed: u32,
}

impl ApplyReport {
    /// Report for a tick that left the pool alone.
    pub fn unchanged(online: u32) -> Self {
        Self {
            from: online,
            target: online,
            changed: 0,
            failed: 0,
        }
    }

    /// True if at least one unit was brought online.
    pub fn scaled_up(&self) -> bool {
        self.target > self.from && self.changed > 0
    }
}

/// Move the pool toward `target` online units, one unit at a time.
///
/// Units are picked by state, not by count: offline units come up in
/// ascending index order and online units go down in descending order,
/// so a unit that failed earlier is retried and a gap left by it does
/// not stop a collapse. A unit that fails is logged and skipped.
pub fn set_cpus(control: &dyn CoreControl, target: u32, pool_size: u32) -> ApplyReport {
    let target = target.clamp(1, pool_size.max(1));
    let from = control.online_count();
    let mut online = from;
    let mut report = ApplyReport {
        from,
        target,
        changed: 0,
        failed: 0,
    };

    match target.cmp(&from) {
        Ordering::Equal => {}
        Ordering::Greater => {
            for index in 0..pool_size {
                if online >= target {
                    break;
                }
                if control.is_online(index) {
                    continue;
                }
                match control.activate(index) {
                    Ok(()) => {
                        online += 1;
                        report.changed += 1;
                    }
                    Err(e) => {
                        warn!(unit = index, error = %e, "failed to bring unit online");
                        report.failed += 1;
                    }
                }
            }
        }
        Ordering::Less => {
            for index in (0..pool_size).rev() {
                if online <= target {
                    break;
                }
                if !control.is_online(index) {
                    continue;
                }
                match control.deactivate(index) {
                    Ok(()) => {
                        online -= 1;
                        report.changed += 1;
                    }
                    Err(e) => {
                        warn!(unit = index, error = %e, "failed to take unit offline");
                        report.failed += 1;
                    }
                }
            }
        }
    }

    if report.changed > 0 || report.failed > 0 {
        debug!(
            from,
            target,
            online,
            changed = report.changed,
            failed = report.failed,
            "applied unit count"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimulatedPool, UnitOp};

    #[test]
    fn scale_up_activates_ascending() {
        let pool = SimulatedPool::new(4, 1);
        let report = set_cpus(&pool, 4, 4);

        assert_eq!(report.changed, 3);
        assert!(report.scaled_up());
        assert_eq!(pool.online_count(), 4);
        assert_eq!(
            pool.ops(),
            vec![UnitOp::Activate(1), UnitOp::Activate(2), UnitOp::Activate(3)]
        );
    }

    #[test]
    fn scale_down_deactivates_descending() {
        let pool = SimulatedPool::new(4, 4);
        let report = set_cpus(&pool, 2, 4);

        assert_eq!(report.changed, 2);
        assert!(!report.scaled_up());
        assert_eq!(pool.ops(), vec![UnitOp::Deactivate(3), UnitOp::Deactivate(2)]);
    }

    #[test]
    fn equal_target_is_a_no_op() {
        let pool = SimulatedPool::new(4, 3);
        let report = set_cpus(&pool, 3, 4);

        assert_eq!(report, ApplyReport::unchanged(3));
        assert!(pool.ops().is_empty());
    }

    #[test]
    fn target_is_clamped_into_pool() {
        let pool = SimulatedPool::new(4, 3);
        let report = set_cpus(&pool, 0, 4);
        assert_eq!(report.target, 1);
        assert_eq!(pool.online_count(), 1);

        let report = set_cpus(&pool, 9, 4);
        assert_eq!(report.target, 4);
        assert_eq!(pool.online_count(), 4);
    }

    #[test]
    fn failing_unit_does_not_stop_the_rest() {
        let pool = SimulatedPool::new(4, 1);
        pool.fail_unit(2);

        let report = set_cpus(&pool, 4, 4);
        assert_eq!(report.changed, 2);
        assert_eq!(report.failed, 1);
        assert!(pool.is_online(1));
        assert!(!pool.is_online(2));
        assert!(pool.is_online(3));
    }

    #[test]
    fn collapse_after_failed_unit_reaches_one() {
        let pool = SimulatedPool::new(4, 1);
        pool.fail_unit(2);
        set_cpus(&pool, 4, 4);
        assert_eq!(pool.online_count(), 3);

        pool.clear_ops();
        let report = set_cpus(&pool, 1, 4);
        assert_eq!(report.changed, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(pool.online_count(), 1);
        assert_eq!(pool.ops(), vec![UnitOp::Deactivate(3), UnitOp::Deactivate(1)]);
    }

    #[test]
    fn rescale_after_failure_reports_no_phantom_change() {
        let pool = SimulatedPool::new(4, 1);
        pool.fail_unit(2);
        set_cpus(&pool, 4, 4);

        pool.clear_ops();
        let report = set_cpus(&pool, 4, 4);
        assert_eq!(report.from, 3);
        assert_eq!(report.changed, 0);
        assert_eq!(report.failed, 1);
        assert!(!report.scaled_up());
        assert_eq!(pool.ops(), vec![UnitOp::Activate(2)]);
    }

    #[test]
    fn refused_unit_is_replaced_by_the_next_offline_one() {
        let pool = SimulatedPool::new(4, 1);
        pool.fail_unit(1);

        let report = set_cpus(&pool, 2, 4);
        assert_eq!(report.changed, 1);
        assert_eq!(pool.online_count(), 2);
        assert!(!pool.is_online(1));
        assert!(pool.is_online(2));
    }
}
