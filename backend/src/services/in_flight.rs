//! Per-kind mutual exclusion for generation runs.
//!
//! Each report kind owns one atomic flag. A run claims its kind with a single
//! compare-and-swap and receives an [`InFlightGuard`]; dropping the guard
//! clears the flag. Because release happens in `Drop`, every exit path of a
//! run (success, error, early return, panic) frees the kind. No lock is held
//! across the run itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::ReportKind;

/// Ephemeral record of a run in progress. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRun {
    pub kind: ReportKind,
    pub started_at: DateTime<Utc>,
}

/// Keyed set of in-flight markers, one per [`ReportKind`].
///
/// Cloning shares the underlying flags.
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    flags: Arc<[AtomicBool; ReportKind::ALL.len()]>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `kind`. Returns `None` if a run for `kind` is already active.
    pub fn try_acquire(&self, kind: ReportKind, started_at: DateTime<Utc>) -> Option<InFlightGuard> {
        self.flags[kind.index()]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;

        Some(InFlightGuard {
            flags: Arc::clone(&self.flags),
            run: GenerationRun { kind, started_at },
        })
    }

    pub fn is_running(&self, kind: ReportKind) -> bool {
        self.flags[kind.index()].load(Ordering::Acquire)
    }

    /// Kinds with an active run, in cadence order.
    pub fn running(&self) -> Vec<ReportKind> {
        ReportKind::ALL
            .into_iter()
            .filter(|kind| self.is_running(*kind))
            .collect()
    }
}

/// Proof of exclusive access to one kind; releases it on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    flags: Arc<[AtomicBool; ReportKind::ALL.len()]>,
    run: GenerationRun,
}

impl InFlightGuard {
    pub fn run(&self) -> &GenerationRun {
        &self.run
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flags[self.run.kind.index()].store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_second_acquire_is_rejected_until_release() {
        let registry = InFlightRegistry::new();
        let now = Utc::now();

        let guard = registry.try_acquire(ReportKind::Daily, now).unwrap();
        assert_eq!(guard.run().kind, ReportKind::Daily);
        assert!(registry.is_running(ReportKind::Daily));
        assert!(registry.try_acquire(ReportKind::Daily, now).is_none());

        drop(guard);
        assert!(!registry.is_running(ReportKind::Daily));
        assert!(registry.try_acquire(ReportKind::Daily, now).is_some());
    }

    #[test]
    fn test_kinds_are_independent() {
        let registry = InFlightRegistry::new();
        let now = Utc::now();

        let _daily = registry.try_acquire(ReportKind::Daily, now).unwrap();
        let _weekly = registry.try_acquire(ReportKind::Weekly, now).unwrap();
        assert_eq!(registry.running(), vec![ReportKind::Daily, ReportKind::Weekly]);
        assert!(!registry.is_running(ReportKind::Monthly));
    }

    #[test]
    fn test_clones_share_flags() {
        let registry = InFlightRegistry::new();
        let other = registry.clone();
        let _guard = registry.try_acquire(ReportKind::Monthly, Utc::now()).unwrap();
        assert!(other.try_acquire(ReportKind::Monthly, Utc::now()).is_none());
    }

    #[test]
    fn test_released_on_panic() {
        let registry = InFlightRegistry::new();
        let cloned = registry.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = cloned.try_acquire(ReportKind::Weekly, Utc::now()).unwrap();
            panic!("run blew up");
        });
        assert!(result.is_err());
        assert!(!registry.is_running(ReportKind::Weekly));
    }

    #[test]
    fn test_exactly_one_winner_under_contention() {
        let registry = InFlightRegistry::new();
        let winners = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(std::sync::Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                let winners = Arc::clone(&winners);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    if let Some(guard) = registry.try_acquire(ReportKind::Daily, Utc::now()) {
                        winners.fetch_add(1, Ordering::SeqCst);
                        // hold until every contender has tried
                        std::thread::sleep(std::time::Duration::from_millis(50));
                        drop(guard);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(!registry.is_running(ReportKind::Daily));
    }
}
