//! A coalesced, non-blocking "touched since last check" latch.
//!
//! Used to carry cheap activity feedback from a bucket's hot `Take` path to
//! its cold, once-per-`MaxIdleMillis` watcher.

use std::sync::atomic::{AtomicBool, Ordering};

/// A single-slot latch. `report_activity` is a non-blocking set; it never
/// allocates and never blocks. `activity_detected` is an atomic
/// read-and-clear.
///
/// Any number of concurrent `report_activity` calls between two
/// `activity_detected` calls coalesce into a single observable event.
#[derive(Debug, Default)]
pub struct ActivitySignal(AtomicBool);

impl ActivitySignal {
    /// Creates a signal with no activity recorded.
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Marks activity. A no-op if already set.
    pub fn report_activity(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns whether activity was reported since the last call, clearing
    /// the latch.
    pub fn activity_detected(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn fresh_signal_reports_no_activity() {
        let sig = ActivitySignal::new();
        assert!(!sig.activity_detected());
    }

    #[test]
    fn single_report_is_observed_once() {
        let sig = ActivitySignal::new();
        sig.report_activity();
        assert!(sig.activity_detected());
        assert!(!sig.activity_detected());
    }

    #[test]
    fn repeated_reports_coalesce() {
        let sig = ActivitySignal::new();
        for _ in 0..100 {
            sig.report_activity();
        }
        assert!(sig.activity_detected());
        assert!(!sig.activity_detected());
    }

    #[tokio::test]
    async fn concurrent_reports_coalesce_into_one_event() {
        let sig = Arc::new(ActivitySignal::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let sig = sig.clone();
            handles.push(tokio::spawn(async move {
                sig.report_activity();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(sig.activity_detected());
        assert!(!sig.activity_detected());
    }
}
