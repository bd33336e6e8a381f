//! One-shot deadlines on the host clock
//!
//! The engine never blocks; idle detection and debouncing are expressed as
//! deadlines that the frame loop polls. Cancelling an idle or already-fired
//! deadline is a no-op.

/// A restartable one-shot timer
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Deadline {
    due_ms: Option<f64>,
}

impl Deadline {
    pub const fn new() -> Self {
        Self { due_ms: None }
    }

    /// Arm (or re-arm) the deadline `delay_ms` after `now_ms`
    pub fn arm(&mut self, now_ms: f64, delay_ms: f64) {
        self.due_ms = Some(now_ms + delay_ms.max(0.0));
    }

    /// Disarm. Safe to call at any time.
    pub fn cancel(&mut self) {
        self.due_ms = None;
    }

    pub fn is_armed(&self) -> bool {
        self.due_ms.is_some()
    }

    /// Whether the deadline is armed and still in the future
    pub fn is_pending(&self, now_ms: f64) -> bool {
        matches!(self.due_ms, Some(due) if now_ms < due)
    }

    /// Milliseconds left before firing, if armed
    pub fn remaining(&self, now_ms: f64) -> Option<f64> {
        self.due_ms.map(|due| (due - now_ms).max(0.0))
    }

    /// Fire if due. Returns true exactly once per arming.
    pub fn fire(&mut self, now_ms: f64) -> bool {
        match self.due_ms {
            Some(due) if now_ms >= due => {
                self.due_ms = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once() {
        let mut deadline = Deadline::new();
        deadline.arm(100.0, 80.0);
        assert!(!deadline.fire(150.0));
        assert!(deadline.fire(180.0));
        assert!(!deadline.fire(500.0));
    }

    #[test]
    fn test_rearm_pushes_deadline_back() {
        let mut deadline = Deadline::new();
        deadline.arm(0.0, 80.0);
        deadline.arm(60.0, 80.0);
        assert!(!deadline.fire(100.0));
        assert_eq!(deadline.remaining(100.0), Some(40.0));
        assert!(deadline.fire(140.0));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut deadline = Deadline::new();
        deadline.cancel();
        deadline.arm(0.0, 10.0);
        deadline.cancel();
        deadline.cancel();
        assert!(!deadline.is_armed());
        assert!(!deadline.fire(1_000.0));
    }
}
