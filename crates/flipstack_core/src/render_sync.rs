//! Render sync
//!
//! Continuous updates (accumulator progress, physics progress) arrive far more
//! often than the display refreshes. `RenderSync` keeps a single pending value
//! that the frame callback flushes at most once per tick.

/// Single-slot buffer between input handlers and the frame loop
#[derive(Clone, Debug)]
pub struct RenderSync<T: Copy> {
    pending: Option<T>,
    flushed: u64,
    dropped: u64,
}

impl<T: Copy> RenderSync<T> {
    pub fn new() -> Self {
        Self {
            pending: None,
            flushed: 0,
            dropped: 0,
        }
    }

    /// Replace the pending value
    pub fn push(&mut self, value: T) {
        self.pending = Some(value);
    }

    /// Take the pending value. Call once per rendering tick.
    pub fn flush(&mut self) -> Option<T> {
        let value = self.pending.take();
        if value.is_some() {
            self.flushed += 1;
        }
        value
    }

    /// Drop the pending value without applying it.
    ///
    /// Used when the session that produced it has ended.
    pub fn invalidate(&mut self) {
        if self.pending.take().is_some() {
            self.dropped += 1;
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of values handed to the frame loop
    pub fn flush_count(&self) -> u64 {
        self.flushed
    }

    /// Number of pending values discarded by `invalidate`
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }
}

impl<T: Copy> Default for RenderSync<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coalesces_to_latest() {
        let mut sync = RenderSync::new();
        for i in 0..10 {
            sync.push(i);
        }
        assert_eq!(sync.flush(), Some(9));
        assert_eq!(sync.flush(), None);
        assert_eq!(sync.flush_count(), 1);
    }

    #[test]
    fn test_invalidate_skips_stale_value() {
        let mut sync = RenderSync::new();
        sync.push(0.7f32);
        sync.invalidate();
        assert!(!sync.is_pending());
        assert_eq!(sync.flush(), None);
        assert_eq!(sync.dropped_count(), 1);

        // Invalidating an empty buffer is harmless
        sync.invalidate();
        assert_eq!(sync.dropped_count(), 1);
    }
}
