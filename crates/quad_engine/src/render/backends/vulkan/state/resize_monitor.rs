//! Surface invalidation flag
//!
//! The window system reports resizes asynchronously relative to the frame loop.
//! [`ResizeMonitor`] latches those reports until the frame synchronizer consumes
//! them after presentation, so each burst of resize events causes one rebuild.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Latched "surface is stale" flag owned by the renderer
#[derive(Debug, Default)]
pub struct ResizeMonitor {
    stale: Arc<AtomicBool>,
}

/// Cloneable handle for marking the surface stale from event handling code
#[derive(Debug, Clone)]
pub struct ResizeHandle {
    stale: Arc<AtomicBool>,
}

impl ResizeMonitor {
    /// Create a monitor with the flag cleared
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that event code can hold on to
    pub fn handle(&self) -> ResizeHandle {
        ResizeHandle {
            stale: Arc::clone(&self.stale),
        }
    }

    /// Mark the surface stale
    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::Release);
    }

    /// Whether a rebuild has been requested, without consuming it
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    /// Mark the surface stale unless `reported` matches the extent in use
    ///
    /// Size events queued while a rebuild waited for a drawable window repeat
    /// the extent that rebuild already picked up. Returns whether the flag was set.
    pub fn mark_if_resized(&self, current: (u32, u32), reported: (u32, u32)) -> bool {
        let resized = current != reported;
        if resized {
            self.mark_stale();
        }
        resized
    }

    /// Consume the flag, returning whether it was set
    pub fn take_stale(&self) -> bool {
        self.stale.swap(false, Ordering::AcqRel)
    }
}

impl ResizeHandle {
    /// Mark the surface stale
    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_clears_flag() {
        let monitor = ResizeMonitor::new();
        assert!(!monitor.take_stale());

        monitor.mark_stale();
        assert!(monitor.is_stale());
        assert!(monitor.take_stale());
        assert!(!monitor.take_stale());
    }

    #[test]
    fn test_size_matching_current_extent_ignored() {
        let monitor = ResizeMonitor::new();
        // Restored from minimize: the rebuild already used 800x600
        assert!(!monitor.mark_if_resized((800, 600), (800, 600)));
        assert!(!monitor.take_stale());
    }

    #[test]
    fn test_changed_size_marks_stale() {
        let monitor = ResizeMonitor::new();
        assert!(monitor.mark_if_resized((800, 600), (1024, 600)));
        assert!(monitor.take_stale());

        // Minimizing reports a zero extent
        assert!(monitor.mark_if_resized((800, 600), (0, 0)));
        assert!(monitor.take_stale());
    }

    #[test]
    fn test_repeated_marks_collapse() {
        let monitor = ResizeMonitor::new();
        let handle = monitor.handle();
        handle.mark_stale();
        handle.clone().mark_stale();
        monitor.mark_stale();

        assert!(monitor.take_stale());
        assert!(!monitor.is_stale());
    }
}
