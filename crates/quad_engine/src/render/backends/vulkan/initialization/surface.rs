//! Window-side surface interface
//!
//! The swapchain only needs two things from the window system: the current
//! framebuffer size and a way to block until something happens. Keeping that
//! behind a trait lets the rebuild path run against a fake window in tests.

use ash::vk;

/// What the swapchain lifecycle needs from the window system
pub trait SurfaceProvider {
    /// Framebuffer size in pixels, `(0, 0)` while minimized
    fn framebuffer_size(&self) -> (u32, u32);

    /// Block until the next window system event arrives
    fn wait_events(&mut self);
}

/// Block until the framebuffer has a non-zero size and return it
///
/// A minimized window reports zero; building a swapchain against that is invalid.
pub fn wait_for_drawable_extent<P: SurfaceProvider + ?Sized>(provider: &mut P) -> vk::Extent2D {
    let (mut width, mut height) = provider.framebuffer_size();
    while width == 0 || height == 0 {
        log::debug!("Framebuffer is {}x{}, waiting for events", width, height);
        provider.wait_events();
        (width, height) = provider.framebuffer_size();
    }
    vk::Extent2D { width, height }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::VecDeque;

    /// Window stand-in that replays a scripted sequence of sizes
    pub struct ScriptedWindow {
        sizes: VecDeque<(u32, u32)>,
        current: (u32, u32),
        pub waits: usize,
    }

    impl ScriptedWindow {
        pub fn new(sizes: &[(u32, u32)]) -> Self {
            let mut sizes: VecDeque<_> = sizes.iter().copied().collect();
            let current = sizes.pop_front().unwrap_or((800, 600));
            Self { sizes, current, waits: 0 }
        }
    }

    impl SurfaceProvider for ScriptedWindow {
        fn framebuffer_size(&self) -> (u32, u32) {
            self.current
        }

        fn wait_events(&mut self) {
            self.waits += 1;
            if let Some(next) = self.sizes.pop_front() {
                self.current = next;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::test_support::ScriptedWindow;

    #[test]
    fn test_returns_immediately_when_visible() {
        let mut window = ScriptedWindow::new(&[(800, 600)]);
        let extent = wait_for_drawable_extent(&mut window);
        assert_eq!((extent.width, extent.height), (800, 600));
        assert_eq!(window.waits, 0);
    }

    #[test]
    fn test_waits_while_minimized() {
        let mut window = ScriptedWindow::new(&[(0, 0), (0, 0), (640, 0), (640, 480)]);
        let extent = wait_for_drawable_extent(&mut window);
        assert_eq!((extent.width, extent.height), (640, 480));
        assert_eq!(window.waits, 3);
    }
}
