//! Frame pacing
//!
//! [`SyncManager`] owns the ring of in-flight frame slots and drives one frame
//! per call to [`SyncManager::draw_frame`]:
//!
//! 1. wait on the current slot's fence
//! 2. acquire a swapchain image (out-of-date: rebuild and stop, slot unchanged)
//! 3. prepare the image (wait for any other slot still using it, refresh uniforms)
//! 4. reset the fence and submit the prerecorded commands
//! 5. present; out-of-date, suboptimal or a pending resize rebuild the swapchain
//! 6. advance to the next slot
//!
//! The Vulkan calls live behind [`FrameBackend`], so the ordering rules can be
//! exercised without a GPU.

use ash::{vk, Device};
use crate::render::backends::vulkan::{VulkanResult, VulkanError, FrameSync, ResizeMonitor};

/// Result of asking the swapchain for the next image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Image acquired; `suboptimal` still allows rendering this frame
    Ready {
        /// Index of the acquired swapchain image
        image_index: u32,
        /// The swapchain no longer matches the surface exactly
        suboptimal: bool,
    },
    /// The swapchain can no longer be used with the surface
    OutOfDate,
}

/// Result of queueing an image for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Presented normally
    Presented,
    /// Presented, but the swapchain should be rebuilt
    Suboptimal,
    /// Not presented, the swapchain must be rebuilt
    OutOfDate,
}

/// What happened during one call to [`SyncManager::draw_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was submitted and presented
    Presented,
    /// The swapchain was rebuilt during this frame
    Rebuilt,
    /// Nothing was drawn (renderer has no pipeline)
    Skipped,
}

/// Per-frame operations the synchronizer sequences
///
/// `Slot` is whatever the backend keeps per frame in flight; for Vulkan that is
/// [`FrameSync`].
pub trait FrameBackend {
    /// Per-slot synchronization state
    type Slot;

    /// Block until the slot's previous submission has completed
    fn wait_for_slot(&mut self, slot: &Self::Slot) -> VulkanResult<()>;

    /// Acquire the next image, signaling the slot's image-available semaphore
    fn acquire_image(&mut self, slot: &Self::Slot) -> VulkanResult<AcquireOutcome>;

    /// Make the image safe to render into and update its per-image data
    fn prepare_image(&mut self, slot: &Self::Slot, image_index: u32) -> VulkanResult<()>;

    /// Reset the slot's fence and submit the image's commands
    fn submit(&mut self, slot: &Self::Slot, image_index: u32) -> VulkanResult<()>;

    /// Queue the image for presentation after rendering finishes
    fn present(&mut self, slot: &Self::Slot, image_index: u32) -> VulkanResult<PresentOutcome>;

    /// Recreate the swapchain and everything derived from it
    fn rebuild(&mut self) -> VulkanResult<()>;
}

/// Owns the frame slots and the current slot index
pub struct SyncManager<S = FrameSync> {
    slots: Vec<S>,
    current: usize,
}

impl SyncManager<FrameSync> {
    /// Create `frames_in_flight` Vulkan frame slots
    pub fn new(device: &Device, frames_in_flight: usize) -> VulkanResult<Self> {
        log::debug!("Creating SyncManager with {} frames in flight", frames_in_flight);

        let slots = (0..frames_in_flight)
            .map(|_| FrameSync::new(device))
            .collect::<VulkanResult<Vec<_>>>()?;

        Self::from_slots(slots)
    }
}

impl<S> SyncManager<S> {
    /// Build a synchronizer over existing slots
    pub fn from_slots(slots: Vec<S>) -> VulkanResult<Self> {
        if slots.is_empty() {
            return Err(VulkanError::InvalidOperation {
                reason: "At least one frame in flight is required".to_string(),
            });
        }

        Ok(Self { slots, current: 0 })
    }

    /// Index of the slot the next frame will use
    pub fn current_slot(&self) -> usize {
        self.current
    }

    /// Number of frame slots
    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// All slots, for teardown code that needs their handles
    pub fn slots(&self) -> &[S] {
        &self.slots
    }

    /// Run one iteration of the frame state machine
    pub fn draw_frame<B>(&mut self, backend: &mut B, resize: &ResizeMonitor) -> VulkanResult<FrameOutcome>
    where
        B: FrameBackend<Slot = S>,
    {
        let slot = &self.slots[self.current];

        backend.wait_for_slot(slot)?;

        let (image_index, acquire_suboptimal) = match backend.acquire_image(slot)? {
            AcquireOutcome::Ready { image_index, suboptimal } => (image_index, suboptimal),
            AcquireOutcome::OutOfDate => {
                // The fence was not reset, so the retry can wait on this slot again
                log::warn!("Swapchain out of date on acquire, rebuilding");
                backend.rebuild()?;
                return Ok(FrameOutcome::Rebuilt);
            }
        };

        backend.prepare_image(slot, image_index)?;
        backend.submit(slot, image_index)?;
        let presented = backend.present(slot, image_index)?;

        let resized = resize.take_stale();
        let needs_rebuild = resized || acquire_suboptimal || presented != PresentOutcome::Presented;

        let outcome = if needs_rebuild {
            log::info!(
                "Rebuilding swapchain (resized: {}, acquire suboptimal: {}, present: {:?})",
                resized,
                acquire_suboptimal,
                presented
            );
            backend.rebuild()?;
            FrameOutcome::Rebuilt
        } else {
            FrameOutcome::Presented
        };

        self.current = (self.current + 1) % self.slots.len();
        Ok(outcome)
    }
}

/// Convert the acquire result into an [`AcquireOutcome`], keeping other errors fatal
pub fn classify_acquire(result: ash::prelude::VkResult<(u32, bool)>) -> VulkanResult<AcquireOutcome> {
    match result {
        Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Ready { image_index, suboptimal }),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
        Err(e) => Err(VulkanError::Api(e)),
    }
}

/// Convert the present result into a [`PresentOutcome`], keeping other errors fatal
pub fn classify_present(result: ash::prelude::VkResult<bool>) -> VulkanResult<PresentOutcome> {
    match result {
        Ok(false) => Ok(PresentOutcome::Presented),
        Ok(true) => Ok(PresentOutcome::Suboptimal),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
        Err(e) => Err(VulkanError::Api(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Wait(usize),
        Acquire(usize),
        Prepare(usize, u32),
        Submit(usize, u32),
        Present(usize, u32),
        Rebuild,
    }

    /// Backend whose "GPU" finishes a slot's work only when that slot is waited on,
    /// the worst case for overlapping frames
    struct FakeBackend {
        pending: Vec<bool>,
        max_pending: usize,
        image_count: u32,
        next_image: u32,
        acquire_script: VecDeque<AcquireOutcome>,
        present_script: VecDeque<VulkanResult<PresentOutcome>>,
        calls: Vec<Call>,
        on_present: Option<Box<dyn FnMut()>>,
    }

    impl FakeBackend {
        fn new(slots: usize, image_count: u32) -> Self {
            Self {
                pending: vec![false; slots],
                max_pending: 0,
                image_count,
                next_image: 0,
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                calls: Vec::new(),
                on_present: None,
            }
        }

        fn rebuilds(&self) -> usize {
            self.calls.iter().filter(|c| **c == Call::Rebuild).count()
        }

        fn waits(&self) -> Vec<usize> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Wait(slot) => Some(*slot),
                    _ => None,
                })
                .collect()
        }
    }

    impl FrameBackend for FakeBackend {
        type Slot = usize;

        fn wait_for_slot(&mut self, slot: &usize) -> VulkanResult<()> {
            self.calls.push(Call::Wait(*slot));
            self.pending[*slot] = false;
            Ok(())
        }

        fn acquire_image(&mut self, slot: &usize) -> VulkanResult<AcquireOutcome> {
            self.calls.push(Call::Acquire(*slot));
            if let Some(outcome) = self.acquire_script.pop_front() {
                return Ok(outcome);
            }
            let image_index = self.next_image;
            self.next_image = (self.next_image + 1) % self.image_count;
            Ok(AcquireOutcome::Ready { image_index, suboptimal: false })
        }

        fn prepare_image(&mut self, slot: &usize, image_index: u32) -> VulkanResult<()> {
            self.calls.push(Call::Prepare(*slot, image_index));
            Ok(())
        }

        fn submit(&mut self, slot: &usize, image_index: u32) -> VulkanResult<()> {
            assert!(!self.pending[*slot], "slot {} submitted while its previous work was outstanding", slot);
            self.calls.push(Call::Submit(*slot, image_index));
            self.pending[*slot] = true;
            self.max_pending = self.max_pending.max(self.pending.iter().filter(|p| **p).count());
            Ok(())
        }

        fn present(&mut self, slot: &usize, image_index: u32) -> VulkanResult<PresentOutcome> {
            self.calls.push(Call::Present(*slot, image_index));
            if let Some(hook) = self.on_present.as_mut() {
                hook();
            }
            self.present_script.pop_front().unwrap_or(Ok(PresentOutcome::Presented))
        }

        fn rebuild(&mut self) -> VulkanResult<()> {
            self.calls.push(Call::Rebuild);
            self.next_image = 0;
            Ok(())
        }
    }

    fn manager(slots: usize) -> SyncManager<usize> {
        SyncManager::from_slots((0..slots).collect()).unwrap()
    }

    #[test]
    fn test_empty_slots_rejected() {
        assert!(SyncManager::<usize>::from_slots(Vec::new()).is_err());
    }

    #[test]
    fn test_slots_alternate_on_success() {
        let mut sync = manager(2);
        let mut backend = FakeBackend::new(2, 3);
        let resize = ResizeMonitor::new();

        for _ in 0..4 {
            assert_eq!(sync.draw_frame(&mut backend, &resize).unwrap(), FrameOutcome::Presented);
        }

        assert_eq!(backend.waits(), vec![0, 1, 0, 1]);
        assert_eq!(backend.rebuilds(), 0);
        assert_eq!(sync.current_slot(), 0);
    }

    #[test]
    fn test_call_order_within_frame() {
        let mut sync = manager(2);
        let mut backend = FakeBackend::new(2, 3);
        sync.draw_frame(&mut backend, &ResizeMonitor::new()).unwrap();

        assert_eq!(
            backend.calls,
            vec![Call::Wait(0), Call::Acquire(0), Call::Prepare(0, 0), Call::Submit(0, 0), Call::Present(0, 0)]
        );
    }

    #[test]
    fn test_outstanding_work_bounded_by_slot_count() {
        for slots in 1..=4 {
            let mut sync = manager(slots);
            let mut backend = FakeBackend::new(slots, 3);
            let resize = ResizeMonitor::new();

            for _ in 0..25 {
                sync.draw_frame(&mut backend, &resize).unwrap();
            }

            assert!(backend.max_pending <= slots);
            assert_eq!(backend.max_pending, slots);
        }
    }

    #[test]
    fn test_acquire_out_of_date_rebuilds_without_advancing() {
        let mut sync = manager(2);
        let mut backend = FakeBackend::new(2, 3);
        backend.acquire_script.push_back(AcquireOutcome::OutOfDate);
        let resize = ResizeMonitor::new();

        assert_eq!(sync.draw_frame(&mut backend, &resize).unwrap(), FrameOutcome::Rebuilt);
        assert_eq!(sync.current_slot(), 0);
        assert_eq!(backend.calls, vec![Call::Wait(0), Call::Acquire(0), Call::Rebuild]);

        assert_eq!(sync.draw_frame(&mut backend, &resize).unwrap(), FrameOutcome::Presented);
        assert_eq!(backend.waits(), vec![0, 0]);
        assert_eq!(backend.rebuilds(), 1);
        assert_eq!(sync.current_slot(), 1);
    }

    #[test]
    fn test_acquire_out_of_date_leaves_resize_flag_for_present() {
        let mut sync = manager(2);
        let mut backend = FakeBackend::new(2, 3);
        backend.acquire_script.push_back(AcquireOutcome::OutOfDate);
        let resize = ResizeMonitor::new();
        resize.mark_stale();

        sync.draw_frame(&mut backend, &resize).unwrap();
        assert!(resize.is_stale());

        assert_eq!(sync.draw_frame(&mut backend, &resize).unwrap(), FrameOutcome::Rebuilt);
        assert!(!resize.is_stale());
        assert_eq!(backend.rebuilds(), 2);
    }

    #[test]
    fn test_resize_during_present_rebuilds_once() {
        let mut sync = manager(2);
        let mut backend = FakeBackend::new(2, 3);
        let resize = ResizeMonitor::new();
        let handle = resize.handle();

        let mut fired = false;
        backend.on_present = Some(Box::new(move || {
            if !fired {
                handle.mark_stale();
                fired = true;
            }
        }));

        assert_eq!(sync.draw_frame(&mut backend, &resize).unwrap(), FrameOutcome::Rebuilt);
        assert_eq!(backend.rebuilds(), 1);
        assert!(!resize.is_stale());

        assert_eq!(sync.draw_frame(&mut backend, &resize).unwrap(), FrameOutcome::Presented);
        assert_eq!(backend.rebuilds(), 1);
    }

    #[test]
    fn test_suboptimal_acquire_presents_then_rebuilds() {
        let mut sync = manager(2);
        let mut backend = FakeBackend::new(2, 3);
        backend
            .acquire_script
            .push_back(AcquireOutcome::Ready { image_index: 2, suboptimal: true });

        assert_eq!(sync.draw_frame(&mut backend, &ResizeMonitor::new()).unwrap(), FrameOutcome::Rebuilt);
        assert_eq!(
            backend.calls,
            vec![
                Call::Wait(0),
                Call::Acquire(0),
                Call::Prepare(0, 2),
                Call::Submit(0, 2),
                Call::Present(0, 2),
                Call::Rebuild,
            ]
        );
        assert_eq!(sync.current_slot(), 1);
    }

    #[test]
    fn test_present_out_of_date_or_suboptimal_rebuilds_and_advances() {
        for outcome in [PresentOutcome::OutOfDate, PresentOutcome::Suboptimal] {
            let mut sync = manager(2);
            let mut backend = FakeBackend::new(2, 3);
            backend.present_script.push_back(Ok(outcome));

            assert_eq!(sync.draw_frame(&mut backend, &ResizeMonitor::new()).unwrap(), FrameOutcome::Rebuilt);
            assert_eq!(backend.rebuilds(), 1);
            assert_eq!(sync.current_slot(), 1);
        }
    }

    #[test]
    fn test_resize_and_out_of_date_share_one_rebuild() {
        let mut sync = manager(2);
        let mut backend = FakeBackend::new(2, 3);
        backend.present_script.push_back(Ok(PresentOutcome::OutOfDate));
        let resize = ResizeMonitor::new();
        resize.mark_stale();

        sync.draw_frame(&mut backend, &resize).unwrap();
        assert_eq!(backend.rebuilds(), 1);
        assert!(!resize.is_stale());
    }

    #[test]
    fn test_device_lost_is_fatal() {
        let mut sync = manager(2);
        let mut backend = FakeBackend::new(2, 3);
        backend.present_script.push_back(Err(VulkanError::Api(vk::Result::ERROR_DEVICE_LOST)));

        let result = sync.draw_frame(&mut backend, &ResizeMonitor::new());
        assert!(matches!(result, Err(VulkanError::Api(vk::Result::ERROR_DEVICE_LOST))));
        assert_eq!(backend.rebuilds(), 0);
        assert_eq!(sync.current_slot(), 0);
    }

    #[test]
    fn test_classify_acquire() {
        assert_eq!(
            classify_acquire(Ok((1, false))).unwrap(),
            AcquireOutcome::Ready { image_index: 1, suboptimal: false }
        );
        assert_eq!(
            classify_acquire(Ok((0, true))).unwrap(),
            AcquireOutcome::Ready { image_index: 0, suboptimal: true }
        );
        assert_eq!(classify_acquire(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap(), AcquireOutcome::OutOfDate);
        assert!(classify_acquire(Err(vk::Result::ERROR_SURFACE_LOST_KHR)).is_err());
    }

    #[test]
    fn test_classify_present() {
        assert_eq!(classify_present(Ok(false)).unwrap(), PresentOutcome::Presented);
        assert_eq!(classify_present(Ok(true)).unwrap(), PresentOutcome::Suboptimal);
        assert_eq!(classify_present(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap(), PresentOutcome::OutOfDate);
        assert!(classify_present(Err(vk::Result::ERROR_DEVICE_LOST)).is_err());
    }
}
