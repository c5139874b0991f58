//! Per-image fence bookkeeping
//!
//! With more swapchain images than frame slots, the image acquired by one slot
//! may still be the target of work submitted by another. [`ImagesInFlight`]
//! remembers which slot fence last claimed each image so the caller knows
//! which fence to wait on before reusing it.

use ash::vk;

/// Fence that last claimed each swapchain image, null when unclaimed
#[derive(Debug, Clone, Default)]
pub struct ImagesInFlight {
    fences: Vec<vk::Fence>,
}

impl ImagesInFlight {
    /// Tracking for `image_count` unclaimed images
    pub fn new(image_count: usize) -> Self {
        Self {
            fences: vec![vk::Fence::null(); image_count],
        }
    }

    /// Forget every claim and resize for a new swapchain generation
    pub fn reset(&mut self, image_count: usize) {
        self.fences.clear();
        self.fences.resize(image_count, vk::Fence::null());
    }

    /// Claim `image_index` for `fence`
    ///
    /// Returns the fence the caller must wait on first: the previous claimant's,
    /// unless the image was unclaimed or last claimed by `fence` itself. The
    /// caller's own fence has already been waited on and will be reset before
    /// submission, so waiting on it again would never return.
    pub fn claim(&mut self, image_index: u32, fence: vk::Fence) -> Option<vk::Fence> {
        let slot = self.fences.get_mut(image_index as usize)?;
        let previous = std::mem::replace(slot, fence);
        (previous != vk::Fence::null() && previous != fence).then_some(previous)
    }

    /// Number of tracked images
    pub fn len(&self) -> usize {
        self.fences.len()
    }

    /// Whether no images are tracked
    pub fn is_empty(&self) -> bool {
        self.fences.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn fence(raw: u64) -> vk::Fence {
        vk::Fence::from_raw(raw)
    }

    #[test]
    fn test_other_slot_fence_returned() {
        let mut images = ImagesInFlight::new(3);
        let (slot0, slot1) = (fence(1), fence(2));

        assert_eq!(images.claim(0, slot0), None);
        assert_eq!(images.claim(1, slot1), None);
        // Slot 1 comes round to the image slot 0 rendered into
        assert_eq!(images.claim(0, slot1), Some(slot0));
        // And the image now belongs to slot 1
        assert_eq!(images.claim(0, slot0), Some(slot1));
    }

    #[test]
    fn test_reclaim_by_same_slot_needs_no_wait() {
        let mut images = ImagesInFlight::new(2);
        let slot0 = fence(7);

        assert_eq!(images.claim(1, slot0), None);
        assert_eq!(images.claim(1, slot0), None);
    }

    #[test]
    fn test_reset_forgets_claims() {
        let mut images = ImagesInFlight::new(2);
        images.claim(0, fence(1));
        images.claim(1, fence(2));

        images.reset(4);
        assert_eq!(images.len(), 4);
        for image_index in 0..4 {
            assert_eq!(images.claim(image_index, fence(3)), None);
        }
    }

    #[test]
    fn test_reset_can_shrink() {
        let mut images = ImagesInFlight::new(4);
        images.claim(3, fence(1));

        images.reset(2);
        assert_eq!(images.len(), 2);
        assert_eq!(images.claim(3, fence(2)), None);
        assert_eq!(images.claim(1, fence(2)), None);
    }
}
