/// Frame scheduler - fixed-depth ring of in-flight frames
///
/// The scheduler owns one slot per concurrent frame. Each slot carries
/// an image-available semaphore, one completion semaphore per pass of
/// the pass chain, and a CPU-waitable fence. The CPU blocks in exactly
/// two places per frame: on the fence of the slot about to be reused
/// (bounding CPU work to the ring depth ahead of the GPU) and inside
/// image acquisition. All shadow-pass-to-color-pass and
/// acquire-to-render ordering goes through semaphores; the CPU never
/// learns when a pass physically finishes on the device.

use std::sync::Arc;

use crate::engine_info;
use crate::error::{Error, Result};
use crate::render::{CommandList, Fence, GraphicsDevice, Semaphore, Swapchain};

/// Number of frames the CPU may prepare before blocking on GPU
/// completion of the oldest one (2 = double buffering)
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 2;

/// Per-slot progress through one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Slot is free for reuse
    Idle,
    /// Fence observed, swapchain image acquired, nothing submitted yet
    Acquiring,
    /// Passes up to and including this index are submitted
    PassSubmitted(usize),
    /// Presentation has been queued
    Presenting,
}

/// Synchronization objects for one in-flight frame
pub struct FrameSlot {
    /// Signaled by the presentation engine when the acquired image may
    /// be rendered into
    image_available: Arc<dyn Semaphore>,
    /// One completion semaphore per pass in the chain
    pass_complete: Vec<Arc<dyn Semaphore>>,
    /// Signaled when the frame's GPU work completes; observed before
    /// the slot's resources are reused
    fence: Arc<dyn Fence>,
    state: FrameState,
}

impl FrameSlot {
    /// Semaphore signaled by image acquisition for this slot
    pub fn image_available(&self) -> &Arc<dyn Semaphore> {
        &self.image_available
    }

    /// Completion semaphore of one pass
    pub fn pass_complete(&self, pass_index: usize) -> &Arc<dyn Semaphore> {
        &self.pass_complete[pass_index]
    }

    /// CPU-waitable completion fence
    pub fn fence(&self) -> &Arc<dyn Fence> {
        &self.fence
    }

    /// Current progress of the frame using this slot
    pub fn state(&self) -> FrameState {
        self.state
    }
}

/// Drives the per-frame wait/acquire/submit/present sequence over a
/// fixed ring of frame slots
pub struct FrameScheduler {
    device: Arc<dyn GraphicsDevice>,
    slots: Vec<FrameSlot>,
    pass_count: usize,
    current: usize,
}

impl FrameScheduler {
    /// Allocate the slot ring
    ///
    /// # Arguments
    ///
    /// * `device` - Device the sync objects are created on
    /// * `frames_in_flight` - Ring depth (must be at least 1)
    /// * `pass_count` - Number of passes submitted each frame
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        frames_in_flight: usize,
        pass_count: usize,
    ) -> Result<Self> {
        if frames_in_flight == 0 {
            return Err(Error::InvalidResource(
                "frames_in_flight must be at least 1".to_string(),
            ));
        }
        if pass_count == 0 {
            return Err(Error::InvalidResource(
                "pass_count must be at least 1".to_string(),
            ));
        }

        let mut slots = Vec::with_capacity(frames_in_flight);
        for _ in 0..frames_in_flight {
            let mut pass_complete = Vec::with_capacity(pass_count);
            for _ in 0..pass_count {
                pass_complete.push(device.create_semaphore()?);
            }
            slots.push(FrameSlot {
                image_available: device.create_semaphore()?,
                pass_complete,
                // Created signaled so the first use of each slot does
                // not wait for a frame that never ran
                fence: device.create_fence(true)?,
                state: FrameState::Idle,
            });
        }

        engine_info!(
            "umbra::FrameScheduler",
            "Frame ring ready: {} slots, {} passes per frame",
            frames_in_flight,
            pass_count
        );

        Ok(Self {
            device,
            slots,
            pass_count,
            current: 0,
        })
    }

    /// Ring depth
    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Number of passes submitted per frame
    pub fn pass_count(&self) -> usize {
        self.pass_count
    }

    /// Index of the slot the next frame will use
    pub fn current_slot(&self) -> usize {
        self.current
    }

    /// Slot accessor
    pub fn slot(&self, index: usize) -> &FrameSlot {
        &self.slots[index]
    }

    /// Start a frame: wait for the reused slot's fence, then acquire
    /// the next swapchain image
    ///
    /// The fence is reset only after a successful acquire, so an
    /// abandoned frame leaves it signaled and the slot's next use does
    /// not deadlock. Returns the acquired swapchain image index, which
    /// advances independently of the slot index.
    pub fn begin_frame(&mut self, swapchain: &mut dyn Swapchain) -> Result<u32> {
        let slot = &mut self.slots[self.current];
        debug_assert_eq!(slot.state, FrameState::Idle);

        self.device.wait_for_fence(&slot.fence)?;
        slot.state = FrameState::Acquiring;

        let image_index = match swapchain.acquire_next_image(&slot.image_available) {
            Ok(index) => index,
            Err(e) => {
                slot.state = FrameState::Idle;
                return Err(e);
            }
        };

        self.device.reset_fence(&slot.fence)?;
        Ok(image_index)
    }

    /// Submit one pass of the chain
    ///
    /// Pass 0 waits on the image-available semaphore and carries the
    /// slot fence; every later pass waits on the previous pass's
    /// completion semaphore and submits without a fence, so the chain
    /// runs on the device without a premature CPU wake. Passes must be
    /// submitted in order.
    pub fn submit_pass(&mut self, pass_index: usize, commands: &dyn CommandList) -> Result<()> {
        if pass_index >= self.pass_count {
            return Err(Error::InvalidResource(format!(
                "pass index {} out of range (pass count {})",
                pass_index, self.pass_count
            )));
        }

        let expected = if pass_index == 0 {
            FrameState::Acquiring
        } else {
            FrameState::PassSubmitted(pass_index - 1)
        };
        let slot = &mut self.slots[self.current];
        if slot.state != expected {
            return Err(Error::InvalidResource(format!(
                "pass {} submitted in state {:?}",
                pass_index, slot.state
            )));
        }

        let wait = if pass_index == 0 {
            slot.image_available.clone()
        } else {
            slot.pass_complete[pass_index - 1].clone()
        };
        let signal = slot.pass_complete[pass_index].clone();
        let fence = (pass_index == 0).then(|| slot.fence.clone());

        self.device.submit(
            &[commands],
            &[&wait],
            &[&signal],
            fence.as_ref(),
        )?;

        slot.state = FrameState::PassSubmitted(pass_index);
        Ok(())
    }

    /// Queue presentation of the acquired image, gated on the final
    /// pass's completion semaphore
    pub fn present(&mut self, swapchain: &mut dyn Swapchain, image_index: u32) -> Result<()> {
        let slot = &mut self.slots[self.current];
        if slot.state != FrameState::PassSubmitted(self.pass_count - 1) {
            return Err(Error::InvalidResource(format!(
                "present requested in state {:?}",
                slot.state
            )));
        }
        slot.state = FrameState::Presenting;
        swapchain.present(image_index, &slot.pass_complete[self.pass_count - 1])
    }

    /// Close out the frame and advance the ring
    ///
    /// Called once per frame whether the frame presented or was
    /// abandoned to a swapchain rebuild - the slot index advances
    /// unconditionally.
    pub fn end_frame(&mut self) {
        self.slots[self.current].state = FrameState::Idle;
        self.current = (self.current + 1) % self.slots.len();
    }
}

#[cfg(test)]
#[path = "frame_scheduler_tests.rs"]
mod tests;
