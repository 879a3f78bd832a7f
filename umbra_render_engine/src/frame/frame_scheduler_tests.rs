//! Unit tests for the frame ring and its state machine
//!
//! These run against the mock device, which records every fence wait,
//! submission and present so the exact ordering can be asserted.

use std::sync::Arc;

use crate::error::Error;
use crate::frame::{FrameScheduler, FrameState};
use crate::render::mock_device::{DeviceEvent, MockCommandList, MockDevice};
use crate::render::{Fence, GraphicsDevice, Semaphore};

fn harness(
    frames_in_flight: usize,
    pass_count: usize,
    image_count: usize,
) -> (
    Arc<crate::render::mock_device::MockState>,
    Box<dyn crate::render::Swapchain>,
    FrameScheduler,
) {
    let mock = MockDevice::new();
    let state = mock.state();
    let swapchain = mock.new_swapchain(image_count, 800, 600);
    let device: Arc<dyn GraphicsDevice> = Arc::new(mock);
    let scheduler = FrameScheduler::new(device, frames_in_flight, pass_count).unwrap();
    (state, swapchain, scheduler)
}

fn commands() -> MockCommandList {
    MockCommandList { commands: Vec::new() }
}

#[test]
fn test_ring_dimensions() {
    let (_, _, scheduler) = harness(2, 2, 2);
    assert_eq!(scheduler.frames_in_flight(), 2);
    assert_eq!(scheduler.pass_count(), 2);
    assert_eq!(scheduler.current_slot(), 0);
}

#[test]
fn test_zero_sizes_rejected() {
    let mock = MockDevice::new();
    let device: Arc<dyn GraphicsDevice> = Arc::new(mock);
    assert!(FrameScheduler::new(device.clone(), 0, 2).is_err());
    assert!(FrameScheduler::new(device, 2, 0).is_err());
}

#[test]
fn test_one_frame_event_sequence() {
    let (state, mut swapchain, mut scheduler) = harness(2, 2, 2);
    let cmd = commands();

    let image = scheduler.begin_frame(swapchain.as_mut()).unwrap();
    assert_eq!(image, 0);
    scheduler.submit_pass(0, &cmd).unwrap();
    scheduler.submit_pass(1, &cmd).unwrap();
    scheduler.present(swapchain.as_mut(), image).unwrap();
    scheduler.end_frame();

    let slot = scheduler.slot(0);
    let events = state.events();
    assert_eq!(
        events,
        vec![
            DeviceEvent::WaitFence { fence: slot.fence().id() },
            DeviceEvent::Acquire {
                image_index: 0,
                signal: slot.image_available().id(),
            },
            DeviceEvent::ResetFence { fence: slot.fence().id() },
            // First pass: waits on acquire, signals its completion,
            // carries the frame fence
            DeviceEvent::Submit {
                wait: vec![slot.image_available().id()],
                signal: vec![slot.pass_complete(0).id()],
                fence: Some(slot.fence().id()),
            },
            // Second pass: chained on the first, no fence
            DeviceEvent::Submit {
                wait: vec![slot.pass_complete(0).id()],
                signal: vec![slot.pass_complete(1).id()],
                fence: None,
            },
            DeviceEvent::Present {
                image_index: 0,
                wait: slot.pass_complete(1).id(),
            },
        ]
    );
}

#[test]
fn test_fence_observed_before_slot_reuse() {
    let (state, mut swapchain, mut scheduler) = harness(2, 2, 2);
    let cmd = commands();

    // Drive enough frames to cycle every slot twice
    for _ in 0..4 {
        let image = scheduler.begin_frame(swapchain.as_mut()).unwrap();
        scheduler.submit_pass(0, &cmd).unwrap();
        scheduler.submit_pass(1, &cmd).unwrap();
        scheduler.present(swapchain.as_mut(), image).unwrap();
        scheduler.end_frame();
    }

    // For every fence, each reuse waits on it before the next
    // submission that signals it
    let events = state.events();
    for slot_index in 0..2 {
        let fence = scheduler.slot(slot_index).fence().id();
        let mut expecting_wait = true;
        for event in &events {
            match event {
                DeviceEvent::WaitFence { fence: f } if *f == fence => {
                    assert!(expecting_wait, "fence {} waited twice without a submit", f);
                    expecting_wait = false;
                }
                DeviceEvent::Submit { fence: Some(f), .. } if *f == fence => {
                    expecting_wait = true;
                }
                _ => {}
            }
        }
    }
}

#[test]
fn test_slot_index_advances_mod_ring_depth() {
    let (_, mut swapchain, mut scheduler) = harness(2, 2, 3);
    let cmd = commands();

    let mut slots = Vec::new();
    for _ in 0..5 {
        slots.push(scheduler.current_slot());
        let image = scheduler.begin_frame(swapchain.as_mut()).unwrap();
        scheduler.submit_pass(0, &cmd).unwrap();
        scheduler.submit_pass(1, &cmd).unwrap();
        scheduler.present(swapchain.as_mut(), image).unwrap();
        scheduler.end_frame();
    }
    // Slot ring is mod K, independent of the 3-image swapchain
    assert_eq!(slots, vec![0, 1, 0, 1, 0]);
}

#[test]
fn test_passes_must_be_submitted_in_order() {
    let (_, mut swapchain, mut scheduler) = harness(2, 2, 2);
    let cmd = commands();

    scheduler.begin_frame(swapchain.as_mut()).unwrap();

    // Second pass before the first: rejected
    assert!(scheduler.submit_pass(1, &cmd).is_err());
    scheduler.submit_pass(0, &cmd).unwrap();
    // Same pass twice: rejected
    assert!(scheduler.submit_pass(0, &cmd).is_err());
    scheduler.submit_pass(1, &cmd).unwrap();
    // Out-of-range pass index: rejected
    assert!(scheduler.submit_pass(2, &cmd).is_err());
}

#[test]
fn test_present_requires_full_chain() {
    let (_, mut swapchain, mut scheduler) = harness(2, 2, 2);
    let cmd = commands();

    let image = scheduler.begin_frame(swapchain.as_mut()).unwrap();
    scheduler.submit_pass(0, &cmd).unwrap();
    assert!(scheduler.present(swapchain.as_mut(), image).is_err());
}

#[test]
fn test_state_machine_walks_the_frame() {
    let (_, mut swapchain, mut scheduler) = harness(1, 2, 2);
    let cmd = commands();

    assert_eq!(scheduler.slot(0).state(), FrameState::Idle);
    let image = scheduler.begin_frame(swapchain.as_mut()).unwrap();
    assert_eq!(scheduler.slot(0).state(), FrameState::Acquiring);
    scheduler.submit_pass(0, &cmd).unwrap();
    assert_eq!(scheduler.slot(0).state(), FrameState::PassSubmitted(0));
    scheduler.submit_pass(1, &cmd).unwrap();
    assert_eq!(scheduler.slot(0).state(), FrameState::PassSubmitted(1));
    scheduler.present(swapchain.as_mut(), image).unwrap();
    assert_eq!(scheduler.slot(0).state(), FrameState::Presenting);
    scheduler.end_frame();
    assert_eq!(scheduler.slot(0).state(), FrameState::Idle);
}

#[test]
fn test_failed_acquire_leaves_fence_signaled() {
    let (state, mut swapchain, mut scheduler) = harness(2, 2, 2);
    let cmd = commands();

    state
        .fail_next_acquire
        .store(true, std::sync::atomic::Ordering::SeqCst);
    assert_eq!(
        scheduler.begin_frame(swapchain.as_mut()).unwrap_err(),
        Error::SurfaceOutdated
    );
    assert_eq!(scheduler.slot(0).state(), FrameState::Idle);
    scheduler.end_frame();

    // The abandoned slot's fence was not reset, so its next reuse
    // must not dead-wait
    scheduler.end_frame(); // roll back around to slot 0
    let image = scheduler.begin_frame(swapchain.as_mut()).unwrap();
    scheduler.submit_pass(0, &cmd).unwrap();
    scheduler.submit_pass(1, &cmd).unwrap();
    scheduler.present(swapchain.as_mut(), image).unwrap();
    scheduler.end_frame();
}
