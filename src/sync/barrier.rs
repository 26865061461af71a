//! Rendezvous between per-camera capture threads and the render loop.
//!
//! Each slot carries two flags. `request_frame` starts signaled and tells the capture side it may
//! write the slot's image. `arrived_frame` starts cleared and tells the render side a fresh image
//! is in place. The capture side owns the image between observing `request_frame` and raising
//! `arrived_frame`; the render side owns it from observing `arrived_frame` until the
//! [`SyncLease`] is dropped, which re-arms every slot.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::capture::image::CameraImage;

#[derive(Debug)]
struct SlotFlags {
    request_frame: bool,
    arrived_frame: bool,
}

#[derive(Debug)]
struct SlotShared {
    flags: Mutex<SlotFlags>,
    changed: Condvar,
    image: Mutex<CameraImage>,
}

impl SlotShared {
    fn flags(&self) -> MutexGuard<'_, SlotFlags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn image(&self) -> MutexGuard<'_, CameraImage> {
        self.image.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Render-side view of all camera slots.
#[derive(Debug)]
pub struct CaptureBarrier {
    slots: Vec<Arc<SlotShared>>,
}

impl CaptureBarrier {
    /// Create `num_cameras` slots, each holding `initial` until the first capture lands.
    pub fn new(num_cameras: usize, initial: CameraImage) -> Self {
        let slots = (0..num_cameras)
            .map(|_| {
                Arc::new(SlotShared {
                    flags: Mutex::new(SlotFlags {
                        request_frame: true,
                        arrived_frame: false,
                    }),
                    changed: Condvar::new(),
                    image: Mutex::new(initial.clone()),
                })
            })
            .collect();
        Self { slots }
    }

    /// Number of camera slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Return `true` when there are no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Capture-side handle for one slot.
    pub fn handle(&self, slot: usize) -> Option<CaptureHandle> {
        self.slots.get(slot).map(|shared| CaptureHandle {
            slot,
            shared: Arc::clone(shared),
        })
    }

    /// Wait up to `timeout` per slot for every `arrived_frame`.
    ///
    /// Returns `None` on the first slot that misses its deadline; the caller skips this tick.
    /// Slots that did arrive keep their flag, so the next tick only waits on the laggards.
    pub fn wait_arrived(&self, timeout: Duration) -> Option<SyncLease<'_>> {
        for shared in &self.slots {
            let guard = shared.flags();
            let (guard, _) = shared
                .changed
                .wait_timeout_while(guard, timeout, |f| !f.arrived_frame)
                .unwrap_or_else(PoisonError::into_inner);
            if !guard.arrived_frame {
                return None;
            }
        }
        for shared in &self.slots {
            shared.flags().arrived_frame = false;
        }
        Some(SyncLease { barrier: self })
    }

    /// Lease without waiting: the render loop composites whatever images are current.
    pub fn lease_unsynced(&self) -> SyncLease<'_> {
        SyncLease { barrier: self }
    }

    fn rearm(&self) {
        for shared in &self.slots {
            let mut flags = shared.flags();
            flags.arrived_frame = false;
            flags.request_frame = true;
            shared.changed.notify_all();
        }
    }
}

/// Render-side ownership of the slot images for one composite pass.
///
/// Dropping the lease re-signals `request_frame` on every slot.
#[derive(Debug)]
pub struct SyncLease<'a> {
    barrier: &'a CaptureBarrier,
}

impl SyncLease<'_> {
    /// Current image of every slot, in slot order.
    pub fn images(&self) -> Vec<CameraImage> {
        self.barrier.slots.iter().map(|s| s.image().clone()).collect()
    }
}

impl Drop for SyncLease<'_> {
    fn drop(&mut self) {
        self.barrier.rearm();
    }
}

/// Capture-side end of one slot, moved into that camera's capture thread.
#[derive(Debug, Clone)]
pub struct CaptureHandle {
    slot: usize,
    shared: Arc<SlotShared>,
}

impl CaptureHandle {
    /// Slot index this handle writes to.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Wait up to `timeout` for `request_frame`. Returns `true` when the slot may be written.
    pub fn wait_request(&self, timeout: Duration) -> bool {
        let guard = self.shared.flags();
        let (guard, _) = self
            .shared
            .changed
            .wait_timeout_while(guard, timeout, |f| !f.request_frame)
            .unwrap_or_else(PoisonError::into_inner);
        guard.request_frame
    }

    /// Write `image` into the slot, clear `request_frame`, and raise `arrived_frame`.
    ///
    /// Returns `false` and discards the image when the render side has not requested a frame.
    pub fn deposit(&self, image: CameraImage) -> bool {
        if !self.shared.flags().request_frame {
            return false;
        }
        *self.shared.image() = image;
        let mut flags = self.shared.flags();
        flags.request_frame = false;
        flags.arrived_frame = true;
        self.shared.changed.notify_all();
        true
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sync/barrier.rs"]
mod tests;
