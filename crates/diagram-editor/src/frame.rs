//! Animation-frame scheduling.
//!
//! The host owns the real frame loop (`requestAnimationFrame`, a winit
//! redraw, a test clock). The drag state machine only asks for "one frame
//! from now" and may cancel that request. A `PendingFrame` cancels itself
//! when dropped unless it was marked as fired, so replacing or discarding a
//! request can never leave a stale callback behind.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Host-assigned handle for one frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

pub trait FrameScheduler {
    fn request_frame(&self) -> FrameId;

    /// Cancel a request that has not fired yet. Unknown IDs are ignored.
    fn cancel_frame(&self, id: FrameId);
}

/// An outstanding frame request, cancelled on drop.
pub struct PendingFrame {
    id: FrameId,
    scheduler: Rc<dyn FrameScheduler>,
    armed: bool,
}

impl PendingFrame {
    pub fn request(scheduler: &Rc<dyn FrameScheduler>) -> Self {
        Self {
            id: scheduler.request_frame(),
            scheduler: Rc::clone(scheduler),
            armed: true,
        }
    }

    pub fn id(&self) -> FrameId {
        self.id
    }

    /// The frame ran; there is nothing left to cancel.
    pub fn fired(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingFrame {
    fn drop(&mut self) {
        if self.armed {
            log::trace!("cancelling frame {:?}", self.id);
            self.scheduler.cancel_frame(self.id);
        }
    }
}

impl std::fmt::Debug for PendingFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingFrame")
            .field("id", &self.id)
            .field("armed", &self.armed)
            .finish()
    }
}

/// A scheduler driven by hand: requests queue up until `take_due` is called.
///
/// Useful for hosts that pump frames from their own loop, and for tests.
#[derive(Debug, Default)]
pub struct ManualFrames {
    next: Cell<u64>,
    queued: RefCell<Vec<FrameId>>,
    cancelled: Cell<usize>,
}

impl ManualFrames {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Drain all requests that are still outstanding.
    pub fn take_due(&self) -> Vec<FrameId> {
        std::mem::take(&mut *self.queued.borrow_mut())
    }

    pub fn outstanding(&self) -> usize {
        self.queued.borrow().len()
    }

    /// How many requests were cancelled before firing.
    pub fn cancelled(&self) -> usize {
        self.cancelled.get()
    }
}

impl FrameScheduler for ManualFrames {
    fn request_frame(&self) -> FrameId {
        let id = FrameId(self.next.get());
        self.next.set(id.0 + 1);
        self.queued.borrow_mut().push(id);
        id
    }

    fn cancel_frame(&self, id: FrameId) {
        let mut queued = self.queued.borrow_mut();
        let before = queued.len();
        queued.retain(|q| *q != id);
        if queued.len() != before {
            self.cancelled.set(self.cancelled.get() + 1);
        }
    }
}
