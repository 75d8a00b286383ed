//! Input abstraction layer.
//!
//! Normalizes host pointer events into a unified `InputEvent` enum consumed
//! by the drag state machine and the box/group components. Animation-frame
//! callbacks arrive through the same channel so the state machine stays a
//! pure function of its event stream.

use crate::frame::FrameId;

/// Keyboard modifiers held during a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };
}

/// Which mouse button changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

/// A normalized input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Button pressed over the component.
    PointerDown {
        x: f32,
        y: f32,
        button: PointerButton,
        modifiers: Modifiers,
    },

    /// Pointer moved. Delivered document-wide while a drag holds input capture.
    PointerMove { x: f32, y: f32, modifiers: Modifiers },

    /// Button released. Delivered document-wide while a drag holds input capture.
    PointerUp { x: f32, y: f32, modifiers: Modifiers },

    /// The host aborted the gesture (window blur, capture lost).
    PointerCancel,

    /// Pointer entered the component's bounds.
    PointerEnter,

    /// Pointer left the component's bounds.
    PointerLeave,

    /// A frame requested through a `FrameScheduler` is due.
    AnimationFrame { frame: FrameId, timestamp_ms: f64 },
}

impl InputEvent {
    pub fn pointer_down(x: f32, y: f32) -> Self {
        Self::PointerDown {
            x,
            y,
            button: PointerButton::Primary,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn pointer_move(x: f32, y: f32) -> Self {
        Self::PointerMove {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn pointer_up(x: f32, y: f32) -> Self {
        Self::PointerUp {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }
}
