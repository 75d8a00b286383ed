pub mod boxes;
pub mod capture;
pub mod drag;
pub mod frame;
pub mod group;
pub mod input;
pub mod membership;
pub mod overlay;

pub use boxes::{BoxClick, DiagramBox};
pub use capture::{CaptureGuard, InputCapture, WindowCapture};
pub use drag::{DragConfig, DragController, DragEvent, DragPhase};
pub use frame::{FrameId, FrameScheduler, ManualFrames, PendingFrame};
pub use group::{DiagramGroup, GroupChrome, GroupContext, GroupProps, GroupScope, GroupView};
pub use input::{InputEvent, Modifiers, PointerButton};
pub use membership::GroupRegistry;
pub use overlay::{Easing, Transition, VisualOverlay};
