//! Process-wide input capture held for the length of a drag session.
//!
//! While a drag is in progress the host must route pointer move/up events
//! from anywhere in the window (the pointer can leave the group mid-drag),
//! suppress text selection, and show a grabbing cursor. All of that is
//! ambient state shared by the whole window, so it is modelled as a
//! resource: `CaptureGuard::acquire` installs it and dropping the guard
//! removes it, whether the session ended normally or the component was torn
//! down mid-drag.

use diagram_core::CursorIcon;
use std::cell::Cell;
use std::rc::Rc;

/// Host hooks for window-wide capture.
pub trait InputCapture {
    /// Attach window-level pointer listeners, disable text selection and
    /// set `cursor`.
    fn acquire(&self, cursor: CursorIcon);

    /// Undo everything `acquire` did.
    fn release(&self);
}

/// Holds the capture until dropped.
pub struct CaptureGuard {
    host: Rc<dyn InputCapture>,
}

impl CaptureGuard {
    pub fn acquire(host: &Rc<dyn InputCapture>, cursor: CursorIcon) -> Self {
        host.acquire(cursor);
        Self {
            host: Rc::clone(host),
        }
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.host.release();
    }
}

impl std::fmt::Debug for CaptureGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CaptureGuard")
    }
}

/// Reference-counted window capture state.
///
/// Two groups dragging at once (two pointers, or a second press that the
/// host delivered before the first release) each hold a guard; listeners,
/// selection suppression and the cursor stay in place until the last guard
/// is gone.
#[derive(Debug, Default)]
pub struct WindowCapture {
    holders: Cell<usize>,
    cursor: Cell<CursorIcon>,
    acquisitions: Cell<usize>,
}

impl WindowCapture {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Window-level move/up listeners are attached.
    pub fn is_listening(&self) -> bool {
        self.holders.get() > 0
    }

    pub fn selection_suppressed(&self) -> bool {
        self.holders.get() > 0
    }

    pub fn cursor(&self) -> CursorIcon {
        self.cursor.get()
    }

    pub fn holders(&self) -> usize {
        self.holders.get()
    }

    /// Total number of `acquire` calls over the lifetime of this window.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.get()
    }
}

impl InputCapture for WindowCapture {
    fn acquire(&self, cursor: CursorIcon) {
        self.holders.set(self.holders.get() + 1);
        self.acquisitions.set(self.acquisitions.get() + 1);
        self.cursor.set(cursor);
    }

    fn release(&self) {
        let holders = self.holders.get().saturating_sub(1);
        self.holders.set(holders);
        if holders == 0 {
            self.cursor.set(CursorIcon::Default);
        }
    }
}
