//! Drag interaction state machine.
//!
//! Turns a raw pointer stream into either a click or a drag:
//!
//! ```text
//! idle ──down (primary, on target)──▶ pending ──move > threshold──▶ dragging
//!   ▲                                   │                              │
//!   └──────────── up: Clicked ──────────┘                              │
//!   └──────────────────────────── up: Ended (one commit) ──────────────┘
//! ```
//!
//! While dragging, the live delta is written to a [`VisualOverlay`] at most
//! once per animation frame; committed geometry is untouched until
//! `DragEvent::Ended`, which carries the final geometries exactly once per
//! session. The session owns its input capture and frame request, so
//! dropping it (pointer-up, cancel, or the controller itself) releases both.

use crate::capture::{CaptureGuard, InputCapture};
use crate::frame::{FrameScheduler, PendingFrame};
use crate::input::{InputEvent, Modifiers, PointerButton};
use crate::overlay::{Transition, VisualOverlay};
use diagram_core::{BoxGeometry, CursorIcon};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::rc::Rc;

/// Member geometries captured at pointer-down.
pub type Members = SmallVec<[BoxGeometry; 8]>;

/// Tunables for click/drag disambiguation and the release animation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    /// Movement (px, either axis) a press must exceed to become a drag.
    pub threshold: f32,
    /// Ease from the last painted position to the committed one.
    pub settle: Transition,
    /// Ignore presses with the middle/secondary button.
    pub primary_button_only: bool,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            threshold: 5.0,
            settle: Transition::default(),
            primary_button_only: true,
        }
    }
}

/// Externally visible phase of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    /// Pressed, not yet past the threshold.
    Pending,
    Dragging,
}

/// Outcomes reported to the owner of the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum DragEvent {
    /// First threshold crossing. Fires once per session.
    Started { members: Members },
    /// Live delta from the press origin, at most once per frame.
    Moved { dx: f32, dy: f32 },
    /// Release after a drag: the single commit point.
    Ended {
        geometries: Members,
        dx: f32,
        dy: f32,
    },
    /// Release without crossing the threshold.
    Clicked { x: f32, y: f32, modifiers: Modifiers },
    /// The session was torn down without a commit.
    Cancelled,
}

/// State of one press → release cycle.
#[derive(Debug)]
struct DragSession {
    start_x: f32,
    start_y: f32,
    has_moved: bool,
    pending_frame: Option<PendingFrame>,
    members: Members,
    /// Most recent pointer delta, waiting for the next frame.
    latest: (f32, f32),
    /// Delta currently painted in the overlay.
    painted: (f32, f32),
    last_reported: Option<(f32, f32)>,
    _capture: Option<CaptureGuard>,
}

/// Drives one draggable target (a group, or a lone box).
pub struct DragController {
    config: DragConfig,
    session: Option<DragSession>,
    hovering: bool,
    overlay: VisualOverlay,
    frames: Option<Rc<dyn FrameScheduler>>,
    capture: Option<Rc<dyn InputCapture>>,
}

impl Default for DragController {
    fn default() -> Self {
        Self::new(DragConfig::default())
    }
}

impl DragController {
    pub fn new(config: DragConfig) -> Self {
        Self {
            config,
            session: None,
            hovering: false,
            overlay: VisualOverlay::new(),
            frames: None,
            capture: None,
        }
    }

    /// Coalesce overlay writes to one per frame from `frames`. Without a
    /// scheduler every move is painted immediately.
    pub fn with_frame_scheduler(mut self, frames: Rc<dyn FrameScheduler>) -> Self {
        self.frames = Some(frames);
        self
    }

    /// Hold window-wide capture for each session.
    pub fn with_input_capture(mut self, capture: Rc<dyn InputCapture>) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn config(&self) -> &DragConfig {
        &self.config
    }

    pub fn phase(&self) -> DragPhase {
        match &self.session {
            None => DragPhase::Idle,
            Some(s) if s.has_moved => DragPhase::Dragging,
            Some(_) => DragPhase::Pending,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.phase() == DragPhase::Dragging
    }

    /// Hover, suppressed while dragging.
    pub fn is_hovering(&self) -> bool {
        self.hovering && !self.is_dragging()
    }

    pub fn cursor(&self) -> CursorIcon {
        match self.phase() {
            DragPhase::Idle if self.hovering => CursorIcon::Grab,
            DragPhase::Idle => CursorIcon::Default,
            DragPhase::Pending | DragPhase::Dragging => CursorIcon::Grabbing,
        }
    }

    pub fn overlay(&self) -> &VisualOverlay {
        &self.overlay
    }

    /// Advance release animations. Returns true while more frames are needed.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.overlay.tick(now_ms)
    }

    /// Feed one input event.
    ///
    /// `target` is the set of member geometries under the pointer for a
    /// `PointerDown`; `None` means the press missed this controller's target.
    /// It is ignored for every other event.
    pub fn handle(&mut self, event: &InputEvent, target: Option<&[BoxGeometry]>) -> Vec<DragEvent> {
        match event {
            InputEvent::PointerDown { x, y, button, .. } => {
                if let Some(members) = target {
                    self.press(*x, *y, *button, members);
                }
                vec![]
            }
            InputEvent::PointerMove { x, y, .. } => self.pointer_move(*x, *y),
            InputEvent::AnimationFrame {
                frame,
                timestamp_ms,
            } => {
                self.overlay.tick(*timestamp_ms);
                let due = self
                    .session
                    .as_ref()
                    .and_then(|s| s.pending_frame.as_ref())
                    .is_some_and(|p| p.id() == *frame);
                if due { self.flush_frame() } else { vec![] }
            }
            InputEvent::PointerUp { x, y, modifiers } => self.release(*x, *y, *modifiers),
            InputEvent::PointerCancel => self.cancel(),
            InputEvent::PointerEnter => {
                self.hovering = true;
                vec![]
            }
            InputEvent::PointerLeave => {
                self.hovering = false;
                vec![]
            }
        }
    }

    /// Tear down an active session without committing. Used on unmount.
    pub fn cancel(&mut self) -> Vec<DragEvent> {
        match self.session.take() {
            Some(session) => {
                log::debug!("drag cancelled ({} members)", session.members.len());
                self.overlay.clear(session.members.iter().map(|m| m.id));
                vec![DragEvent::Cancelled]
            }
            None => vec![],
        }
    }

    fn press(&mut self, x: f32, y: f32, button: PointerButton, members: &[BoxGeometry]) {
        if self.config.primary_button_only && button != PointerButton::Primary {
            return;
        }
        if self.session.is_some() {
            log::trace!("press ignored: session already active");
            return;
        }
        let capture = self
            .capture
            .as_ref()
            .map(|host| CaptureGuard::acquire(host, CursorIcon::Grabbing));
        self.session = Some(DragSession {
            start_x: x,
            start_y: y,
            has_moved: false,
            pending_frame: None,
            members: members.iter().copied().collect(),
            latest: (0.0, 0.0),
            painted: (0.0, 0.0),
            last_reported: None,
            _capture: capture,
        });
    }

    fn pointer_move(&mut self, x: f32, y: f32) -> Vec<DragEvent> {
        let threshold = self.config.threshold;
        let frames = self.frames.clone();
        let Some(session) = self.session.as_mut() else {
            return vec![];
        };
        let dx = x - session.start_x;
        let dy = y - session.start_y;

        let mut events = Vec::new();
        if !session.has_moved {
            if dx.abs() <= threshold && dy.abs() <= threshold {
                return events;
            }
            session.has_moved = true;
            log::debug!("drag started ({} members)", session.members.len());
            events.push(DragEvent::Started {
                members: session.members.clone(),
            });
        }

        session.latest = (dx, dy);
        match frames {
            Some(frames) => {
                // Replacing the request drops (and so cancels) the old one.
                session.pending_frame = Some(PendingFrame::request(&frames));
            }
            None => events.extend(self.flush_frame()),
        }
        events
    }

    /// Paint the latest delta and report it, if it differs from the last report.
    fn flush_frame(&mut self) -> Vec<DragEvent> {
        let Some(session) = self.session.as_mut() else {
            return vec![];
        };
        if let Some(frame) = session.pending_frame.take() {
            frame.fired();
        }
        let (dx, dy) = session.latest;
        session.painted = (dx, dy);
        self.overlay
            .set_offset(session.members.iter().map(|m| m.id), dx, dy);
        if session.last_reported == Some((dx, dy)) {
            return vec![];
        }
        session.last_reported = Some((dx, dy));
        log::trace!("drag frame dx={dx} dy={dy}");
        vec![DragEvent::Moved { dx, dy }]
    }

    fn release(&mut self, x: f32, y: f32, modifiers: Modifiers) -> Vec<DragEvent> {
        let Some(mut session) = self.session.take() else {
            return vec![];
        };
        let ids = session.members.iter().map(|m| m.id);

        if !session.has_moved {
            self.overlay.clear(ids);
            return vec![DragEvent::Clicked { x, y, modifiers }];
        }

        let dx = x - session.start_x;
        let dy = y - session.start_y;
        // A queued frame would paint a delta that is about to be committed.
        session.pending_frame = None;

        let mut events = Vec::with_capacity(2);
        if session.last_reported != Some((dx, dy)) {
            events.push(DragEvent::Moved { dx, dy });
        }

        let residual = (session.painted.0 - dx, session.painted.1 - dy);
        for id in ids {
            self.overlay.settle(id, residual, self.config.settle);
        }

        let geometries: Members = session
            .members
            .iter()
            .map(|m| m.translated(dx, dy))
            .collect();
        log::debug!(
            "drag ended: {} members moved by ({dx}, {dy})",
            geometries.len()
        );
        events.push(DragEvent::Ended { geometries, dx, dy });
        events
    }
}

impl std::fmt::Debug for DragController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragController")
            .field("config", &self.config)
            .field("phase", &self.phase())
            .field("hovering", &self.hovering)
            .field("session", &self.session)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::WindowCapture;
    use crate::frame::ManualFrames;
    use diagram_core::BoxId;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn members() -> Vec<BoxGeometry> {
        vec![
            BoxGeometry::new(BoxId::intern("drag_a"), 0.0, 0.0, 100.0, 50.0),
            BoxGeometry::new(BoxId::intern("drag_b"), 200.0, 100.0, 100.0, 50.0),
        ]
    }

    fn count(events: &[DragEvent], pred: impl Fn(&DragEvent) -> bool) -> usize {
        events.iter().filter(|e| pred(e)).count()
    }

    proptest! {
        #[test]
        fn press_release_in_place_is_click(x in -1.0e4f32..1.0e4, y in -1.0e4f32..1.0e4) {
            let mut drag = DragController::default();
            let m = members();
            let mut events = drag.handle(&InputEvent::pointer_down(x, y), Some(&m));
            prop_assert_eq!(drag.phase(), DragPhase::Pending);
            events.extend(drag.handle(&InputEvent::pointer_up(x, y), None));

            prop_assert_eq!(
                events,
                vec![DragEvent::Clicked {
                    x,
                    y,
                    modifiers: Modifiers::NONE
                }]
            );
            prop_assert_eq!(drag.phase(), DragPhase::Idle);
        }

        #[test]
        fn jitter_within_threshold_is_click(dx in -5.0f32..=5.0, dy in -5.0f32..=5.0) {
            let mut drag = DragController::default();
            let m = members();
            drag.handle(&InputEvent::pointer_down(50.0, 25.0), Some(&m));
            let mut events = drag.handle(&InputEvent::pointer_move(50.0 + dx, 25.0 + dy), None);
            events.extend(drag.handle(&InputEvent::pointer_up(50.0 + dx, 25.0 + dy), None));
            prop_assert_eq!(events.len(), 1);
            prop_assert!(matches!(events[0], DragEvent::Clicked { .. }), "{:?}", events);
        }

        #[test]
        fn drag_ends_once_at_origin_plus_delta(
            dx in prop_oneof![-400.0f32..-6.0, 6.0f32..400.0],
            dy in -400.0f32..400.0,
        ) {
            let mut drag = DragController::default();
            let m = members();
            let mut events = drag.handle(&InputEvent::pointer_down(50.0, 25.0), Some(&m));
            events.extend(drag.handle(&InputEvent::pointer_move(50.0 + dx / 2.0, 25.0 + dy / 2.0), None));
            events.extend(drag.handle(&InputEvent::pointer_move(50.0 + dx, 25.0 + dy), None));
            events.extend(drag.handle(&InputEvent::pointer_up(50.0 + dx, 25.0 + dy), None));

            prop_assert_eq!(count(&events, |e| matches!(e, DragEvent::Started { .. })), 1);
            let moved = count(&events, |e| matches!(e, DragEvent::Moved { .. }));
            prop_assert!(moved >= 1);
            let ended: Vec<_> = events
                .iter()
                .filter_map(|e| match e {
                    DragEvent::Ended { geometries, dx, dy } => Some((geometries.clone(), *dx, *dy)),
                    _ => None,
                })
                .collect();
            prop_assert_eq!(ended.len(), 1);
            let (geometries, total_x, total_y) = &ended[0];
            for (before, after) in m.iter().zip(geometries.iter()) {
                prop_assert_eq!(after.x, before.x + total_x);
                prop_assert_eq!(after.y, before.y + total_y);
                prop_assert_eq!(after.width, before.width);
            }
        }
    }

    #[test]
    fn small_jitter_stays_a_click() {
        let mut drag = DragController::default();
        let m = members();
        drag.handle(&InputEvent::pointer_down(10.0, 10.0), Some(&m));
        let mut events = drag.handle(&InputEvent::pointer_move(15.0, 5.0), None);
        events.extend(drag.handle(&InputEvent::pointer_up(14.0, 6.0), None));
        assert_eq!(count(&events, |e| matches!(e, DragEvent::Started { .. })), 0);
        assert_eq!(count(&events, |e| matches!(e, DragEvent::Clicked { .. })), 1);
    }

    #[test]
    fn drag_reports_start_progress_end_once() {
        let mut drag = DragController::default();
        let m = members();
        let mut events = drag.handle(&InputEvent::pointer_down(50.0, 25.0), Some(&m));
        events.extend(drag.handle(&InputEvent::pointer_move(56.0, 25.0), None));
        events.extend(drag.handle(&InputEvent::pointer_move(70.0, 40.0), None));
        assert!(drag.is_dragging());
        events.extend(drag.handle(&InputEvent::pointer_up(80.0, 45.0), None));

        assert_eq!(count(&events, |e| matches!(e, DragEvent::Started { .. })), 1);
        assert!(count(&events, |e| matches!(e, DragEvent::Moved { .. })) >= 1);
        let ends: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                DragEvent::Ended { geometries, dx, dy } => Some((geometries.clone(), *dx, *dy)),
                _ => None,
            })
            .collect();
        assert_eq!(ends.len(), 1);
        let (geometries, dx, dy) = &ends[0];
        assert_eq!((*dx, *dy), (30.0, 20.0));
        assert_eq!(geometries[0].x, 30.0);
        assert_eq!(geometries[0].y, 20.0);
        assert_eq!(geometries[1].x, 230.0);
        assert_eq!(geometries[1].y, 120.0);
        assert_eq!(drag.phase(), DragPhase::Idle);
    }

    #[test]
    fn threshold_crossing_on_negative_axis() {
        let mut drag = DragController::default();
        let m = members();
        drag.handle(&InputEvent::pointer_down(0.0, 0.0), Some(&m));
        let events = drag.handle(&InputEvent::pointer_move(0.0, -5.5), None);
        assert!(matches!(events[0], DragEvent::Started { .. }));
    }

    #[test]
    fn frames_coalesce_moves() {
        let frames = ManualFrames::new();
        let mut drag = DragController::default().with_frame_scheduler(frames.clone());
        let m = members();
        drag.handle(&InputEvent::pointer_down(0.0, 0.0), Some(&m));

        let mut moved = 0;
        for step in 1..=10 {
            let events = drag.handle(&InputEvent::pointer_move(step as f32 * 3.0, 0.0), None);
            moved += count(&events, |e| matches!(e, DragEvent::Moved { .. }));
        }
        assert_eq!(moved, 0, "nothing painted before the frame");
        assert_eq!(frames.outstanding(), 1, "only one frame in flight");
        assert_eq!(drag.overlay().offset(m[0].id), (0.0, 0.0));

        let due = frames.take_due();
        let events = drag.handle(
            &InputEvent::AnimationFrame {
                frame: due[0],
                timestamp_ms: 16.0,
            },
            None,
        );
        assert_eq!(events, vec![DragEvent::Moved { dx: 30.0, dy: 0.0 }]);
        assert_eq!(drag.overlay().offset(m[1].id), (30.0, 0.0));
    }

    #[test]
    fn stale_frame_is_ignored() {
        let frames = ManualFrames::new();
        let mut drag = DragController::default().with_frame_scheduler(frames.clone());
        let m = members();
        drag.handle(&InputEvent::pointer_down(0.0, 0.0), Some(&m));
        drag.handle(&InputEvent::pointer_move(10.0, 0.0), None);
        let first = frames.take_due()[0];
        drag.handle(&InputEvent::pointer_move(20.0, 0.0), None);
        let events = drag.handle(
            &InputEvent::AnimationFrame {
                frame: first,
                timestamp_ms: 16.0,
            },
            None,
        );
        assert!(events.is_empty());
    }

    #[test]
    fn release_flushes_unpainted_delta() {
        let frames = ManualFrames::new();
        let mut drag = DragController::default().with_frame_scheduler(frames.clone());
        let m = members();
        drag.handle(&InputEvent::pointer_down(0.0, 0.0), Some(&m));
        drag.handle(&InputEvent::pointer_move(40.0, 0.0), None);
        let events = drag.handle(&InputEvent::pointer_up(40.0, 0.0), None);

        assert_eq!(events[0], DragEvent::Moved { dx: 40.0, dy: 0.0 });
        assert!(matches!(events[1], DragEvent::Ended { .. }));
        assert_eq!(frames.outstanding(), 0, "queued frame cancelled on release");
        // Nothing was painted, so the members ease in from their old spot.
        assert_eq!(drag.overlay().offset(m[0].id), (-40.0, 0.0));
        assert!(drag.overlay().is_settling());
    }

    #[test]
    fn capture_held_only_during_session() {
        let window = WindowCapture::new();
        let mut drag = DragController::default().with_input_capture(window.clone());
        let m = members();
        drag.handle(&InputEvent::pointer_down(0.0, 0.0), Some(&m));
        assert!(window.is_listening());
        assert_eq!(window.cursor(), CursorIcon::Grabbing);
        drag.handle(&InputEvent::pointer_move(50.0, 0.0), None);
        drag.handle(&InputEvent::pointer_up(50.0, 0.0), None);
        assert!(!window.is_listening());
        assert_eq!(window.cursor(), CursorIcon::Default);
    }

    #[test]
    fn teardown_mid_drag_releases_everything() {
        let window = WindowCapture::new();
        let frames = ManualFrames::new();
        let m = members();
        {
            let mut drag = DragController::default()
                .with_input_capture(window.clone())
                .with_frame_scheduler(frames.clone());
            drag.handle(&InputEvent::pointer_down(0.0, 0.0), Some(&m));
            drag.handle(&InputEvent::pointer_move(50.0, 0.0), None);
            assert_eq!(frames.outstanding(), 1);
        }
        assert!(!window.is_listening());
        assert!(!window.selection_suppressed());
        assert_eq!(frames.outstanding(), 0);
    }

    #[test]
    fn cancel_reports_and_clears_overlay() {
        let mut drag = DragController::default();
        let m = members();
        drag.handle(&InputEvent::pointer_down(0.0, 0.0), Some(&m));
        drag.handle(&InputEvent::pointer_move(50.0, 0.0), None);
        assert_eq!(drag.overlay().offset(m[0].id), (50.0, 0.0));
        assert_eq!(drag.handle(&InputEvent::PointerCancel, None), vec![DragEvent::Cancelled]);
        assert!(drag.overlay().is_empty());
        assert!(drag.cancel().is_empty());
    }

    #[test]
    fn secondary_button_and_misses_are_ignored() {
        let mut drag = DragController::default();
        let m = members();
        drag.handle(
            &InputEvent::PointerDown {
                x: 0.0,
                y: 0.0,
                button: PointerButton::Secondary,
                modifiers: Modifiers::NONE,
            },
            Some(&m),
        );
        assert_eq!(drag.phase(), DragPhase::Idle);
        drag.handle(&InputEvent::pointer_down(0.0, 0.0), None);
        assert_eq!(drag.phase(), DragPhase::Idle);
        assert!(drag.handle(&InputEvent::pointer_up(0.0, 0.0), None).is_empty());
    }

    #[test]
    fn second_press_during_session_is_ignored() {
        let mut drag = DragController::default();
        let m = members();
        drag.handle(&InputEvent::pointer_down(0.0, 0.0), Some(&m));
        drag.handle(&InputEvent::pointer_down(500.0, 500.0), Some(&m[..1]));
        let events = drag.handle(&InputEvent::pointer_move(10.0, 0.0), None);
        match &events[0] {
            DragEvent::Started { members } => assert_eq!(members.len(), 2),
            other => panic!("expected Started, got {other:?}"),
        }
    }

    #[test]
    fn hover_suppressed_while_dragging() {
        let mut drag = DragController::default();
        let m = members();
        drag.handle(&InputEvent::PointerEnter, None);
        assert!(drag.is_hovering());
        assert_eq!(drag.cursor(), CursorIcon::Grab);
        drag.handle(&InputEvent::pointer_down(0.0, 0.0), Some(&m));
        drag.handle(&InputEvent::pointer_move(20.0, 0.0), None);
        assert!(!drag.is_hovering());
        drag.handle(&InputEvent::pointer_up(20.0, 0.0), None);
        assert!(drag.is_hovering());
    }
}
