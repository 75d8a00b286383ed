//! Group composition: membership + drag + derived chrome in one unit.
//!
//! A `DiagramGroup` is what child boxes join. It hands them a
//! [`GroupContext`] snapshot and implements [`GroupScope`] so a box can
//! register itself without knowing anything else about the group. Pointer
//! input on the group drives its `DragController`; the one `Ended` event
//! per drag is committed to the group registry and the global store here.

use crate::capture::InputCapture;
use crate::drag::{DragConfig, DragController, DragEvent};
use crate::frame::FrameScheduler;
use crate::input::InputEvent;
use crate::membership::GroupRegistry;
use diagram_core::{
    BoxGeometry, BoxId, CursorIcon, DiagramStore, GroupBoundingBox, GroupId, GroupStyle,
    GroupVisual, LabelMetrics, LabelPlacement, Rect, group_bounding_box, group_visual,
    label_placement,
};
use std::rc::Rc;

/// What a child box can do with the group it sits in.
pub trait GroupScope {
    fn group_id(&self) -> Option<GroupId>;

    fn register_box(&mut self, geometry: BoxGeometry, store: Option<&mut (dyn DiagramStore + '_)>);

    fn unregister_box(&mut self, id: BoxId, store: Option<&mut (dyn DiagramStore + '_)>);

    fn is_dragging(&self) -> bool;
}

/// Read-only view of a group handed to its children.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupContext {
    pub group_id: Option<GroupId>,
    pub group_label: String,
    pub group_style: GroupStyle,
    pub show_group_background: bool,
    pub is_dragging: bool,
}

/// Construction-time properties of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupProps {
    pub id: Option<GroupId>,
    pub label: String,
    pub style: GroupStyle,
    pub show_background: bool,
}

impl GroupProps {
    pub fn new(id: GroupId, label: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            label: label.into(),
            style: GroupStyle::default(),
            show_background: true,
        }
    }
}

/// Background and label to paint behind the members.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupChrome {
    /// Background rectangle, including the live drag offset.
    pub rect: Rect,
    pub visual: GroupVisual,
    pub label: String,
    /// Relative to `rect`'s top-left corner.
    pub label_placement: LabelPlacement,
}

/// A member as it should be painted this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintedBox {
    pub id: BoxId,
    pub rect: Rect,
}

/// Everything a renderer needs for one group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupView {
    pub chrome: Option<GroupChrome>,
    pub members: Vec<PaintedBox>,
    pub cursor: CursorIcon,
    pub is_dragging: bool,
}

pub struct DiagramGroup {
    registry: GroupRegistry,
    show_background: bool,
    drag: DragController,
    label_metrics: LabelMetrics,
    /// Top edge of the scrolling container, for label placement.
    container_top: f32,
}

impl DiagramGroup {
    pub fn new(props: GroupProps, config: DragConfig) -> Self {
        Self {
            registry: GroupRegistry::new(props.id, props.label, props.style),
            show_background: props.show_background,
            drag: DragController::new(config),
            label_metrics: LabelMetrics::default(),
            container_top: 0.0,
        }
    }

    pub fn with_frame_scheduler(mut self, frames: Rc<dyn FrameScheduler>) -> Self {
        self.drag = self.drag.with_frame_scheduler(frames);
        self
    }

    pub fn with_input_capture(mut self, capture: Rc<dyn InputCapture>) -> Self {
        self.drag = self.drag.with_input_capture(capture);
        self
    }

    pub fn with_label_metrics(mut self, metrics: LabelMetrics) -> Self {
        self.label_metrics = metrics;
        self
    }

    pub fn set_container_top(&mut self, top: f32) {
        self.container_top = top;
    }

    pub fn registry(&self) -> &GroupRegistry {
        &self.registry
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    /// First-mount publish of label/style/members.
    pub fn mount(&mut self, store: Option<&mut (dyn DiagramStore + '_)>) {
        self.registry.mount(store);
    }

    /// Tear down. An in-flight drag is cancelled and releases its capture.
    pub fn unmount(&mut self) {
        self.drag.cancel();
    }

    pub fn context(&self) -> GroupContext {
        GroupContext {
            group_id: self.registry.group_id(),
            group_label: self.registry.label().to_owned(),
            group_style: self.registry.style().clone(),
            show_group_background: self.show_background,
            is_dragging: self.drag.is_dragging(),
        }
    }

    pub fn bounding_box(&self) -> Option<GroupBoundingBox> {
        self.registry.bounding_box(self.show_background)
    }

    /// True if `(x, y)` lands on the background or on any member.
    pub fn hit_test(&self, x: f32, y: f32) -> bool {
        self.bounding_box().is_some_and(|b| b.rect().contains(x, y))
            || self.registry.members().any(|m| m.rect().contains(x, y))
    }

    /// Feed input. A press that lands on the group starts a session for all
    /// current members; a completed drag is committed before returning.
    pub fn handle_input(
        &mut self,
        event: &InputEvent,
        mut store: Option<&mut (dyn DiagramStore + '_)>,
    ) -> Vec<DragEvent> {
        let target: Option<Vec<BoxGeometry>> = match event {
            InputEvent::PointerDown { x, y, .. } if self.hit_test(*x, *y) => {
                Some(self.registry.members().copied().collect())
            }
            _ => None,
        };
        let events = self.drag.handle(event, target.as_deref());
        for event in &events {
            if let DragEvent::Ended { geometries, .. } = event {
                self.commit(geometries, store.as_deref_mut());
            }
        }
        events
    }

    /// Advance release animations.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.drag.tick(now_ms)
    }

    /// Paint-time snapshot. The background is bounded over the members'
    /// painted positions, so it follows them through the drag and through
    /// the settle after release.
    pub fn view(&self) -> GroupView {
        let is_dragging = self.drag.is_dragging();
        let overlay = self.drag.overlay();
        let painted: Vec<BoxGeometry> = self
            .registry
            .members()
            .map(|m| {
                let (dx, dy) = overlay.offset(m.id);
                m.translated(dx, dy)
            })
            .collect();
        let members = painted
            .iter()
            .map(|m| PaintedBox {
                id: m.id,
                rect: m.rect(),
            })
            .collect();

        let label = self.registry.label();
        let chrome = group_bounding_box(
            self.registry.group_id(),
            &painted,
            self.registry.style(),
            self.show_background,
        )
        .filter(|_| !label.is_empty())
        .map(|bbox| GroupChrome {
            rect: bbox.rect(),
            visual: group_visual(&bbox.style, is_dragging),
            label: label.to_owned(),
            label_placement: label_placement(&bbox, self.container_top, &self.label_metrics),
        });

        GroupView {
            chrome,
            members,
            cursor: self.drag.cursor(),
            is_dragging,
        }
    }

    fn commit(&mut self, geometries: &[BoxGeometry], mut store: Option<&mut (dyn DiagramStore + '_)>) {
        let changed = self.registry.update_boxes(geometries, store.as_deref_mut());
        if let Some(store) = store {
            for geometry in geometries {
                if let Some(group_id) = self.registry.group_id() {
                    store.register_box(geometry.id, geometry.in_group(group_id));
                }
            }
        }
        log::debug!(
            "{:?}: committed drag, {changed} of {} members changed",
            self.registry.group_id(),
            geometries.len()
        );
    }
}

impl GroupScope for DiagramGroup {
    fn group_id(&self) -> Option<GroupId> {
        self.registry.group_id()
    }

    fn register_box(&mut self, geometry: BoxGeometry, store: Option<&mut (dyn DiagramStore + '_)>) {
        self.registry.register_box(geometry, store);
    }

    fn unregister_box(&mut self, id: BoxId, store: Option<&mut (dyn DiagramStore + '_)>) {
        self.registry.unregister_box(id, store);
    }

    fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }
}

impl std::fmt::Debug for DiagramGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagramGroup")
            .field("registry", &self.registry)
            .field("show_background", &self.show_background)
            .field("drag", &self.drag)
            .finish_non_exhaustive()
    }
}
