//! A single box: registration lifecycle, hover, clicks and connection points.
//!
//! A box registers into the global store and, when it sits in a group,
//! into that group's scope. Both collaborators are optional. Every
//! registration is diffed against what this box last registered, and
//! position changes coming from the store are adopted without writing them
//! back, so a box can never start an update loop on its own.

use crate::drag::{DragConfig, DragController, DragEvent};
use crate::group::GroupScope;
use crate::input::{InputEvent, Modifiers};
use diagram_core::{
    BoxGeometry, BoxId, BoxVisual, ConnectionPoint, DiagramStore, Point, Rect, box_visual,
    nearest_connection_point, tagged_connection_points,
};

/// Hit radius around a connection point, in px.
pub const CONNECTION_HIT_RADIUS: f32 = 8.0;

/// What a click on a box did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoxClick {
    /// Shift-click started a connection from this point.
    AutoConnectStarted(ConnectionPoint),
    /// Plain click; selection and the like are up to the host.
    Clicked { box_id: BoxId },
}

#[derive(Debug)]
pub struct DiagramBox {
    geometry: BoxGeometry,
    label: String,
    draggable: bool,
    /// Last record sent to registries; `None` until mounted.
    registered: Option<BoxGeometry>,
    drag: DragController,
}

impl DiagramBox {
    pub fn new(geometry: BoxGeometry, label: impl Into<String>) -> Self {
        Self {
            geometry,
            label: label.into(),
            draggable: true,
            registered: None,
            drag: DragController::new(DragConfig::default()),
        }
    }

    /// Drag behaviour when this box is not inside a group.
    pub fn with_drag(mut self, drag: DragController) -> Self {
        self.drag = drag;
        self
    }

    pub fn set_draggable(&mut self, draggable: bool) {
        self.draggable = draggable;
    }

    pub fn id(&self) -> BoxId {
        self.geometry.id
    }

    pub fn geometry(&self) -> &BoxGeometry {
        &self.geometry
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_mounted(&self) -> bool {
        self.registered.is_some()
    }

    /// Join the store and the enclosing group.
    pub fn mount(
        &mut self,
        store: Option<&mut (dyn DiagramStore + '_)>,
        group: Option<&mut (dyn GroupScope + '_)>,
    ) {
        self.geometry.group_id = group.as_ref().and_then(|g| g.group_id());
        self.publish(store, group);
    }

    /// Apply new position/size props. Returns false when nothing changed.
    pub fn set_rect(
        &mut self,
        rect: Rect,
        store: Option<&mut (dyn DiagramStore + '_)>,
        group: Option<&mut (dyn GroupScope + '_)>,
    ) -> bool {
        let next = BoxGeometry {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            ..self.geometry
        };
        if next == self.geometry {
            return false;
        }
        self.geometry = next;
        if self.is_mounted() {
            self.publish(store, group);
        }
        true
    }

    /// Leave the store and the group, cancelling any drag in flight.
    pub fn unmount(
        &mut self,
        mut store: Option<&mut (dyn DiagramStore + '_)>,
        group: Option<&mut (dyn GroupScope + '_)>,
    ) {
        self.drag.cancel();
        if self.registered.take().is_none() {
            return;
        }
        let id = self.geometry.id;
        if let Some(group) = group {
            group.unregister_box(id, store.as_deref_mut());
        }
        if let Some(store) = store {
            store.unregister_box(id);
        }
    }

    /// Adopt a position the store holds for this box (undo, programmatic
    /// moves, a group drag commit). Nothing is written back to the store;
    /// the group is told so its bounds follow.
    pub fn reconcile(
        &mut self,
        store: &dyn DiagramStore,
        group: Option<&mut (dyn GroupScope + '_)>,
    ) -> bool {
        let Some(stored) = store.boxes().get(&self.geometry.id) else {
            return false;
        };
        if stored.same_rect(&self.geometry) {
            return false;
        }
        log::debug!("{:?}: adopting store geometry", self.geometry.id);
        self.geometry = BoxGeometry {
            x: stored.x,
            y: stored.y,
            width: stored.width,
            height: stored.height,
            ..self.geometry
        };
        if self.registered.is_some() {
            self.registered = Some(self.geometry);
            if let Some(group) = group {
                group.register_box(self.geometry, None);
            }
        }
        true
    }

    /// Feed input aimed at this box.
    ///
    /// Inside a group the group owns dragging, so only hover and clicks are
    /// handled here. A lone box drags itself and commits on release.
    pub fn handle_input(
        &mut self,
        event: &InputEvent,
        mut store: Option<&mut (dyn DiagramStore + '_)>,
        mut group: Option<&mut (dyn GroupScope + '_)>,
    ) -> Option<BoxClick> {
        let in_group = group.as_ref().is_some_and(|g| g.group_id().is_some());
        // Inside a group (or when not draggable) the box still runs a
        // member-less session so it can tell its own clicks from drags.
        let target: Option<Vec<BoxGeometry>> = match event {
            InputEvent::PointerDown { x, y, .. } if self.geometry.rect().contains(*x, *y) => {
                if in_group || !self.draggable {
                    Some(Vec::new())
                } else {
                    Some(vec![self.geometry])
                }
            }
            _ => None,
        };
        let events = self.drag.handle(event, target.as_deref());

        let mut click = None;
        for event in events {
            match event {
                DragEvent::Ended { geometries, .. } => {
                    if let Some(moved) = geometries.first() {
                        self.geometry = BoxGeometry {
                            x: moved.x,
                            y: moved.y,
                            ..self.geometry
                        };
                        self.publish(store.as_deref_mut(), group.as_deref_mut());
                    }
                }
                DragEvent::Clicked { x, y, modifiers } => {
                    click = Some(self.click(x, y, modifiers, store.as_deref_mut()));
                }
                _ => {}
            }
        }
        click
    }

    /// Click handler. Shift-click starts auto-connect from the nearest
    /// connection point, unless a connection is already being made from
    /// this box.
    pub fn click(
        &self,
        x: f32,
        y: f32,
        modifiers: Modifiers,
        store: Option<&mut (dyn DiagramStore + '_)>,
    ) -> BoxClick {
        let id = self.geometry.id;
        if modifiers.shift
            && let Some(store) = store
            && !(store.is_auto_connect_mode() && store.auto_connect_start_box() == Some(id))
        {
            let point = nearest_connection_point(&self.geometry, x, y);
            store.start_auto_connect(id, point.point);
            return BoxClick::AutoConnectStarted(point);
        }
        BoxClick::Clicked { box_id: id }
    }

    /// Hit targets for external connection tools, tagged `"{box}-{direction}"`.
    pub fn connection_points(&self) -> [ConnectionPoint; 4] {
        tagged_connection_points(&self.geometry)
    }

    /// The connection point within `CONNECTION_HIT_RADIUS` of `(x, y)`.
    pub fn hit_connection_point(&self, x: f32, y: f32) -> Option<ConnectionPoint> {
        let cp = nearest_connection_point(&self.geometry, x, y);
        (cp.point.distance_to(Point::new(x, y)) <= CONNECTION_HIT_RADIUS).then_some(cp)
    }

    pub fn is_hovering(&self) -> bool {
        self.drag.is_hovering()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Paint-time state; `group_dragging` comes from the enclosing context.
    pub fn visual(&self, group_dragging: bool) -> BoxVisual {
        box_visual(self.drag.is_hovering(), self.drag.is_dragging(), group_dragging)
    }

    /// Where to paint this box when it drags on its own.
    pub fn painted_rect(&self) -> Rect {
        self.drag.overlay().painted_rect(&self.geometry)
    }

    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.drag.tick(now_ms)
    }

    fn publish(
        &mut self,
        mut store: Option<&mut (dyn DiagramStore + '_)>,
        group: Option<&mut (dyn GroupScope + '_)>,
    ) {
        let id = self.geometry.id;
        if id.is_empty() {
            log::trace!("box without id, not registering");
            return;
        }
        if self.registered == Some(self.geometry) {
            return;
        }
        self.registered = Some(self.geometry);
        if let Some(store) = store.as_deref_mut() {
            store.register_box(id, self.geometry);
        }
        if let Some(group) = group {
            group.register_box(self.geometry, store);
        }
    }
}
