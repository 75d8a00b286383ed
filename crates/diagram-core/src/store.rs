//! The global diagram store as seen from boxes and groups.
//!
//! Box/connection CRUD, undo/redo and the auto-connect workflow live in
//! the host application. Components only need the narrow `DiagramStore`
//! surface below, and they take it as `Option<&mut dyn DiagramStore>`:
//! with `None` every store call is skipped and the component still works.
//!
//! `MemoryStore` is a plain in-memory implementation for hosts that don't
//! have their own, and for tests.

use crate::id::{BoxId, GroupId};
use crate::model::*;
use crate::registry::{BoxRegistry, RegistryEvent};
use std::collections::HashMap;

/// Capabilities a box or group consumes from the global store.
pub trait DiagramStore {
    fn register_box(&mut self, id: BoxId, geometry: BoxGeometry);

    fn unregister_box(&mut self, id: BoxId);

    /// Live view of every registered box, used to pull externally driven
    /// position changes back into a component.
    fn boxes(&self) -> &HashMap<BoxId, BoxGeometry>;

    fn register_group(&mut self, group_id: GroupId, metadata: GroupMetadata);

    /// Begin a connection from `box_id` at `point`. Optional.
    fn start_auto_connect(&mut self, _box_id: BoxId, _point: Point) {}

    fn is_auto_connect_mode(&self) -> bool {
        false
    }

    fn auto_connect_start_box(&self) -> Option<BoxId> {
        None
    }
}

/// Write counters, for hosts that want to verify diffing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub box_writes: usize,
    pub box_removals: usize,
    pub group_publishes: usize,
}

/// In-memory `DiagramStore`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    registry: BoxRegistry,
    groups: HashMap<GroupId, GroupMembership>,
    auto_connect: Option<(BoxId, Point)>,
    stats: StoreStats,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &BoxRegistry {
        &self.registry
    }

    /// Subscribe to box registry changes (see [`BoxRegistry::subscribe`]).
    pub fn registry_mut(&mut self) -> &mut BoxRegistry {
        &mut self.registry
    }

    pub fn group(&self, id: GroupId) -> Option<&GroupMembership> {
        self.groups.get(&id)
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupMembership> + '_ {
        self.groups.values()
    }

    pub fn stats(&self) -> StoreStats {
        self.stats
    }

    /// Move a box from outside the component tree (e.g. undo, an API call).
    /// Components pick it up on their next reconcile.
    pub fn move_box(&mut self, id: BoxId, x: f32, y: f32) -> bool {
        let Some(current) = self.registry.get(id).copied() else {
            return false;
        };
        self.registry
            .register_box(id, BoxGeometry { x, y, ..current })
            .is_some()
    }

    /// The pending auto-connect origin, if any.
    pub fn auto_connect_origin(&self) -> Option<(BoxId, Point)> {
        self.auto_connect
    }

    pub fn cancel_auto_connect(&mut self) {
        self.auto_connect = None;
    }
}

impl DiagramStore for MemoryStore {
    fn register_box(&mut self, id: BoxId, geometry: BoxGeometry) {
        if self.registry.register_box(id, geometry).is_some() {
            self.stats.box_writes += 1;
        }
    }

    fn unregister_box(&mut self, id: BoxId) {
        if let Some(RegistryEvent::Unregistered(_)) = self.registry.unregister_box(id) {
            self.stats.box_removals += 1;
            for group in self.groups.values_mut() {
                group.box_ids.retain(|member| *member != id);
            }
            if self.auto_connect.is_some_and(|(start, _)| start == id) {
                self.auto_connect = None;
            }
        }
    }

    fn boxes(&self) -> &HashMap<BoxId, BoxGeometry> {
        self.registry.as_map()
    }

    fn register_group(&mut self, group_id: GroupId, metadata: GroupMetadata) {
        if group_id.is_empty() {
            return;
        }
        log::debug!(
            "{group_id:?}: publish label={:?} members={}",
            metadata.label,
            metadata.box_ids.len()
        );
        self.stats.group_publishes += 1;
        self.groups
            .insert(group_id, GroupMembership::from_metadata(group_id, metadata));
    }

    fn start_auto_connect(&mut self, box_id: BoxId, point: Point) {
        if box_id.is_empty() {
            return;
        }
        self.auto_connect = Some((box_id, point));
    }

    fn is_auto_connect_mode(&self) -> bool {
        self.auto_connect.is_some()
    }

    fn auto_connect_start_box(&self) -> Option<BoxId> {
        self.auto_connect.map(|(id, _)| id)
    }
}
