//! Group membership registry.
//!
//! Each group keeps its own `BoxRegistry` of members and republishes to the
//! global store only when something it publishes actually changed:
//!
//! - label/style go out once, on first mount;
//! - `box_ids` go out whenever the live member list differs from the list
//!   last published.
//!
//! A publish makes the store notify its listeners, which can re-register
//! boxes, which lands back here. Dropping every no-op update is what keeps
//! that loop finite.

use diagram_core::{
    BoxGeometry, BoxId, BoxIds, BoxRegistry, DiagramStore, GroupBoundingBox, GroupId,
    GroupMetadata, GroupStyle, group_bounding_box,
};

#[derive(Debug)]
pub struct GroupRegistry {
    group_id: Option<GroupId>,
    label: String,
    style: GroupStyle,
    members: BoxRegistry,
    /// Set once metadata has reached a store.
    mounted: bool,
    published_box_ids: Option<BoxIds>,
    publishes: usize,
}

impl GroupRegistry {
    /// A group without a usable ID accepts no members and publishes nothing.
    pub fn new(group_id: Option<GroupId>, label: impl Into<String>, style: GroupStyle) -> Self {
        Self {
            group_id: group_id.filter(|id| !id.is_empty()),
            label: label.into(),
            style,
            members: BoxRegistry::new(),
            mounted: false,
            published_box_ids: None,
            publishes: 0,
        }
    }

    pub fn group_id(&self) -> Option<GroupId> {
        self.group_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn style(&self) -> &GroupStyle {
        &self.style
    }

    /// Update the local label. Carried by the next membership publish; does
    /// not republish on its own.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn set_style(&mut self, style: GroupStyle) {
        self.style = style;
    }

    /// Live members in join order.
    pub fn members(&self) -> impl Iterator<Item = &BoxGeometry> + '_ {
        self.members.iter()
    }

    pub fn member(&self, id: BoxId) -> Option<&BoxGeometry> {
        self.members.get(id)
    }

    pub fn box_ids(&self) -> BoxIds {
        self.members.ids().iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of `register_group` calls this group has made.
    pub fn publishes(&self) -> usize {
        self.publishes
    }

    /// Derived background; recomputed from current members on every call.
    pub fn bounding_box(&self, show_background: bool) -> Option<GroupBoundingBox> {
        group_bounding_box(
            self.group_id,
            self.members.iter(),
            &self.style,
            show_background,
        )
    }

    /// Publish label, style and current members. Only the first call with a
    /// store does anything.
    pub fn mount(&mut self, mut store: Option<&mut (dyn DiagramStore + '_)>) {
        if self.mounted {
            return;
        }
        let (Some(group_id), Some(store)) = (self.group_id, store.as_deref_mut()) else {
            return;
        };
        let box_ids = self.box_ids();
        store.register_group(group_id, self.metadata(box_ids.clone()));
        self.publishes += 1;
        self.published_box_ids = Some(box_ids);
        self.mounted = true;
    }

    /// Join or update a member. Returns false for no-ops.
    pub fn register_box(
        &mut self,
        geometry: BoxGeometry,
        store: Option<&mut (dyn DiagramStore + '_)>,
    ) -> bool {
        let Some(group_id) = self.group_id else {
            return false;
        };
        let Some(event) = self
            .members
            .register_box(geometry.id, geometry.in_group(group_id))
        else {
            return false;
        };
        if event.changes_membership() {
            log::debug!("{group_id:?}: {:?} joined", geometry.id);
            self.publish_membership(store);
        }
        true
    }

    /// Remove a member. Absent IDs are a no-op returning false.
    pub fn unregister_box(&mut self, id: BoxId, store: Option<&mut (dyn DiagramStore + '_)>) -> bool {
        if self.members.unregister_box(id).is_none() {
            return false;
        }
        log::debug!("{:?}: {id:?} left", self.group_id);
        self.publish_membership(store);
        true
    }

    /// Replace geometry of existing members in bulk (after a drag commit).
    /// Non-members are skipped. Returns how many records changed.
    pub fn update_boxes(
        &mut self,
        updated: &[BoxGeometry],
        store: Option<&mut (dyn DiagramStore + '_)>,
    ) -> usize {
        let Some(group_id) = self.group_id else {
            return 0;
        };
        let mut changed = 0;
        for geometry in updated {
            if !self.members.contains(geometry.id) {
                log::trace!("{group_id:?}: skipping non-member {:?}", geometry.id);
                continue;
            }
            if self
                .members
                .register_box(geometry.id, geometry.in_group(group_id))
                .is_some()
            {
                changed += 1;
            }
        }
        // Membership is unchanged by construction; this is a diffed no-op
        // unless an earlier publish was skipped for lack of a store.
        self.publish_membership(store);
        changed
    }

    fn metadata(&self, box_ids: BoxIds) -> GroupMetadata {
        GroupMetadata {
            label: self.label.clone(),
            style: self.style.clone(),
            box_ids,
        }
    }

    fn publish_membership(&mut self, mut store: Option<&mut (dyn DiagramStore + '_)>) {
        // Before mount the first-mount publish will carry the members.
        if !self.mounted {
            return;
        }
        let box_ids = self.box_ids();
        if self.published_box_ids.as_ref() == Some(&box_ids) {
            log::trace!("{:?}: members unchanged, not republishing", self.group_id);
            return;
        }
        let (Some(group_id), Some(store)) = (self.group_id, store.as_deref_mut()) else {
            return;
        };
        store.register_group(group_id, self.metadata(box_ids.clone()));
        self.publishes += 1;
        self.published_box_ids = Some(box_ids);
    }
}
