//! Identity-keyed geometry registry.
//!
//! Used as-is by the global diagram store and, scoped to one group, by the
//! group membership layer. Register is an upsert, unregister is idempotent,
//! and both report whether anything actually changed so callers can skip
//! downstream publishes. Observers run synchronously inside the mutating
//! call.

use crate::id::BoxId;
use crate::model::BoxGeometry;
use std::collections::HashMap;

/// What a registry mutation did.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    Registered(BoxGeometry),
    Updated {
        previous: BoxGeometry,
        current: BoxGeometry,
    },
    Unregistered(BoxGeometry),
}

impl RegistryEvent {
    pub fn box_id(&self) -> BoxId {
        match self {
            Self::Registered(g) | Self::Unregistered(g) => g.id,
            Self::Updated { current, .. } => current.id,
        }
    }

    /// True when the set of registered IDs changed (not just a geometry).
    pub fn changes_membership(&self) -> bool {
        !matches!(self, Self::Updated { .. })
    }
}

/// Handle returned by [`BoxRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&RegistryEvent)>;

/// Map of box ID → geometry, in first-registration order.
#[derive(Default)]
pub struct BoxRegistry {
    boxes: HashMap<BoxId, BoxGeometry>,
    order: Vec<BoxId>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl BoxRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert `geometry` under `id`.
    ///
    /// The stored record always carries `id`, even if `geometry.id` differs.
    /// Blank IDs are ignored. Re-registering an identical record is a no-op
    /// and returns `None`; observers are not called.
    pub fn register_box(&mut self, id: BoxId, geometry: BoxGeometry) -> Option<RegistryEvent> {
        if id.is_empty() {
            log::trace!("ignoring registration with blank box id");
            return None;
        }
        let geometry = BoxGeometry { id, ..geometry };

        let event = match self.boxes.insert(id, geometry) {
            Some(previous) if previous == geometry => {
                log::trace!("{id:?}: unchanged geometry, skipping");
                return None;
            }
            Some(previous) => RegistryEvent::Updated {
                previous,
                current: geometry,
            },
            None => {
                self.order.push(id);
                RegistryEvent::Registered(geometry)
            }
        };
        self.notify(&event);
        Some(event)
    }

    /// Remove `id`. Absent or blank IDs are a no-op returning `None`.
    pub fn unregister_box(&mut self, id: BoxId) -> Option<RegistryEvent> {
        let removed = self.boxes.remove(&id)?;
        self.order.retain(|other| *other != id);
        let event = RegistryEvent::Unregistered(removed);
        self.notify(&event);
        Some(event)
    }

    pub fn get(&self, id: BoxId) -> Option<&BoxGeometry> {
        self.boxes.get(&id)
    }

    pub fn contains(&self, id: BoxId) -> bool {
        self.boxes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Registered IDs in first-registration order.
    pub fn ids(&self) -> &[BoxId] {
        &self.order
    }

    /// Geometries in first-registration order.
    pub fn iter(&self) -> impl Iterator<Item = &BoxGeometry> + '_ {
        self.order.iter().filter_map(|id| self.boxes.get(id))
    }

    /// Live `id → geometry` view.
    pub fn as_map(&self) -> &HashMap<BoxId, BoxGeometry> {
        &self.boxes
    }

    /// Call `observer` synchronously after every effective mutation.
    pub fn subscribe(&mut self, observer: impl FnMut(&RegistryEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&mut self, subscription: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(id, _)| *id != subscription);
        self.observers.len() != before
    }

    fn notify(&mut self, event: &RegistryEvent) {
        for (_, observer) in &mut self.observers {
            observer(event);
        }
    }
}

impl std::fmt::Debug for BoxRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxRegistry")
            .field("boxes", &self.iter().collect::<Vec<_>>())
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn geo(name: &str, x: f32) -> BoxGeometry {
        BoxGeometry::new(BoxId::intern(name), x, 0.0, 10.0, 10.0)
    }

    #[test]
    fn register_is_upsert() {
        let mut reg = BoxRegistry::new();
        let a = BoxId::intern("reg_a");
        assert!(matches!(
            reg.register_box(a, geo("reg_a", 0.0)),
            Some(RegistryEvent::Registered(_))
        ));
        assert!(matches!(
            reg.register_box(a, geo("reg_a", 5.0)),
            Some(RegistryEvent::Updated { .. })
        ));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(a).unwrap().x, 5.0);
    }

    #[test]
    fn identical_registration_is_silent() {
        let mut reg = BoxRegistry::new();
        let a = BoxId::intern("reg_same");
        let calls = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&calls);
        reg.subscribe(move |_| *seen.borrow_mut() += 1);

        reg.register_box(a, geo("reg_same", 1.0));
        assert!(reg.register_box(a, geo("reg_same", 1.0)).is_none());
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut reg = BoxRegistry::new();
        let a = BoxId::intern("reg_gone");
        reg.register_box(a, geo("reg_gone", 0.0));
        assert!(reg.unregister_box(a).is_some());
        assert!(reg.unregister_box(a).is_none());
        assert!(reg.unregister_box(BoxId::intern("never")).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn blank_ids_are_ignored() {
        let mut reg = BoxRegistry::new();
        let blank = BoxId::intern("");
        assert!(reg.register_box(blank, geo("", 0.0)).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn stored_record_takes_registration_key() {
        let mut reg = BoxRegistry::new();
        let key = BoxId::intern("reg_key");
        reg.register_box(key, geo("other_name", 0.0));
        assert_eq!(reg.get(key).unwrap().id, key);
    }

    #[test]
    fn order_follows_first_registration() {
        let mut reg = BoxRegistry::new();
        for name in ["o1", "o2", "o3"] {
            reg.register_box(BoxId::intern(name), geo(name, 0.0));
        }
        reg.register_box(BoxId::intern("o1"), geo("o1", 9.0));
        reg.unregister_box(BoxId::intern("o2"));
        let names: Vec<_> = reg.ids().iter().map(|id| id.as_str()).collect();
        assert_eq!(names, ["o1", "o3"]);
    }

    #[test]
    fn observers_see_each_event_synchronously() {
        let mut reg = BoxRegistry::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let sub = reg.subscribe(move |e| sink.borrow_mut().push(e.changes_membership()));

        let a = BoxId::intern("obs_a");
        reg.register_box(a, geo("obs_a", 0.0));
        assert_eq!(*log.borrow(), [true]);
        reg.register_box(a, geo("obs_a", 3.0));
        reg.unregister_box(a);
        assert_eq!(*log.borrow(), [true, false, true]);

        assert!(reg.unsubscribe(sub));
        assert!(!reg.unsubscribe(sub));
        reg.register_box(a, geo("obs_a", 0.0));
        assert_eq!(log.borrow().len(), 3);
    }
}
