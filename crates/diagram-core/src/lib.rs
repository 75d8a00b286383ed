pub mod geometry;
pub mod id;
pub mod model;
pub mod registry;
pub mod store;

pub use geometry::{
    BoxVisual, CursorIcon, GroupVisual, LabelAnchor, LabelPlacement, box_visual,
    connection_points, group_bounding_box, group_visual, label_placement,
    nearest_connection_point, tagged_connection_points,
};
pub use id::{BoxId, GroupId};
pub use model::*;
pub use registry::{BoxRegistry, RegistryEvent, SubscriptionId};
pub use store::{DiagramStore, MemoryStore, StoreStats};
