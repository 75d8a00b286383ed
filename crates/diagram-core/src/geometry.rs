//! Pure geometry for groups and boxes.
//!
//! Group backgrounds are derived from member geometry on demand: nothing
//! here holds state, and none of the results are fed back into a registry.

use crate::id::GroupId;
use crate::model::*;

/// Minimal rectangle enclosing every member, grown by `style.padding`.
///
/// Returns `None` (no background) when the group has no members, no
/// identity, or background display is turned off. An empty group has
/// nothing to bound.
pub fn group_bounding_box<'a, I>(
    group_id: Option<GroupId>,
    members: I,
    style: &GroupStyle,
    show_background: bool,
) -> Option<GroupBoundingBox>
where
    I: IntoIterator<Item = &'a BoxGeometry>,
{
    if !show_background || group_id.is_none_or(|id| id.is_empty()) {
        return None;
    }

    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    let mut any = false;
    for b in members {
        let r = b.rect();
        any = true;
        min_x = min_x.min(r.x);
        min_y = min_y.min(r.y);
        max_x = max_x.max(r.right());
        max_y = max_y.max(r.bottom());
    }
    if !any {
        return None;
    }

    let pad = style.padding;
    Some(GroupBoundingBox {
        x: min_x - pad,
        y: min_y - pad,
        width: (max_x - min_x) + 2.0 * pad,
        height: (max_y - min_y) + 2.0 * pad,
        style: style.clone(),
    })
}

/// Where a group label sits relative to its background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelAnchor {
    /// Inside the top-left corner of the background.
    Inside,
    /// Above the background.
    Outside,
}

/// Label offset relative to the bounding box's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPlacement {
    pub anchor: LabelAnchor,
    pub left: f32,
    pub top: f32,
}

/// Place a group label so it never gets clipped by the container's top edge.
///
/// A background whose top is within `height + min_top_offset` of
/// `container_top` gets the label inside its top-left corner; otherwise the
/// label floats above it.
pub fn label_placement(
    bbox: &GroupBoundingBox,
    container_top: f32,
    metrics: &LabelMetrics,
) -> LabelPlacement {
    let near_top = bbox.y - container_top < metrics.height + metrics.min_top_offset;
    if near_top {
        LabelPlacement {
            anchor: LabelAnchor::Inside,
            left: metrics.min_top_offset,
            top: metrics.min_top_offset,
        }
    } else {
        LabelPlacement {
            anchor: LabelAnchor::Outside,
            left: 0.0,
            top: -(metrics.height + metrics.gap),
        }
    }
}

/// The four cardinal anchors of a box.
pub fn connection_points(b: &BoxGeometry) -> ConnectionPoints {
    ConnectionPoints {
        top: Point::new(b.x + b.width / 2.0, b.y),
        right: Point::new(b.x + b.width, b.y + b.height / 2.0),
        bottom: Point::new(b.x + b.width / 2.0, b.y + b.height),
        left: Point::new(b.x, b.y + b.height / 2.0),
    }
}

/// Tagged anchors for hit targets, in `CardinalDirection::ALL` order.
pub fn tagged_connection_points(b: &BoxGeometry) -> [ConnectionPoint; 4] {
    let points = connection_points(b);
    CardinalDirection::ALL.map(|direction| ConnectionPoint {
        box_id: b.id,
        direction,
        point: points.get(direction),
    })
}

/// The anchor of `b` closest to `(px, py)`.
pub fn nearest_connection_point(b: &BoxGeometry, px: f32, py: f32) -> ConnectionPoint {
    let target = Point::new(px, py);
    let [first, rest @ ..] = tagged_connection_points(b);
    rest.into_iter().fold(first, |best, cp| {
        if cp.point.distance_to(target) < best.point.distance_to(target) {
            cp
        } else {
            best
        }
    })
}

// ─── Style-derived visual state ──────────────────────────────────────────

/// Paint-time appearance of a group background.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupVisual {
    pub fill: Color,
    pub border: Color,
    pub border_width: f32,
    pub border_radius: f32,
    pub label_color: Color,
    /// Raised look while the group is being dragged.
    pub elevated: bool,
}

/// Background and border fade to `dragging_opacity` while dragged; the
/// label keeps full strength.
pub fn group_visual(style: &GroupStyle, dragging: bool) -> GroupVisual {
    let alpha = if dragging { style.dragging_opacity } else { 1.0 };
    GroupVisual {
        fill: style.fill.with_alpha(alpha),
        border: style.border.with_alpha(alpha),
        border_width: style.border_width,
        border_radius: style.border_radius,
        label_color: style.label_color,
        elevated: dragging,
    }
}

/// Pointer cursor a component asks the host to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorIcon {
    #[default]
    Default,
    Grab,
    Grabbing,
}

/// Paint-time appearance of a single box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxVisual {
    pub highlighted: bool,
    pub show_connection_points: bool,
    pub cursor: CursorIcon,
}

/// Hover affordances are suppressed while the box or its group is dragging.
pub fn box_visual(hovering: bool, dragging: bool, group_dragging: bool) -> BoxVisual {
    let hover = hovering && !dragging && !group_dragging;
    BoxVisual {
        highlighted: hover,
        show_connection_points: hover,
        cursor: if dragging || group_dragging {
            CursorIcon::Grabbing
        } else if hovering {
            CursorIcon::Grab
        } else {
            CursorIcon::Default
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::BoxId;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn geo(name: &str, x: f32, y: f32, w: f32, h: f32) -> BoxGeometry {
        BoxGeometry::new(BoxId::intern(name), x, y, w, h)
    }

    fn bbox_at(y: f32) -> GroupBoundingBox {
        GroupBoundingBox {
            x: 0.0,
            y,
            width: 100.0,
            height: 100.0,
            style: GroupStyle::default(),
        }
    }

    #[test]
    fn bounding_box_two_members() {
        let members = [
            geo("a", 0.0, 0.0, 100.0, 50.0),
            geo("b", 200.0, 100.0, 100.0, 50.0),
        ];
        let bbox = group_bounding_box(
            Some(GroupId::intern("g")),
            &members,
            &GroupStyle::default(),
            true,
        )
        .unwrap();
        assert_eq!(bbox.rect(), Rect::new(-15.0, -15.0, 330.0, 180.0));
    }

    #[test]
    fn bounding_box_respects_padding() {
        let members = [geo("a", 10.0, 10.0, 20.0, 20.0)];
        let style = GroupStyle {
            padding: 0.0,
            ..GroupStyle::default()
        };
        let bbox = group_bounding_box(Some(GroupId::intern("g")), &members, &style, true).unwrap();
        assert_eq!(bbox.rect(), Rect::new(10.0, 10.0, 20.0, 20.0));
    }

    proptest! {
        #[test]
        fn bounding_box_none_when_empty(
            padding in 0.0f32..500.0,
            dragging_opacity in 0.0f32..=1.0,
            show in any::<bool>(),
        ) {
            let style = GroupStyle {
                padding,
                dragging_opacity,
                ..GroupStyle::default()
            };
            prop_assert!(group_bounding_box(Some(GroupId::intern("g")), &[], &style, show).is_none());
        }

        #[test]
        fn bounding_box_encloses_every_member(
            rects in proptest::collection::vec(
                (-1000.0f32..1000.0, -1000.0f32..1000.0, 1.0f32..300.0, 1.0f32..300.0),
                1..8,
            ),
            padding in 0.0f32..50.0,
        ) {
            let members: Vec<_> = rects
                .iter()
                .enumerate()
                .map(|(i, &(x, y, w, h))| geo(&format!("prop_{i}"), x, y, w, h))
                .collect();
            let style = GroupStyle { padding, ..GroupStyle::default() };
            let bbox = group_bounding_box(Some(GroupId::intern("g")), &members, &style, true).unwrap();
            let outer = bbox.rect();
            for m in &members {
                let r = m.rect();
                prop_assert!(r.x - outer.x >= padding - 1e-3);
                prop_assert!(r.y - outer.y >= padding - 1e-3);
                prop_assert!(outer.right() - r.right() >= padding - 1e-3);
                prop_assert!(outer.bottom() - r.bottom() >= padding - 1e-3);
            }
        }
    }

    #[test]
    fn bounding_box_none_without_identity_or_background() {
        let members = [geo("a", 0.0, 0.0, 10.0, 10.0)];
        let style = GroupStyle::default();
        assert!(group_bounding_box(None, &members, &style, true).is_none());
        assert!(group_bounding_box(Some(GroupId::intern("")), &members, &style, true).is_none());
        assert!(group_bounding_box(Some(GroupId::intern("g")), &members, &style, false).is_none());
    }

    #[test]
    fn label_inside_near_top() {
        let p = label_placement(&bbox_at(0.0), 0.0, &LabelMetrics::default());
        assert_eq!(p.anchor, LabelAnchor::Inside);
        assert_eq!(p.top, 8.0);
    }

    #[test]
    fn label_outside_when_room_above() {
        let p = label_placement(&bbox_at(100.0), 0.0, &LabelMetrics::default());
        assert_eq!(p.anchor, LabelAnchor::Outside);
        assert_eq!(p.top, -28.0);
    }

    #[test]
    fn label_threshold_is_height_plus_offset() {
        let m = LabelMetrics::default();
        assert_eq!(label_placement(&bbox_at(31.9), 0.0, &m).anchor, LabelAnchor::Inside);
        assert_eq!(label_placement(&bbox_at(32.0), 0.0, &m).anchor, LabelAnchor::Outside);
        // Measured from the container top, not the diagram origin.
        assert_eq!(label_placement(&bbox_at(120.0), 100.0, &m).anchor, LabelAnchor::Inside);
    }

    #[test]
    fn connection_points_fixed_formula() {
        let cp = connection_points(&geo("c", 10.0, 20.0, 100.0, 40.0));
        assert_eq!(cp.top, Point::new(60.0, 20.0));
        assert_eq!(cp.right, Point::new(110.0, 40.0));
        assert_eq!(cp.bottom, Point::new(60.0, 60.0));
        assert_eq!(cp.left, Point::new(10.0, 40.0));
    }

    #[test]
    fn nearest_connection_point_picks_closest_side() {
        let b = geo("n", 0.0, 0.0, 100.0, 100.0);
        assert_eq!(nearest_connection_point(&b, 95.0, 50.0).direction, CardinalDirection::Right);
        assert_eq!(nearest_connection_point(&b, 50.0, 2.0).direction, CardinalDirection::Top);
        assert_eq!(nearest_connection_point(&b, 1.0, 60.0).direction, CardinalDirection::Left);
    }

    #[test]
    fn hover_suppressed_while_dragging() {
        assert!(box_visual(true, false, false).highlighted);
        assert!(!box_visual(true, true, false).highlighted);
        assert!(!box_visual(true, false, true).show_connection_points);
        assert_eq!(box_visual(false, false, true).cursor, CursorIcon::Grabbing);
        assert_eq!(box_visual(true, false, false).cursor, CursorIcon::Grab);
    }

    #[test]
    fn group_visual_dims_while_dragging() {
        let style = GroupStyle::default();
        let idle = group_visual(&style, false);
        assert_eq!(idle.fill, style.fill);
        assert!(!idle.elevated);

        let v = group_visual(&style, true);
        assert_eq!(v.fill.a, style.fill.a * style.dragging_opacity);
        assert_eq!(v.border.a, style.border.a * style.dragging_opacity);
        assert_eq!(v.label_color, style.label_color);
        assert!(v.elevated);
    }
}
