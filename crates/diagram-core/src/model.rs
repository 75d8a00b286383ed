//! Data model shared by the group layer and the global diagram store.
//!
//! `BoxGeometry` is the one record both sides read and write
//! interchangeably, so its serialized shape (`id, x, y, width, height,
//! groupId`) is kept stable. Everything else here is either configuration
//! (`GroupStyle`, `LabelMetrics`) or derived data (`GroupBoundingBox`).

use crate::id::{BoxId, GroupId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
///
/// Serialized as a hex string (`"#3B82F6"`, `"#3B82F614"`) so group styles
/// can be written by hand in host configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA`. The `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let pair = |i: usize| -> Option<f32> {
            Some((hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?) as f32 / 255.0)
        };

        match bytes.len() {
            3 => {
                let r = hex_val(bytes[0])?;
                let g = hex_val(bytes[1])?;
                let b = hex_val(bytes[2])?;
                Some(Self::rgba(
                    (r * 17) as f32 / 255.0,
                    (g * 17) as f32 / 255.0,
                    (b * 17) as f32 / 255.0,
                    1.0,
                ))
            }
            6 => Some(Self::rgba(pair(0)?, pair(2)?, pair(4)?, 1.0)),
            8 => Some(Self::rgba(pair(0)?, pair(2)?, pair(4)?, pair(6)?)),
            _ => None,
        }
    }

    /// `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let (r, g, b, a) = (channel(self.r), channel(self.g), channel(self.b), channel(self.a));
        if a == u8::MAX {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }

    /// Same color with alpha multiplied by `factor`.
    pub fn with_alpha(self, factor: f32) -> Self {
        Self {
            a: (self.a * factor).clamp(0.0, 1.0),
            ..self
        }
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(hex: String) -> Result<Self, Self::Error> {
        Self::from_hex(&hex).ok_or_else(|| format!("invalid hex color {hex:?}"))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

// ─── Geometry ────────────────────────────────────────────────────────────

/// A 2D point in diagram coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Axis-aligned rectangle in diagram coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Position and size of one box, plus the group it belongs to (if any).
///
/// Owned by whichever box instance last registered it. Equality is
/// field-wise; registries use it to drop no-op updates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxGeometry {
    pub id: BoxId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
}

impl BoxGeometry {
    pub fn new(id: BoxId, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            id,
            x,
            y,
            width,
            height,
            group_id: None,
        }
    }

    pub fn in_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Same box shifted by `(dx, dy)`; size and group are preserved.
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// True when position and size match, ignoring identity and group.
    pub fn same_rect(&self, other: &BoxGeometry) -> bool {
        self.rect() == other.rect()
    }
}

// ─── Connection points ───────────────────────────────────────────────────

/// One of the four fixed anchors on a box perimeter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardinalDirection {
    Top,
    Right,
    Bottom,
    Left,
}

impl CardinalDirection {
    pub const ALL: [CardinalDirection; 4] = [Self::Top, Self::Right, Self::Bottom, Self::Left];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::Left => "left",
        }
    }
}

/// An anchor on a specific box, tagged so external connection tools can
/// find it again by `(box_id, direction)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPoint {
    pub box_id: BoxId,
    pub direction: CardinalDirection,
    pub point: Point,
}

impl ConnectionPoint {
    /// Stable hit-target identifier, e.g. `"login-top"`.
    pub fn handle_id(&self) -> String {
        format!("{}-{}", self.box_id, self.direction.as_str())
    }
}

/// The four anchors of one box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionPoints {
    pub top: Point,
    pub right: Point,
    pub bottom: Point,
    pub left: Point,
}

impl ConnectionPoints {
    pub fn get(&self, direction: CardinalDirection) -> Point {
        match direction {
            CardinalDirection::Top => self.top,
            CardinalDirection::Right => self.right,
            CardinalDirection::Bottom => self.bottom,
            CardinalDirection::Left => self.left,
        }
    }
}

// ─── Groups ──────────────────────────────────────────────────────────────

/// Default padding between the outermost members and the group background.
pub const DEFAULT_GROUP_PADDING: f32 = 15.0;

/// Visual configuration of a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupStyle {
    /// Space between the member bounds and the background edge.
    pub padding: f32,
    pub fill: Color,
    pub border: Color,
    pub border_width: f32,
    pub border_radius: f32,
    pub label_color: Color,
    /// Background opacity multiplier applied while the group is dragged.
    pub dragging_opacity: f32,
}

impl Default for GroupStyle {
    fn default() -> Self {
        Self {
            padding: DEFAULT_GROUP_PADDING,
            fill: Color::rgba(0.23, 0.51, 0.96, 0.08),
            border: Color::rgba(0.23, 0.51, 0.96, 0.6),
            border_width: 2.0,
            border_radius: 8.0,
            label_color: Color::rgba(0.12, 0.16, 0.22, 1.0),
            dragging_opacity: 0.7,
        }
    }
}

/// Member list of a group. Usually a handful of boxes.
pub type BoxIds = SmallVec<[BoxId; 8]>;

/// What a group publishes to the global store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMetadata {
    pub label: String,
    pub style: GroupStyle,
    pub box_ids: BoxIds,
}

/// A group as the global store sees it: metadata keyed by group ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMembership {
    pub group_id: GroupId,
    pub label: String,
    pub style: GroupStyle,
    pub box_ids: BoxIds,
}

impl GroupMembership {
    pub fn from_metadata(group_id: GroupId, metadata: GroupMetadata) -> Self {
        Self {
            group_id,
            label: metadata.label,
            style: metadata.style,
            box_ids: metadata.box_ids,
        }
    }
}

/// Derived background rectangle of a group. Never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: GroupStyle,
}

impl GroupBoundingBox {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Size constants for group labels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelMetrics {
    pub height: f32,
    /// Minimum distance between the label and the container's top edge.
    pub min_top_offset: f32,
    /// Gap between an outside label and the top of the background.
    pub gap: f32,
}

impl Default for LabelMetrics {
    fn default() -> Self {
        Self {
            height: 24.0,
            min_top_offset: 8.0,
            gap: 4.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_from_hex() {
        let c = Color::from_hex("#FF0000").unwrap();
        assert_eq!((c.r, c.g, c.b, c.a), (1.0, 0.0, 0.0, 1.0));
        let c = Color::from_hex("fff").unwrap();
        assert_eq!(c.g, 1.0);
        let c = Color::from_hex("#00000080").unwrap();
        assert!((c.a - 128.0 / 255.0).abs() < 1e-6);
        assert!(Color::from_hex("#12345").is_none());
        assert!(Color::from_hex("#GG0000").is_none());
    }

    #[test]
    fn color_to_hex_drops_opaque_alpha() {
        assert_eq!(Color::rgba(1.0, 0.0, 0.0, 1.0).to_hex(), "#FF0000");
        assert_eq!(Color::rgba(0.0, 0.0, 0.0, 0.5).to_hex(), "#00000080");
        assert_eq!(Color::from_hex("#3b82f6").unwrap().to_hex(), "#3B82F6");
    }

    #[test]
    fn with_alpha_scales_and_clamps() {
        let c = Color::rgba(0.2, 0.4, 0.6, 0.5);
        assert_eq!(c.with_alpha(0.5).a, 0.25);
        assert_eq!(c.with_alpha(4.0).a, 1.0);
        assert_eq!(c.with_alpha(0.5).r, 0.2);
    }

    #[test]
    fn translated_keeps_size_and_group() {
        let g = GroupId::intern("grp");
        let b = BoxGeometry::new(BoxId::intern("b"), 10.0, 20.0, 30.0, 40.0).in_group(g);
        let moved = b.translated(5.0, -5.0);
        assert_eq!(moved.x, 15.0);
        assert_eq!(moved.y, 15.0);
        assert_eq!(moved.width, 30.0);
        assert_eq!(moved.group_id, Some(g));
        assert!(!moved.same_rect(&b));
    }

    #[test]
    fn handle_id_is_box_plus_direction() {
        let cp = ConnectionPoint {
            box_id: BoxId::intern("login"),
            direction: CardinalDirection::Bottom,
            point: Point::new(0.0, 0.0),
        };
        assert_eq!(cp.handle_id(), "login-bottom");
    }

    #[test]
    fn rect_contains_edges() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(0.0, 0.0));
        assert!(r.contains(10.0, 10.0));
        assert!(!r.contains(10.1, 5.0));
    }
}
