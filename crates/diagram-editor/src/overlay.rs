//! Transient visual offsets layered over committed geometry.
//!
//! During a drag, members are painted at `committed + offset` while the
//! registries keep the pre-drag geometry. After the commit the remaining
//! difference between where a member was last painted and where it now
//! lives is eased to zero, so nothing jumps. Offsets never flow back into a
//! registry.

use diagram_core::{BoxGeometry, BoxId, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Timing curve for settle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Easing {
    Linear,
    #[default]
    EaseOut,
}

impl Easing {
    /// Map linear progress `t` in [0, 1] onto the curve.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseOut => 1.0 - (1.0 - t).powi(3),
        }
    }
}

/// A short eased transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub duration_ms: f64,
    pub easing: Easing,
}

impl Default for Transition {
    fn default() -> Self {
        Self {
            duration_ms: 150.0,
            easing: Easing::EaseOut,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Settle {
    from: (f32, f32),
    started_at: Option<f64>,
    transition: Transition,
}

/// Per-box paint offsets.
#[derive(Debug, Default)]
pub struct VisualOverlay {
    offsets: HashMap<BoxId, (f32, f32)>,
    settling: HashMap<BoxId, Settle>,
}

impl VisualOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current paint offset of `id`; `(0, 0)` when untouched.
    pub fn offset(&self, id: BoxId) -> (f32, f32) {
        self.offsets.get(&id).copied().unwrap_or((0.0, 0.0))
    }

    /// Where `geometry` should be painted right now.
    pub fn painted_rect(&self, geometry: &BoxGeometry) -> Rect {
        let (dx, dy) = self.offset(geometry.id);
        Rect::new(
            geometry.x + dx,
            geometry.y + dy,
            geometry.width,
            geometry.height,
        )
    }

    /// Apply the same offset to every listed box, replacing any settle.
    pub fn set_offset<I>(&mut self, ids: I, dx: f32, dy: f32)
    where
        I: IntoIterator<Item = BoxId>,
    {
        for id in ids {
            self.settling.remove(&id);
            self.offsets.insert(id, (dx, dy));
        }
    }

    /// Drop offsets and pending settles for the listed boxes.
    pub fn clear<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = BoxId>,
    {
        for id in ids {
            self.offsets.remove(&id);
            self.settling.remove(&id);
        }
    }

    /// Start easing `id` from `residual` back to zero. The clock starts on
    /// the next `tick`.
    pub fn settle(&mut self, id: BoxId, residual: (f32, f32), transition: Transition) {
        if residual == (0.0, 0.0) || transition.duration_ms <= 0.0 {
            self.offsets.remove(&id);
            self.settling.remove(&id);
            return;
        }
        self.offsets.insert(id, residual);
        self.settling.insert(
            id,
            Settle {
                from: residual,
                started_at: None,
                transition,
            },
        );
    }

    pub fn is_settling(&self) -> bool {
        !self.settling.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Advance settle transitions to `now_ms`. Returns true while any are
    /// still running, i.e. the host should keep requesting frames.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        let mut finished = Vec::new();
        for (id, settle) in &mut self.settling {
            let start = *settle.started_at.get_or_insert(now_ms);
            let t = ((now_ms - start) / settle.transition.duration_ms) as f32;
            let remaining = 1.0 - settle.transition.easing.apply(t);
            if t >= 1.0 {
                finished.push(*id);
            } else {
                self.offsets
                    .insert(*id, (settle.from.0 * remaining, settle.from.1 * remaining));
            }
        }
        for id in finished {
            self.settling.remove(&id);
            self.offsets.remove(&id);
        }
        self.is_settling()
    }
}
