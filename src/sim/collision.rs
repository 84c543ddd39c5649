//! Collision detection and outcome dispatch
//!
//! Geometry is axis-aligned boxes (centre + half-extents). What a contact
//! actually does is looked up in an [`OutcomeTable`] supplied by the active
//! environment, keyed by `(source kind, target kind)`. The resolver in
//! `tick.rs` stays generic.

use glam::Vec2;

use super::entity::{Entity, EntityKind};

/// Strict AABB overlap (touching edges do not collide)
#[inline]
pub fn boxes_overlap(a_pos: Vec2, a_half: Vec2, b_pos: Vec2, b_half: Vec2) -> bool {
    let d = (a_pos - b_pos).abs();
    let reach = a_half + b_half;
    d.x < reach.x && d.y < reach.y
}

#[inline]
pub fn entities_overlap(a: &Entity, b: &Entity) -> bool {
    boxes_overlap(a.pos, a.half, b.pos, b.half)
}

/// True when the box pokes past any edge of the `[0, size]` world.
#[inline]
pub fn crosses_world_edge(pos: Vec2, half: Vec2, size: Vec2) -> bool {
    pos.x - half.x < 0.0 || pos.x + half.x > size.x || pos.y - half.y < 0.0 || pos.y + half.y > size.y
}

/// True when the box has left the `[0, size]` world entirely.
#[inline]
pub fn outside_world(pos: Vec2, half: Vec2, size: Vec2) -> bool {
    pos.x + half.x <= 0.0
        || pos.x - half.x >= size.x
        || pos.y + half.y <= 0.0
        || pos.y - half.y >= size.y
}

/// Reflect velocity off a surface with the given unit normal
pub fn reflect_velocity(vel: Vec2, normal: Vec2) -> Vec2 {
    vel - 2.0 * vel.dot(normal) * normal
}

/// Which configured reward magnitude an outcome pays out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardKind {
    Positive,
    Negative,
    WallHit,
    Completion,
}

/// Effect of one `(source, target)` contact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    pub reward: Option<RewardKind>,
    /// Ends the episode
    pub terminal: bool,
    pub level_complete: bool,
    pub remove_source: bool,
    pub remove_target: bool,
    /// Also remove the first entity of this kind sharing the target's row
    pub unlock_row: Option<EntityKind>,
}

impl Outcome {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn reward(mut self, kind: RewardKind) -> Self {
        self.reward = Some(kind);
        self
    }

    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    pub fn completes_level(mut self) -> Self {
        self.terminal = true;
        self.level_complete = true;
        self
    }

    pub fn consume_source(mut self) -> Self {
        self.remove_source = true;
        self
    }

    pub fn consume_target(mut self) -> Self {
        self.remove_target = true;
        self
    }

    pub fn unlock_row(mut self, kind: EntityKind) -> Self {
        self.unlock_row = Some(kind);
        self
    }
}

/// Closed `(source, target) -> Outcome` mapping for one environment, plus
/// the pairs where a mover bounces off a target instead of touching it.
///
/// Rules are kept in declaration order; lookups are linear, which is fine for
/// the handful of pairs an environment declares.
#[derive(Debug, Clone, Default)]
pub struct OutcomeTable {
    rules: Vec<(EntityKind, EntityKind, Outcome)>,
    reflections: Vec<(EntityKind, EntityKind)>,
}

impl OutcomeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the outcome for a pair. A later declaration replaces an
    /// earlier one for the same pair.
    pub fn on(mut self, source: EntityKind, target: EntityKind, outcome: Outcome) -> Self {
        if let Some(rule) = self
            .rules
            .iter_mut()
            .find(|(s, t, _)| *s == source && *t == target)
        {
            rule.2 = outcome;
        } else {
            self.rules.push((source, target, outcome));
        }
        self
    }

    pub fn lookup(&self, source: EntityKind, target: EntityKind) -> Option<&Outcome> {
        self.rules
            .iter()
            .find(|(s, t, _)| *s == source && *t == target)
            .map(|(_, _, outcome)| outcome)
    }

    /// Movers of kind `mover` bounce off `target`. `OutOfBoundsWall` stands
    /// for the world edge.
    pub fn reflect(mut self, mover: EntityKind, target: EntityKind) -> Self {
        if !self.reflects(mover, target) {
            self.reflections.push((mover, target));
        }
        self
    }

    pub fn reflects(&self, mover: EntityKind, target: EntityKind) -> bool {
        self.reflections.contains(&(mover, target))
    }

    /// Whether `mover` bounces off anything at all
    pub fn is_reflector(&self, mover: EntityKind) -> bool {
        self.reflections.iter().any(|(m, _)| *m == mover)
    }

    /// Whether non-player entities of this kind actively test for contacts
    pub fn is_source(&self, kind: EntityKind) -> bool {
        kind != EntityKind::Player && self.rules.iter().any(|(s, _, _)| *s == kind)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
