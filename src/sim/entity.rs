//! Entities and the insertion-ordered entity store
//!
//! Storage is a plain `Vec` so iteration order is identical on every run.
//! The player always occupies slot 0 and is never swept.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Closed set of entity types.
///
/// The discriminants are stable wire tags: they are echoed as the collision
/// type in step data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    /// Structural wall segment
    Barrier,
    /// Virtual world edge (never stored, used for blocking/reflection)
    OutOfBoundsWall,
    /// Key fired by the player
    PlayerBullet,
    /// Hazard
    BadObj,
    /// Collectible
    GoodObj,
    LockedDoor,
    Lock,
    /// Goal
    Present,
}

impl EntityKind {
    /// Stable integer tag
    pub fn tag(self) -> i32 {
        match self {
            EntityKind::Player => 0,
            EntityKind::Barrier => 1,
            EntityKind::OutOfBoundsWall => 2,
            EntityKind::PlayerBullet => 3,
            EntityKind::BadObj => 4,
            EntityKind::GoodObj => 7,
            EntityKind::LockedDoor => 10,
            EntityKind::Lock => 11,
            EntityKind::Present => 12,
        }
    }

    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(EntityKind::Player),
            1 => Some(EntityKind::Barrier),
            2 => Some(EntityKind::OutOfBoundsWall),
            3 => Some(EntityKind::PlayerBullet),
            4 => Some(EntityKind::BadObj),
            7 => Some(EntityKind::GoodObj),
            10 => Some(EntityKind::LockedDoor),
            11 => Some(EntityKind::Lock),
            12 => Some(EntityKind::Present),
            _ => None,
        }
    }
}

/// Stable per-level entity identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// A simulation object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Half-extents (rx, ry)
    pub half: Vec2,
    pub rotation: f32,
    /// Cosmetic sprite variant, no effect on physics
    pub theme: u32,
    /// Ticks left before the entity expires
    pub expire_ticks: Option<u32>,
    /// Swept at the end of the tick
    pub remove: bool,
}

impl Entity {
    pub fn new(kind: EntityKind, pos: Vec2, half: Vec2) -> Self {
        Self {
            id: EntityId(0),
            kind,
            pos,
            vel: Vec2::ZERO,
            half,
            rotation: 0.0,
            theme: 0,
            expire_ticks: None,
            remove: false,
        }
    }

    pub fn with_velocity(mut self, vel: Vec2) -> Self {
        self.vel = vel;
        self
    }

    pub fn with_expiry(mut self, ticks: u32) -> Self {
        self.expire_ticks = Some(ticks);
        self
    }

    pub fn min(&self) -> Vec2 {
        self.pos - self.half
    }

    pub fn max(&self) -> Vec2 {
        self.pos + self.half
    }
}

/// Insertion-ordered entity arena
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityStore {
    entities: Vec<Entity>,
    next_id: u32,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entity and restart id allocation.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.next_id = 0;
    }

    /// Append an entity, assigning it the next id.
    pub fn spawn(&mut self, mut entity: Entity) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        entity.id = id;
        self.entities.push(entity);
        id
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.iter_mut()
    }

    pub fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.entities.get_mut(index)
    }

    pub fn find(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// The player entity (slot 0), if the level has been built.
    pub fn agent(&self) -> Option<&Entity> {
        self.entities.first().filter(|e| e.kind == EntityKind::Player)
    }

    pub fn agent_mut(&mut self) -> Option<&mut Entity> {
        self.entities
            .first_mut()
            .filter(|e| e.kind == EntityKind::Player)
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.entities.iter().filter(|e| e.kind == kind).count()
    }

    /// Index of the first entity of `kind` whose centre lies within
    /// `tolerance` of `y`, in store order. Entities already flagged for
    /// removal still match, so a second hit on the same row this tick finds
    /// the same entity again.
    pub fn first_in_row(&self, kind: EntityKind, y: f32, tolerance: f32) -> Option<usize> {
        self.entities
            .iter()
            .position(|e| e.kind == kind && (e.pos.y - y).abs() < tolerance)
    }

    /// Remove flagged entities, preserving order. The player is kept.
    /// Returns how many entities were dropped.
    pub fn sweep(&mut self) -> usize {
        let before = self.entities.len();
        self.entities
            .retain(|e| !e.remove || e.kind == EntityKind::Player);
        if let Some(agent) = self.agent_mut() {
            agent.remove = false;
        }
        before - self.entities.len()
    }
}
