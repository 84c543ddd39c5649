//! Level construction helpers
//!
//! Environments lay out their levels through a [`LevelBuilder`], which owns
//! nothing: it borrows the world, the gameplay RNG (already seeded with the
//! level seed) and the active settings for the duration of one generation.

use glam::Vec2;

use super::collision::boxes_overlap;
use super::entity::{Entity, EntityId, EntityKind};
use super::rng::GameRng;
use super::state::World;
use crate::consts::AGENT_HALF_EXTENT;
use crate::settings::Settings;

/// Placement attempts per scattered object before the last sample is kept
pub const MAX_PLACEMENT_ATTEMPTS: u32 = 100;

/// Line layout x is clamped into this fraction of the width
const LINE_X_MIN: f32 = 0.05;
const LINE_X_MAX: f32 = 0.95;
/// Line padding is clamped into this fraction of the height
const LINE_PAD_MAX: f32 = 0.45;
const LINE_MIN_SPAN: f32 = 0.1;

pub struct LevelBuilder<'a> {
    pub world: &'a mut World,
    pub rng: &'a mut GameRng,
    pub settings: &'a Settings,
}

impl<'a> LevelBuilder<'a> {
    pub fn new(world: &'a mut World, rng: &'a mut GameRng, settings: &'a Settings) -> Self {
        Self {
            world,
            rng,
            settings,
        }
    }

    /// Empty the world and place the agent at the bottom centre.
    ///
    /// Step data is left alone: it still describes the tick that ended the
    /// previous level.
    pub fn begin(&mut self, size: Vec2) -> EntityId {
        self.world.size = size;
        self.world.entities.clear();
        let half = Vec2::splat(AGENT_HALF_EXTENT);
        self.spawn(Entity::new(
            EntityKind::Player,
            Vec2::new(size.x / 2.0, half.y),
            half,
        ))
    }

    pub fn width(&self) -> f32 {
        self.world.width()
    }

    pub fn height(&self) -> f32 {
        self.world.height()
    }

    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        self.world.entities.spawn(entity)
    }

    /// Spawn an axis-aligned box given its centre and half-extents.
    pub fn spawn_box(&mut self, kind: EntityKind, x: f32, y: f32, rx: f32, ry: f32) -> EntityId {
        self.spawn(Entity::new(kind, Vec2::new(x, y), Vec2::new(rx, ry)))
    }

    pub fn agent_mut(&mut self) -> Option<&mut Entity> {
        self.world.entities.agent_mut()
    }

    /// Whether a box at `pos` would overlap any live entity.
    pub fn is_occupied(&self, pos: Vec2, half: Vec2) -> bool {
        self.world
            .entities
            .iter()
            .any(|e| !e.remove && boxes_overlap(pos, half, e.pos, e.half))
    }

    /// Row heights for `count` horizontal wall rows.
    ///
    /// The free height left after reserving `min_sep` per row and `buffer`
    /// at the top is partitioned randomly; each row sits `min_sep + part`
    /// above the previous one. Returns `(y, gap_below)` pairs.
    pub fn wall_rows(&mut self, count: u32, min_sep: u32, buffer: u32) -> Vec<(u32, u32)> {
        let height = self.height() as i64;
        let reserved = i64::from(min_sep) * i64::from(count) + i64::from(buffer);
        let free = (height - reserved).max(1) as u32;

        let mut y = 0u32;
        self.rng
            .partition(free, count)
            .into_iter()
            .map(|part| {
                let dy = min_sep.saturating_add(part);
                y = y.saturating_add(dy);
                (y, dy)
            })
            .collect()
    }

    /// One entity per horizontal unit along the top row, each with a theme
    /// drawn from `themes`.
    pub fn goal_row(&mut self, kind: EntityKind, themes: u32) -> usize {
        let columns = self.width().max(0.0) as u32;
        let y = self.height() - 0.5;
        for column in 0..columns {
            let theme = self.rng.next_int(themes);
            let mut entity = Entity::new(kind, Vec2::new(column as f32 + 0.5, y), Vec2::splat(0.5));
            entity.theme = theme;
            self.spawn(entity);
        }
        columns as usize
    }

    /// Place `count` objects at random free positions.
    ///
    /// Each object samples up to [`MAX_PLACEMENT_ATTEMPTS`] positions and
    /// keeps the first one that overlaps nothing. When every attempt collides
    /// the last sample is used anyway. Themes are not assigned here.
    pub fn spawn_scattered(&mut self, kind: EntityKind, count: u32, radius: f32) -> Vec<EntityId> {
        let half = Vec2::splat(radius);
        let free = (self.world.size - 2.0 * half).max(Vec2::ZERO);

        let mut ids = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut pos = self.sample_position(half, free);
            let mut attempts = 1;
            while self.is_occupied(pos, half) {
                if attempts == MAX_PLACEMENT_ATTEMPTS {
                    log::debug!("no free spot for {kind:?}, placing at ({:.2}, {:.2})", pos.x, pos.y);
                    break;
                }
                pos = self.sample_position(half, free);
                attempts += 1;
            }
            ids.push(self.spawn(Entity::new(kind, pos, half)));
        }
        ids
    }

    fn sample_position(&mut self, half: Vec2, free: Vec2) -> Vec2 {
        let x = self.rng.next_float01() * free.x;
        let y = self.rng.next_float01() * free.y;
        half + Vec2::new(x, y)
    }

    /// Place `count` objects evenly along a vertical line.
    ///
    /// `x_pct` is clamped to 5..=95 percent of the width and `padding_pct`
    /// to at most 45 percent of the height; a single object sits mid-span.
    /// Each object draws its theme from `themes` as it is placed.
    pub fn spawn_line(
        &mut self,
        kind: EntityKind,
        count: u32,
        x_pct: i32,
        padding_pct: i32,
        themes: u32,
    ) -> Vec<EntityId> {
        if count == 0 {
            return Vec::new();
        }

        let x = (x_pct as f32 / 100.0).clamp(LINE_X_MIN, LINE_X_MAX) * self.width();
        let pad = (padding_pct as f32 / 100.0).clamp(0.0, LINE_PAD_MAX) * self.height();
        let y_start = pad + 0.5;
        let y_end = self.height() - pad - 0.5;
        let span = (y_end - y_start).max(LINE_MIN_SPAN);

        (0..count)
            .map(|i| {
                let t = if count == 1 {
                    0.5
                } else {
                    i as f32 / (count - 1) as f32
                };
                let mut entity = Entity::new(kind, Vec2::new(x, y_start + t * span), Vec2::splat(0.5));
                entity.theme = self.rng.next_int(themes);
                self.spawn(entity)
            })
            .collect()
    }

    /// Give every entity of the listed kinds a theme, in store order.
    pub fn assign_themes(&mut self, kinds: &[EntityKind], themes: u32) {
        let rng = &mut *self.rng;
        for entity in self.world.entities.iter_mut() {
            if kinds.contains(&entity.kind) {
                entity.theme = rng.next_int(themes);
            }
        }
    }
}
