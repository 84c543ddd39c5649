//! FruitBot
//!
//! The agent drifts upward through rows of walls, collecting fruit and
//! avoiding other food. Some wall gaps are blocked by a locked door; shooting
//! a key into the lock opens it. Reaching the row of presents at the top
//! completes the level.

use std::f32::consts::FRAC_PI_2;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::Game;
use crate::settings::{DistributionMode, LayoutMode, Settings};
use crate::sim::collision::{Outcome, OutcomeTable, RewardKind};
use crate::sim::entity::{Entity, EntityKind};
use crate::sim::level::LevelBuilder;
use crate::sim::state::World;

pub const NAME: &str = "fruitbot";

/// Minimum vertical distance between wall rows
const MIN_SEP: u32 = 4;
/// Height kept free of walls below the goal row
const BUF_H: u32 = 4;
const WALL_RY: f32 = 0.3;
const LOCK_RX: f32 = 0.25;
const LOCK_RY: f32 = 0.45;
/// Width / height of one door tile
const DOOR_ASPECT: f32 = 3.25;
/// Doors are only placed in rows at least this far above the previous one
const DOOR_MIN_DY: u32 = 5;
const MAX_GAP_PCT: f32 = 0.95;

/// Ticks between keys, and how long a key lives
const KEY_DURATION: u32 = 8;
const KEY_SPEED: f32 = 0.5;
const KEY_RADIUS: f32 = 0.25;
const FOOD_RADIUS: f32 = 0.5;

const PRESENT_THEMES: u32 = 3;
/// Sprite variants for food outside easy mode
const FOOD_THEMES: u32 = 6;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FruitBot {
    /// Tick at which the last key was fired
    pub last_fire_time: u32,
}

/// Wall layout parameters after mode defaults and overrides
#[derive(Debug, Clone, Copy, PartialEq)]
struct WallParams {
    enabled: bool,
    count: u32,
    min_pct: f32,
    door_prob: f32,
}

impl WallParams {
    fn from_settings(settings: &Settings) -> Self {
        let (mut count, mut min_pct, mut door_prob) = match settings.distribution_mode {
            DistributionMode::Easy => (5, 0.3, 0.0),
            _ => (10, 0.4, 0.125),
        };

        if let Some(n) = settings.num_walls {
            count = n;
        }
        if let Some(pct) = settings.wall_gap_pct {
            min_pct = pct as f32 / 100.0;
        }
        if let Some(pct) = settings.door_prob_pct {
            door_prob = pct as f32 / 100.0;
        }

        let enabled =
            !settings.force_no_walls && count > 0 && settings.wall_gap_pct.is_none_or(|p| p < 100);

        Self {
            enabled,
            count,
            min_pct: min_pct.clamp(0.05, MAX_GAP_PCT),
            door_prob,
        }
    }
}

impl FruitBot {
    /// One wall row at height `y`: two barrier segments around a gap, and
    /// optionally a locked door with its lock filling the gap.
    fn add_walls(&self, level: &mut LevelBuilder, y: f32, mut use_door: bool, min_pct: f32) {
        let width = level.width();
        let mut pct = (min_pct + 0.2 * level.rng.next_float01()).min(MAX_GAP_PCT);

        if use_door {
            // The gap holds one lock slot plus a whole number of door tiles
            let lock_pct = 2.0 * LOCK_RX / width;
            let door_pct = WALL_RY * 2.0 * DOOR_ASPECT / width;
            let max_doors = ((1.0 - 2.0 * lock_pct) / door_pct).floor();
            if max_doors >= 1.0 {
                let doors = ((pct + 0.1 - 2.0 * lock_pct) / door_pct)
                    .ceil()
                    .clamp(1.0, max_doors);
                pct = 2.0 * lock_pct + door_pct * doors;
            } else {
                log::debug!("row {y}: world too narrow for a door");
                use_door = false;
            }
        }

        let gap = pct * width;
        let w1 = level.rng.next_float01() * (width - gap);
        let w2 = width - w1 - gap;

        if w1 > 0.0 {
            level.spawn_box(EntityKind::Barrier, w1 / 2.0, y, w1 / 2.0, WALL_RY);
        }
        if w2 > 0.0 {
            level.spawn_box(EntityKind::Barrier, width - w2 / 2.0, y, w2 / 2.0, WALL_RY);
        }

        if use_door {
            let on_right = level.rng.next_int(2) as f32;
            let lock_x = w1 + LOCK_RX + on_right * (gap - 2.0 * LOCK_RX);
            let door_x = w1 + gap / 2.0 - (on_right * 2.0 - 1.0) * LOCK_RX;

            level.spawn_box(EntityKind::LockedDoor, door_x, y, gap / 2.0 - LOCK_RX, WALL_RY);
            // Top edge flush with the wall, hanging below it
            level.spawn_box(EntityKind::Lock, lock_x, y - LOCK_RY + WALL_RY, LOCK_RX, LOCK_RY);
        }
    }
}

impl Game for FruitBot {
    const NAME: &'static str = NAME;

    fn supports_mode(mode: DistributionMode) -> bool {
        matches!(mode, DistributionMode::Easy | DistributionMode::Hard)
    }

    fn default_world_size(mode: DistributionMode) -> (u32, u32) {
        match mode {
            DistributionMode::Easy => (10, 20),
            _ => (15, 20),
        }
    }

    fn rules() -> OutcomeTable {
        let wall = Outcome::none().reward(RewardKind::WallHit).terminal();
        OutcomeTable::new()
            .on(EntityKind::Player, EntityKind::Barrier, wall)
            .on(EntityKind::Player, EntityKind::LockedDoor, wall)
            .on(
                EntityKind::Player,
                EntityKind::BadObj,
                Outcome::none().reward(RewardKind::Negative).consume_target(),
            )
            .on(
                EntityKind::Player,
                EntityKind::GoodObj,
                Outcome::none().reward(RewardKind::Positive).consume_target(),
            )
            .on(
                EntityKind::Player,
                EntityKind::Present,
                Outcome::none().reward(RewardKind::Completion).completes_level(),
            )
            // Touching a lock is recorded but harmless
            .on(EntityKind::Player, EntityKind::Lock, Outcome::none())
            .on(
                EntityKind::PlayerBullet,
                EntityKind::Barrier,
                Outcome::none().consume_source(),
            )
            .on(
                EntityKind::PlayerBullet,
                EntityKind::Lock,
                Outcome::none()
                    .consume_source()
                    .consume_target()
                    .unlock_row(EntityKind::LockedDoor),
            )
            .reflect(EntityKind::BadObj, EntityKind::Barrier)
            .reflect(EntityKind::BadObj, EntityKind::OutOfBoundsWall)
    }

    fn action_velocity(movement: i32) -> Vec2 {
        Vec2::new((movement / 3 - 1) as f32, 0.2)
    }

    fn generate(&mut self, level: &mut LevelBuilder) {
        self.last_fire_time = 0;
        let settings = level.settings;

        let walls = WallParams::from_settings(settings);
        if walls.enabled {
            let goal_bottom = level.height() - 1.0;
            for (y, dy) in level.wall_rows(walls.count, MIN_SEP, BUF_H) {
                let y = y as f32;
                if y + WALL_RY > goal_bottom {
                    log::debug!("skipping wall row {y}: overlaps the goal row");
                    continue;
                }
                let use_door = dy > DOOR_MIN_DY && level.rng.next_bool(walls.door_prob);
                self.add_walls(level, y, use_door, walls.min_pct);
            }
        }

        let num_good = level
            .rng
            .next_int(settings.num_good_range)
            .saturating_add(settings.num_good_min);
        let num_bad = level
            .rng
            .next_int(settings.num_bad_range)
            .saturating_add(settings.num_bad_min);

        level.goal_row(EntityKind::Present, PRESENT_THEMES);

        let themes = match settings.distribution_mode {
            DistributionMode::Easy => settings.food_diversity,
            _ => FOOD_THEMES,
        };
        match settings.layout_mode {
            LayoutMode::Lines => {
                let pad = settings.line_padding_pct;
                level.spawn_line(EntityKind::GoodObj, num_good, settings.good_line_x_pct, pad, themes);
                level.spawn_line(EntityKind::BadObj, num_bad, settings.bad_line_x_pct, pad, themes);
            }
            LayoutMode::Scattered => {
                level.spawn_scattered(EntityKind::GoodObj, num_good, FOOD_RADIUS);
                level.spawn_scattered(EntityKind::BadObj, num_bad, FOOD_RADIUS);
                level.assign_themes(&[EntityKind::GoodObj, EntityKind::BadObj], themes);
            }
        }

        if let Some(agent) = level.agent_mut() {
            agent.rotation = -FRAC_PI_2;
        }

        log::debug!(
            "fruitbot level: {} walls, {num_good} good, {num_bad} bad",
            level.world.entities.count(EntityKind::Barrier)
        );
    }

    fn after_step(&mut self, world: &mut World, cur_time: u32, special: i32) {
        if special != 1 || cur_time.saturating_sub(self.last_fire_time) < KEY_DURATION {
            return;
        }
        let Some(agent) = world.entities.agent() else {
            return;
        };

        let key = Entity::new(EntityKind::PlayerBullet, agent.pos, Vec2::splat(KEY_RADIUS))
            .with_velocity(Vec2::new(0.0, KEY_SPEED))
            .with_expiry(KEY_DURATION);
        world.entities.spawn(key);
        self.last_fire_time = cur_time;
    }
}
