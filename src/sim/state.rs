//! Simulation state
//!
//! All state that must survive a snapshot/restore lives here or in the
//! engine's RNGs. Nothing in this module touches rendering or I/O.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::{EntityKind, EntityStore};
use super::tick::Action;

/// Sentinel echoed for the collision position when nothing was hit
pub const NO_COLLISION_POS: f32 = -1.0;
/// Sentinel echoed for the collision type when nothing was hit
pub const NO_COLLISION_TYPE: i32 = 0;

/// Most recent agent collision of a tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionRecord {
    /// Target x normalized by world width
    pub x: f32,
    /// Target y normalized by world height
    pub y: f32,
    pub kind: EntityKind,
}

/// Per-tick results, cleared at the start of every step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepData {
    pub reward: f32,
    pub done: bool,
    pub level_complete: bool,
    /// Agent x normalized by world width
    pub agent_x: f32,
    /// Agent y normalized by world height
    pub agent_y: f32,
    /// Last collision wins
    pub collision: Option<CollisionRecord>,
}

impl Default for StepData {
    fn default() -> Self {
        Self {
            reward: 0.0,
            done: false,
            level_complete: false,
            agent_x: 0.0,
            agent_y: 0.0,
            collision: None,
        }
    }
}

impl StepData {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Flat `(x, y, type)` echo with sentinels when nothing was hit
    pub fn collision_fields(&self) -> (f32, f32, i32) {
        match self.collision {
            Some(c) => (c.x, c.y, c.kind.tag()),
            None => (NO_COLLISION_POS, NO_COLLISION_POS, NO_COLLISION_TYPE),
        }
    }
}

/// Episode counters and level-seed bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeState {
    /// Ticks since the current level was generated
    pub cur_time: u32,
    pub current_level_seed: i32,
    pub prev_level_seed: i32,
    /// Reward accumulated over the current episode
    pub total_reward: f32,
    /// Levels already scheduled ahead of the next reset
    pub episodes_remaining: u32,
    /// Reported done flag of the last step
    pub episode_done: bool,
    pub reset_count: u64,
    /// Used when the caller forces a reset
    pub default_action: Action,
    /// Last action applied
    pub action: Action,
}

impl Default for EpisodeState {
    fn default() -> Self {
        Self {
            cur_time: 0,
            current_level_seed: 0,
            prev_level_seed: 0,
            total_reward: 0.0,
            episodes_remaining: 0,
            episode_done: false,
            reset_count: 0,
            default_action: Action::STAY,
            action: Action::STAY,
        }
    }
}

/// The physical world: dimensions, entities and the current tick's results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub size: Vec2,
    pub entities: EntityStore,
    pub step: StepData,
}

impl World {
    pub fn new(size: Vec2) -> Self {
        Self {
            size,
            entities: EntityStore::new(),
            step: StepData::default(),
        }
    }

    pub fn width(&self) -> f32 {
        self.size.x
    }

    pub fn height(&self) -> f32 {
        self.size.y
    }

    /// Position normalized to [0, 1] on both axes
    pub fn normalize(&self, pos: Vec2) -> Vec2 {
        if self.size.x <= 0.0 || self.size.y <= 0.0 {
            return Vec2::ZERO;
        }
        pos / self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleared_step_reports_sentinels() {
        let mut step = StepData {
            reward: 3.0,
            done: true,
            level_complete: true,
            agent_x: 0.5,
            agent_y: 0.1,
            collision: Some(CollisionRecord {
                x: 0.2,
                y: 0.4,
                kind: EntityKind::GoodObj,
            }),
        };
        assert_eq!(step.collision_fields(), (0.2, 0.4, 7));

        step.clear();
        assert_eq!(step.reward, 0.0);
        assert!(!step.done && !step.level_complete);
        assert_eq!(step.collision_fields(), (-1.0, -1.0, 0));
    }
}
