//! Environments
//!
//! An environment decides the world size, how an action moves the agent,
//! how a level is laid out, and what every contact does. The engine and the
//! tick resolver are generic over [`Game`].

pub mod fruitbot;

pub use fruitbot::FruitBot;

use glam::Vec2;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::consts::{MAX_SPEED, MIX_RATE};
use crate::settings::DistributionMode;
use crate::sim::collision::OutcomeTable;
use crate::sim::level::LevelBuilder;
use crate::sim::state::World;

/// Per-environment hooks.
///
/// Implementors hold only the state that must survive a snapshot (it is
/// serialized as the last section of the snapshot body).
pub trait Game: Clone + Default + Serialize + DeserializeOwned + Send + 'static {
    /// Name written into snapshots
    const NAME: &'static str;
    /// Blend factor between the agent's velocity and the action velocity
    const MIX_RATE: f32 = MIX_RATE;
    /// Scale applied to the action velocity
    const MAX_SPEED: f32 = MAX_SPEED;

    fn supports_mode(mode: DistributionMode) -> bool;

    /// `(width, height)` before settings overrides
    fn default_world_size(mode: DistributionMode) -> (u32, u32);

    /// Contact outcomes and reflection pairs
    fn rules() -> OutcomeTable;

    /// Unscaled agent velocity for a move code in 0..9
    fn action_velocity(movement: i32) -> Vec2;

    /// Lay out a level. The builder's RNG is already seeded with the level
    /// seed and the agent is already placed.
    fn generate(&mut self, level: &mut LevelBuilder);

    /// Runs after contacts are resolved and the step reward is added.
    fn after_step(&mut self, _world: &mut World, _cur_time: u32, _special: i32) {}
}
