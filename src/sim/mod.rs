//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - One discrete action per tick
//! - Seeded RNG only, owned by the engine instance
//! - Stable iteration order (entity store insertion order)
//! - No rendering or I/O

pub mod collision;
pub mod engine;
pub mod entity;
pub mod level;
pub mod rng;
pub mod state;
pub mod tick;

pub use collision::{Outcome, OutcomeTable, RewardKind};
pub use engine::Engine;
pub use entity::{Entity, EntityId, EntityKind, EntityStore};
pub use level::LevelBuilder;
pub use rng::GameRng;
pub use state::{CollisionRecord, EpisodeState, StepData, World};
pub use tick::{Action, NUM_ACTIONS, TickInput, advance};
