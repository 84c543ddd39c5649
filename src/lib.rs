//! FruitBot Sim - a deterministic procedural 2D game-simulation engine
//!
//! Core modules:
//! - `sim`: Deterministic simulation (level generation, physics, collisions, episodes)
//! - `games`: Environments plugged into the engine (`FruitBot`)
//! - `persistence`: Versioned binary snapshots
//! - `settings`: Named options and validation

pub mod error;
pub mod games;
pub mod persistence;
pub mod settings;
pub mod sim;

pub use error::{ConfigError, SnapshotError};
pub use games::{FruitBot, Game};
pub use settings::{DistributionMode, LayoutMode, Rewards, Settings};
pub use sim::{Action, Engine, EntityKind, StepData};

/// Simulation constants
pub mod consts {
    /// Default blend between the agent's velocity and the action velocity
    pub const MIX_RATE: f32 = 0.5;
    /// Default scale applied to action velocities
    pub const MAX_SPEED: f32 = 0.85;

    /// Agent half-extent on both axes
    pub const AGENT_HALF_EXTENT: f32 = 0.5;

    /// Level seed increment when sequential levels chain
    pub const SEQUENTIAL_SEED_STEP: i32 = 997;

    /// Max vertical distance for two entities to share a wall row
    pub const ROW_TOLERANCE: f32 = 1.0;
}
