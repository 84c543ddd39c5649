//! Episode engine
//!
//! Owns everything one environment instance needs: settings, both RNGs,
//! episode bookkeeping, the world and the environment's own state. Each call
//! to [`Engine::step`] runs exactly one tick and regenerates the level before
//! returning when the episode ended.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::collision::OutcomeTable;
use super::entity::EntityStore;
use super::level::LevelBuilder;
use super::rng::GameRng;
use super::state::{EpisodeState, StepData, World};
use super::tick::{self, Action, NEUTRAL_MOVE, TickInput};
use crate::consts::SEQUENTIAL_SEED_STEP;
use crate::error::{ConfigError, SnapshotError};
use crate::games::Game;
use crate::persistence::snapshot;
use crate::settings::Settings;

pub struct Engine<G: Game> {
    settings: Settings,
    /// Installed at the next reset
    pending: Option<Settings>,
    /// Rebuilt from `G`, never serialized
    rules: OutcomeTable,
    /// Draws level seeds only
    level_seed_rng: GameRng,
    /// Reseeded with the level seed on every reset
    rng: GameRng,
    episode: EpisodeState,
    world: World,
    game: G,
}

/// Snapshot body, borrowed for encoding. Field order is the wire order.
#[derive(Serialize)]
struct SnapshotRef<'a, G> {
    settings: &'a Settings,
    pending: &'a Option<Settings>,
    level_seed_rng: &'a GameRng,
    rng: &'a GameRng,
    episode: &'a EpisodeState,
    world: &'a World,
    game: &'a G,
}

/// Snapshot body, owned for decoding
#[derive(Deserialize)]
struct SnapshotBody<G> {
    settings: Settings,
    pending: Option<Settings>,
    level_seed_rng: GameRng,
    rng: GameRng,
    episode: EpisodeState,
    world: World,
    game: G,
}

impl<G: Game> Engine<G> {
    /// Build an engine and generate its first level.
    pub fn new(settings: Settings) -> Result<Self, ConfigError> {
        Self::check(&settings)?;

        let mut engine = Self {
            level_seed_rng: GameRng::new(settings.rand_seed),
            settings,
            pending: None,
            rules: G::rules(),
            rng: GameRng::default(),
            episode: EpisodeState::default(),
            world: World::default(),
            game: G::default(),
        };
        engine.reset();
        log::info!(
            "{} engine ready ({} mode, seed {})",
            G::NAME,
            engine.settings.distribution_mode,
            engine.settings.rand_seed
        );
        Ok(engine)
    }

    /// Build from a named-option map.
    pub fn from_options(options: &Map<String, Value>) -> Result<Self, ConfigError> {
        Self::new(Settings::from_options(options)?)
    }

    fn check(settings: &Settings) -> Result<(), ConfigError> {
        settings.validate()?;
        if !G::supports_mode(settings.distribution_mode) {
            return Err(ConfigError::UnsupportedMode {
                env: G::NAME,
                mode: settings.distribution_mode,
            });
        }
        Ok(())
    }

    pub fn name(&self) -> &'static str {
        G::NAME
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn episode(&self) -> &EpisodeState {
        &self.episode
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn entities(&self) -> &EntityStore {
        &self.world.entities
    }

    /// Results of the most recent step
    pub fn step_data(&self) -> StepData {
        self.world.step
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    /// Advance one tick.
    pub fn step(&mut self, action: Action) -> StepData {
        self.episode.cur_time += 1;

        let mut force_reset = false;
        let action = if action == Action::FORCE_RESET {
            force_reset = true;
            self.episode.default_action
        } else if !action.is_valid() {
            log::warn!("invalid action code {}, using default", action.0);
            self.episode.default_action
        } else {
            action
        };
        self.episode.action = action;

        self.world.step.clear();

        let (movement, special) = action.decode().unwrap_or((NEUTRAL_MOVE, 0));
        let input = TickInput {
            target_vel: G::MAX_SPEED * G::action_velocity(movement),
            mix_rate: G::MIX_RATE,
        };
        tick::advance(&mut self.world, &self.rules, &self.settings.rewards, &input);
        self.world.step.reward += self.settings.rewards.step;
        self.game
            .after_step(&mut self.world, self.episode.cur_time, special);

        let step = &mut self.world.step;
        step.done = step.done || force_reset || self.episode.cur_time >= self.settings.timeout;
        self.episode.total_reward += step.reward;
        self.episode.prev_level_seed = self.episode.current_level_seed;

        if self.world.step.done {
            log::info!(
                "episode over: level {} after {} ticks, reward {:.2}{}",
                self.episode.current_level_seed,
                self.episode.cur_time,
                self.episode.total_reward,
                if self.world.step.level_complete {
                    " (complete)"
                } else {
                    ""
                }
            );
            self.regenerate();
        }

        // Sequential play carries on into the chained level
        if self.settings.use_sequential_levels && self.world.step.level_complete {
            self.world.step.done = false;
        }
        self.episode.episode_done = self.world.step.done;

        self.world.step
    }

    /// Start a new level and report its initial state.
    ///
    /// Uses the scheduled seed if one is pending, chains `seed + 997` after a
    /// completed level in sequential mode, and otherwise draws a fresh seed.
    pub fn reset(&mut self) -> StepData {
        self.regenerate();

        self.world.step.clear();
        if let Some(agent) = self.world.entities.agent() {
            let norm = self.world.normalize(agent.pos);
            self.world.step.agent_x = norm.x;
            self.world.step.agent_y = norm.y;
        }
        self.world.step
    }

    /// Generate the next level. The last step's results stay in place so the
    /// step that ended the episode can still be reported.
    fn regenerate(&mut self) {
        if let Some(settings) = self.pending.take() {
            log::info!("applying option patch");
            self.settings = settings;
        }

        self.episode.reset_count += 1;
        if self.episode.episodes_remaining == 0 {
            self.episode.current_level_seed =
                if self.settings.use_sequential_levels && self.world.step.level_complete {
                    self.episode
                        .current_level_seed
                        .wrapping_add(SEQUENTIAL_SEED_STEP)
                } else {
                    self.draw_level_seed()
                };
            self.episode.episodes_remaining = 1;
        }

        let seed = self.episode.current_level_seed;
        self.rng.seed_level(seed);

        let (width, height) = G::default_world_size(self.settings.distribution_mode);
        let size = self.settings.world_size(width, height);
        let mut level = LevelBuilder::new(&mut self.world, &mut self.rng, &self.settings);
        level.begin(size);
        self.game.generate(&mut level);

        self.episode.cur_time = 0;
        self.episode.total_reward = 0.0;
        self.episode.episodes_remaining -= 1;
        self.episode.action = self.episode.default_action;

        log::info!(
            "level {seed} generated ({}x{}, {} entities)",
            size.x,
            size.y,
            self.world.entities.len()
        );
    }

    fn draw_level_seed(&mut self) -> i32 {
        let low = self.settings.start_level;
        if self.settings.num_levels > 0 {
            let high = i64::from(low) + i64::from(self.settings.num_levels);
            let high = high.min(i64::from(i32::MAX)) as i32;
            self.level_seed_rng.next_range_i32(low, high)
        } else {
            self.level_seed_rng.next_range_i32(0, i32::MAX)
        }
    }

    /// Use `seed` for the next reset instead of drawing one.
    pub fn set_next_level_seed(&mut self, seed: i32) {
        self.episode.current_level_seed = seed;
        self.episode.episodes_remaining = 1;
    }

    /// Validate a set of option changes and queue them for the next reset.
    ///
    /// Patches stack: a second patch before the reset builds on the first.
    /// The level-seed generator is not reseeded by a new `rand_seed`.
    pub fn patch_options(&mut self, options: &Map<String, Value>) -> Result<(), ConfigError> {
        let mut next = self
            .pending
            .clone()
            .unwrap_or_else(|| self.settings.clone());
        next.apply_options(options)?;
        Self::check(&next)?;
        self.pending = Some(next);
        Ok(())
    }

    /// Encode the complete engine state.
    pub fn snapshot(&self) -> Result<Vec<u8>, SnapshotError> {
        snapshot::encode(
            G::NAME,
            &SnapshotRef {
                settings: &self.settings,
                pending: &self.pending,
                level_seed_rng: &self.level_seed_rng,
                rng: &self.rng,
                episode: &self.episode,
                world: &self.world,
                game: &self.game,
            },
        )
    }

    /// Replace the engine state with a snapshot. On error nothing changes.
    pub fn restore(&mut self, bytes: &[u8]) -> Result<(), SnapshotError> {
        let body: SnapshotBody<G> = snapshot::decode(G::NAME, bytes)?;
        Self::check(&body.settings)?;
        if let Some(pending) = &body.pending {
            Self::check(pending)?;
        }

        self.settings = body.settings;
        self.pending = body.pending;
        self.level_seed_rng = body.level_seed_rng;
        self.rng = body.rng;
        self.episode = body.episode;
        self.world = body.world;
        self.game = body.game;

        log::info!(
            "restored {} at level {}, tick {}",
            G::NAME,
            self.episode.current_level_seed,
            self.episode.cur_time
        );
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}
