//! Engine configuration
//!
//! Settings are supplied once as a set of named options (a JSON object) and
//! stay fixed for the lifetime of an episode. Every option has a concrete
//! default, so an explicitly configured zero (for example a zero wall-hit
//! reward) is honoured as zero.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Level distribution / difficulty mode. Each environment accepts a subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DistributionMode {
    #[default]
    Easy,
    Hard,
    Extreme,
    Memory,
    Exploration,
}

impl DistributionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionMode::Easy => "easy",
            DistributionMode::Hard => "hard",
            DistributionMode::Extreme => "extreme",
            DistributionMode::Memory => "memory",
            DistributionMode::Exploration => "exploration",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(DistributionMode::Easy),
            "hard" => Some(DistributionMode::Hard),
            "extreme" => Some(DistributionMode::Extreme),
            "memory" => Some(DistributionMode::Memory),
            "exploration" => Some(DistributionMode::Exploration),
            _ => None,
        }
    }

    /// Mode for an integer code in an option map
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(DistributionMode::Easy),
            1 => Some(DistributionMode::Hard),
            2 => Some(DistributionMode::Extreme),
            10 => Some(DistributionMode::Memory),
            20 => Some(DistributionMode::Exploration),
            _ => None,
        }
    }
}

impl fmt::Display for DistributionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placement policy for good/bad objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LayoutMode {
    /// Uniform non-overlapping scatter over the play field
    #[default]
    Scattered,
    /// Fixed vertical lines
    Lines,
}

impl LayoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutMode::Scattered => "scattered",
            LayoutMode::Lines => "lines",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "scattered" | "random" => Some(LayoutMode::Scattered),
            "lines" | "line" => Some(LayoutMode::Lines),
            _ => None,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(LayoutMode::Scattered),
            1 => Some(LayoutMode::Lines),
            _ => None,
        }
    }
}

/// Reward magnitudes per outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rewards {
    /// Reaching the goal row
    pub completion: f32,
    /// Picking up a good object
    pub positive: f32,
    /// Picking up a bad object
    pub negative: f32,
    /// Running into a wall or locked door
    pub wall_hit: f32,
    /// Added every tick
    pub step: f32,
}

impl Default for Rewards {
    fn default() -> Self {
        Self {
            completion: 10.0,
            positive: 1.0,
            negative: -2.0,
            wall_hit: 0.0,
            step: 0.0,
        }
    }
}

/// Default episode length in ticks
pub const DEFAULT_TIMEOUT: u32 = 1000;

/// Largest accepted world width or height
pub const MAX_WORLD_SIDE: u32 = 1024;
/// Largest accepted wall row count
pub const MAX_WALLS: u32 = 256;
/// Largest accepted `min + range` for either object kind
pub const MAX_OBJECTS: u32 = 4096;

/// Full engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub distribution_mode: DistributionMode,

    // === World ===
    /// Overrides the environment's default width
    pub world_width: Option<u32>,
    /// Overrides the environment's default height
    pub world_height: Option<u32>,
    /// Episode length in ticks
    pub timeout: u32,

    // === Level seeds ===
    /// Seeds the level-seed generator (never the gameplay one)
    pub rand_seed: u64,
    pub start_level: i32,
    /// 0 = unbounded
    pub num_levels: u32,
    /// Completing a level chains to `seed + 997` instead of a fresh draw
    pub use_sequential_levels: bool,

    // === Walls ===
    /// Overrides the mode default; 0 disables walls
    pub num_walls: Option<u32>,
    /// Minimum gap width in percent of the world width; >= 100 disables walls
    pub wall_gap_pct: Option<u32>,
    /// Per-row door probability in percent
    pub door_prob_pct: Option<u32>,
    pub force_no_walls: bool,

    // === Objects ===
    pub num_good_min: u32,
    pub num_good_range: u32,
    pub num_bad_min: u32,
    pub num_bad_range: u32,
    /// Sprite variants for objects in easy mode
    pub food_diversity: u32,
    pub layout_mode: LayoutMode,
    pub good_line_x_pct: i32,
    pub bad_line_x_pct: i32,
    pub line_padding_pct: i32,

    pub rewards: Rewards,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            distribution_mode: DistributionMode::Easy,

            world_width: None,
            world_height: None,
            timeout: DEFAULT_TIMEOUT,

            rand_seed: 0,
            start_level: 0,
            num_levels: 0,
            use_sequential_levels: false,

            num_walls: None,
            wall_gap_pct: None,
            door_prob_pct: None,
            force_no_walls: false,

            num_good_min: 10,
            num_good_range: 10,
            num_bad_min: 10,
            num_bad_range: 10,
            food_diversity: 6,
            layout_mode: LayoutMode::Scattered,
            good_line_x_pct: 30,
            bad_line_x_pct: 70,
            line_padding_pct: 10,

            rewards: Rewards::default(),
        }
    }
}

impl Settings {
    /// Build settings from a named-option map on top of the defaults.
    pub fn from_options(options: &Map<String, Value>) -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        settings.apply_options(options)?;
        Ok(settings)
    }

    /// Parse a JSON object of named options.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(map) => Self::from_options(&map),
            _ => Err(ConfigError::NotAnObject),
        }
    }

    /// Apply every option in the map, stopping at the first bad one.
    pub fn apply_options(&mut self, options: &Map<String, Value>) -> Result<(), ConfigError> {
        for (key, value) in options {
            self.apply_option(key, value)?;
        }
        Ok(())
    }

    /// Apply a single named option.
    pub fn apply_option(&mut self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "distribution_mode" => self.distribution_mode = parse_mode(key, value)?,
            "world_width" => self.world_width = optional(value, |v| positive_u32(key, v))?,
            "world_height" => self.world_height = optional(value, |v| positive_u32(key, v))?,
            "timeout" => self.timeout = positive_u32(key, value)?,

            "rand_seed" => self.rand_seed = as_u64(key, value)?,
            "start_level" => self.start_level = as_i32(key, value)?,
            "num_levels" => self.num_levels = as_u32(key, value)?,
            "use_sequential_levels" => self.use_sequential_levels = as_bool(key, value)?,

            "num_walls" => self.num_walls = optional(value, |v| as_u32(key, v))?,
            "wall_gap_pct" => self.wall_gap_pct = optional(value, |v| as_u32(key, v))?,
            "door_prob_pct" => self.door_prob_pct = optional(value, |v| percent(key, v))?,
            "force_no_walls" => self.force_no_walls = as_bool(key, value)?,

            "num_good_min" => self.num_good_min = as_u32(key, value)?,
            "num_good_range" => self.num_good_range = as_u32(key, value)?,
            "num_bad_min" => self.num_bad_min = as_u32(key, value)?,
            "num_bad_range" => self.num_bad_range = as_u32(key, value)?,
            "food_diversity" => self.food_diversity = positive_u32(key, value)?,
            "layout_mode" => self.layout_mode = parse_layout(key, value)?,
            "good_line_x_pct" => self.good_line_x_pct = as_i32(key, value)?,
            "bad_line_x_pct" => self.bad_line_x_pct = as_i32(key, value)?,
            "line_padding_pct" => self.line_padding_pct = as_i32(key, value)?,

            "reward_completion" => self.rewards.completion = as_f32(key, value)?,
            "reward_positive" => self.rewards.positive = as_f32(key, value)?,
            "reward_negative" => self.rewards.negative = as_f32(key, value)?,
            "reward_wall_hit" => self.rewards.wall_hit = as_f32(key, value)?,
            "reward_step" => self.rewards.step = as_f32(key, value)?,

            _ => return Err(ConfigError::UnknownOption(key.to_string())),
        }
        Ok(())
    }

    /// Range checks for settings that did not come through `apply_option`
    /// (defaults edited in code, restored snapshots).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout == 0 {
            return Err(ConfigError::invalid("timeout", "must be at least 1"));
        }
        if self.food_diversity == 0 {
            return Err(ConfigError::invalid("food_diversity", "must be at least 1"));
        }
        if self.world_width == Some(0) {
            return Err(ConfigError::invalid("world_width", "must be at least 1"));
        }
        if self.world_height == Some(0) {
            return Err(ConfigError::invalid("world_height", "must be at least 1"));
        }
        if self.door_prob_pct.is_some_and(|p| p > 100) {
            return Err(ConfigError::invalid("door_prob_pct", "must be within 0..=100"));
        }
        for (key, side) in [("world_width", self.world_width), ("world_height", self.world_height)] {
            if side.is_some_and(|s| s > MAX_WORLD_SIDE) {
                return Err(ConfigError::invalid(key, format!("must be at most {MAX_WORLD_SIDE}")));
            }
        }
        if self.num_walls.is_some_and(|n| n > MAX_WALLS) {
            return Err(ConfigError::invalid("num_walls", format!("must be at most {MAX_WALLS}")));
        }
        let counts = [
            ("num_good_range", self.num_good_min, self.num_good_range),
            ("num_bad_range", self.num_bad_min, self.num_bad_range),
        ];
        for (key, min, range) in counts {
            if min.saturating_add(range) > MAX_OBJECTS {
                return Err(ConfigError::invalid(
                    key,
                    format!("min + range must be at most {MAX_OBJECTS}"),
                ));
            }
        }
        let rewards = [
            ("reward_completion", self.rewards.completion),
            ("reward_positive", self.rewards.positive),
            ("reward_negative", self.rewards.negative),
            ("reward_wall_hit", self.rewards.wall_hit),
            ("reward_step", self.rewards.step),
        ];
        for (key, value) in rewards {
            if !value.is_finite() {
                return Err(ConfigError::invalid(key, "must be finite"));
            }
        }
        Ok(())
    }

    /// World size after applying overrides to the environment default
    pub fn world_size(&self, default_width: u32, default_height: u32) -> Vec2 {
        Vec2::new(
            self.world_width.unwrap_or(default_width) as f32,
            self.world_height.unwrap_or(default_height) as f32,
        )
    }
}

fn optional<T>(
    value: &Value,
    parse: impl FnOnce(&Value) -> Result<T, ConfigError>,
) -> Result<Option<T>, ConfigError> {
    if value.is_null() {
        Ok(None)
    } else {
        parse(value).map(Some)
    }
}

fn as_bool(key: &str, value: &Value) -> Result<bool, ConfigError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(ConfigError::invalid(key, "expected a boolean")),
        },
        _ => Err(ConfigError::invalid(key, "expected a boolean")),
    }
}

fn as_i64(key: &str, value: &Value) -> Result<i64, ConfigError> {
    value
        .as_i64()
        .ok_or_else(|| ConfigError::invalid(key, format!("expected an integer, got {value}")))
}

fn as_i32(key: &str, value: &Value) -> Result<i32, ConfigError> {
    i32::try_from(as_i64(key, value)?).map_err(|_| ConfigError::invalid(key, "out of range"))
}

fn as_u32(key: &str, value: &Value) -> Result<u32, ConfigError> {
    u32::try_from(as_i64(key, value)?)
        .map_err(|_| ConfigError::invalid(key, "expected a non-negative integer"))
}

fn as_u64(key: &str, value: &Value) -> Result<u64, ConfigError> {
    value
        .as_u64()
        .ok_or_else(|| ConfigError::invalid(key, "expected a non-negative integer"))
}

fn positive_u32(key: &str, value: &Value) -> Result<u32, ConfigError> {
    match as_u32(key, value)? {
        0 => Err(ConfigError::invalid(key, "must be at least 1")),
        v => Ok(v),
    }
}

fn percent(key: &str, value: &Value) -> Result<u32, ConfigError> {
    match as_u32(key, value)? {
        v if v <= 100 => Ok(v),
        _ => Err(ConfigError::invalid(key, "must be within 0..=100")),
    }
}

fn as_f32(key: &str, value: &Value) -> Result<f32, ConfigError> {
    let v = value
        .as_f64()
        .ok_or_else(|| ConfigError::invalid(key, format!("expected a number, got {value}")))?;
    if !v.is_finite() {
        return Err(ConfigError::invalid(key, "must be finite"));
    }
    Ok(v as f32)
}

fn parse_mode(key: &str, value: &Value) -> Result<DistributionMode, ConfigError> {
    let mode = match value {
        Value::String(s) => DistributionMode::from_str(s),
        Value::Number(n) => n.as_i64().and_then(DistributionMode::from_code),
        _ => None,
    };
    mode.ok_or_else(|| ConfigError::invalid(key, format!("unknown distribution mode {value}")))
}

fn parse_layout(key: &str, value: &Value) -> Result<LayoutMode, ConfigError> {
    let mode = match value {
        Value::String(s) => LayoutMode::from_str(s),
        Value::Number(n) => n.as_i64().and_then(LayoutMode::from_code),
        _ => None,
    };
    mode.ok_or_else(|| ConfigError::invalid(key, format!("unknown layout mode {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test options must be an object"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.timeout, DEFAULT_TIMEOUT);
        assert_eq!(settings.layout_mode, LayoutMode::Scattered);
    }

    #[test]
    fn parses_named_options() {
        let settings = Settings::from_options(&options(json!({
            "distribution_mode": "hard",
            "num_walls": 3,
            "wall_gap_pct": 50,
            "layout_mode": 1,
            "reward_positive": 2.5,
            "use_sequential_levels": true,
            "world_width": 12,
        })))
        .unwrap();

        assert_eq!(settings.distribution_mode, DistributionMode::Hard);
        assert_eq!(settings.num_walls, Some(3));
        assert_eq!(settings.wall_gap_pct, Some(50));
        assert_eq!(settings.layout_mode, LayoutMode::Lines);
        assert_eq!(settings.rewards.positive, 2.5);
        assert!(settings.use_sequential_levels);
        assert_eq!(settings.world_size(10, 20), Vec2::new(12.0, 20.0));
    }

    #[test]
    fn mode_accepts_integer_codes() {
        let settings = Settings::from_json(r#"{"distribution_mode": 10}"#).unwrap();
        assert_eq!(settings.distribution_mode, DistributionMode::Memory);
    }

    #[test]
    fn unknown_option_is_rejected() {
        let err = Settings::from_json(r#"{"num_wals": 3}"#).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOption(ref k) if k == "num_wals"));
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(matches!(
            Settings::from_json(r#"{"num_walls": "many"}"#),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            Settings::from_json(r#"{"distribution_mode": "nightmare"}"#),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            Settings::from_json(r#"{"timeout": 0}"#),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            Settings::from_json(r#"{"door_prob_pct": 150}"#),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            Settings::from_json("[1, 2]"),
            Err(ConfigError::NotAnObject)
        ));
    }

    #[test]
    fn oversized_levels_are_rejected() {
        let settings = Settings::from_json(r#"{"num_good_min": 4294967295, "num_good_range": 2}"#).unwrap();
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "num_good_range"
        ));

        let settings = Settings::from_json(r#"{"num_walls": 100000}"#).unwrap();
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "num_walls"
        ));

        let settings = Settings::from_json(r#"{"world_height": 5000}"#).unwrap();
        assert!(settings.validate().is_err());

        let settings = Settings::from_json(
            r#"{"world_width": 1024, "world_height": 1024, "num_walls": 256, "num_bad_min": 4000, "num_bad_range": 96}"#,
        )
        .unwrap();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn explicit_zero_reward_is_kept() {
        let settings = Settings::from_json(r#"{"reward_completion": 0}"#).unwrap();
        assert_eq!(settings.rewards.completion, 0.0);
    }

    #[test]
    fn null_clears_override() {
        let mut settings = Settings::from_json(r#"{"num_walls": 4}"#).unwrap();
        settings.apply_option("num_walls", &Value::Null).unwrap();
        assert_eq!(settings.num_walls, None);
    }
}
