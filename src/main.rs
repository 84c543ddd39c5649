//! Headless runner: drives a FruitBot engine with a scripted policy.
//!
//! Usage:
//!   fruitbot-sim --steps 2000 --policy random --set rand_seed=7
//!   fruitbot-sim --options opts.json --save run.snap
//!   RUST_LOG=debug fruitbot-sim --load run.snap --steps 100

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use serde_json::{Map, Value};

use fruitbot_sim::sim::GameRng;
use fruitbot_sim::sim::tick::NUM_ACTIONS;
use fruitbot_sim::{Action, Engine, FruitBot, Settings};

#[derive(Parser)]
#[command(name = "fruitbot-sim")]
#[command(about = "Run FruitBot episodes headlessly")]
struct Args {
    /// JSON file with named options
    #[arg(long)]
    options: Option<PathBuf>,

    /// Option override, `key=value` (value parsed as JSON, else a string)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Ticks to run
    #[arg(long, default_value_t = 1000)]
    steps: u64,

    #[arg(long, value_enum, default_value_t = Policy::Random)]
    policy: Policy,

    /// Seed for the random policy
    #[arg(long, default_value_t = 0)]
    policy_seed: u64,

    /// Write a snapshot after the run
    #[arg(long)]
    save: Option<PathBuf>,

    /// Restore a snapshot before the run
    #[arg(long)]
    load: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Policy {
    /// Always the neutral action
    Stay,
    /// Uniform over all action codes
    Random,
    /// Sweep left and right, firing in between
    Sweep,
}

impl Policy {
    fn act(self, tick: u64, rng: &mut GameRng) -> Action {
        match self {
            Policy::Stay => Action::STAY,
            Policy::Random => Action(rng.next_int(NUM_ACTIONS as u32) as i32),
            Policy::Sweep => match tick % 24 {
                0..10 => Action::LEFT,
                10..12 => Action::FIRE,
                12..22 => Action::RIGHT,
                _ => Action::FIRE,
            },
        }
    }
}

fn parse_override(pair: &str) -> Result<(String, Value)> {
    let (key, raw) = pair
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got `{pair}`"))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.trim().to_string(), value))
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut options = Map::new();
    if let Some(path) = &args.options {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read options file {}", path.display()))?;
        match serde_json::from_str::<Value>(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?
        {
            Value::Object(map) => options.extend(map),
            _ => return Err(anyhow!("{} must contain a JSON object", path.display())),
        }
    }
    for pair in &args.set {
        let (key, value) = parse_override(pair)?;
        options.insert(key, value);
    }
    Ok(Settings::from_options(&options)?)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = load_settings(&args)?;
    let mut engine = Engine::<FruitBot>::new(settings)?;

    if let Some(path) = &args.load {
        let bytes =
            fs::read(path).with_context(|| format!("failed to read snapshot {}", path.display()))?;
        engine
            .restore(&bytes)
            .with_context(|| format!("failed to restore {}", path.display()))?;
    }

    let mut policy_rng = GameRng::new(args.policy_seed);
    let mut episodes = 0u64;
    let mut completed = 0u64;
    let mut total_reward = 0.0f64;

    for tick in 0..args.steps {
        let action = args.policy.act(tick, &mut policy_rng);
        let step = engine.step(action);
        total_reward += f64::from(step.reward);
        if step.level_complete {
            completed += 1;
        }
        if step.done {
            episodes += 1;
        }
    }

    log::info!(
        "{} ticks, {episodes} episodes finished, {completed} levels completed, reward {total_reward:.2}",
        args.steps
    );

    if let Some(path) = &args.save {
        let bytes = engine.snapshot()?;
        fs::write(path, &bytes)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
        log::info!("saved {} bytes to {}", bytes.len(), path.display());
    }

    Ok(())
}
