use anyhow::Result;
use clap::Parser;
use paddock::{
    agents::tabular::{TabularAgent, TabularAlgorithm, TabularConfig},
    core::{
        evaluator::{DefaultEvaluator, EVAL_EPISODE_RETURN},
        record::BufferedRecorder,
        Env, Evaluator, MakeConfig, Schedule,
    },
    default_registry,
    tensorboard::TensorboardRecorder,
};
use serde_json::json;

const ENV_ID: &str = "FrozenLake-v1";
const TOTAL_TIMESTEPS: usize = 20_000;
const N_EPISODES_PER_EVAL: usize = 10;
const MODEL_DIR: &str = "./paddock/examples/model/tabular_frozen_lake";

/// Train tabular agent in FrozenLake environment
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Use SARSA instead of Q-learning
    #[arg(long, default_value_t = false)]
    sarsa: bool,

    /// Make the lake slippery
    #[arg(long, default_value_t = false)]
    slippery: bool,

    /// Write records into Tensorboard event files
    #[arg(long, default_value_t = false)]
    tensorboard: bool,
}

fn make_config(slippery: bool) -> MakeConfig {
    MakeConfig::default().kwarg("is_slippery", json!(slippery))
}

fn create_agent_config(algorithm: TabularAlgorithm) -> TabularConfig {
    TabularConfig::default()
        .algorithm(algorithm)
        .learning_rate(0.5)
        .gamma(0.95)
        .exploration(Schedule::Linear {
            start: 1.0,
            end: 0.05,
            end_fraction: 0.5,
        })
}

fn train(args: &Args, total_timesteps: usize, model_dir: &str) -> Result<f32> {
    let registry = default_registry()?;
    let algorithm = match args.sarsa {
        true => TabularAlgorithm::Sarsa,
        false => TabularAlgorithm::QLearning,
    };
    let mut env = registry.make(ENV_ID, &make_config(args.slippery))?;
    let mut agent = TabularAgent::build(
        create_agent_config(algorithm),
        env.observation_space(),
        env.action_space(),
    )?;

    match args.tensorboard {
        true => {
            let mut recorder = TensorboardRecorder::new(model_dir)?;
            agent.learn(env.as_mut(), total_timesteps, &mut recorder)?;
        }
        false => {
            let mut recorder = BufferedRecorder::new();
            agent.learn(env.as_mut(), total_timesteps, &mut recorder)?;
        }
    }
    agent.save(model_dir)?;

    let mut restored = TabularAgent::build(
        create_agent_config(algorithm),
        env.observation_space(),
        env.action_space(),
    )?;
    restored.load(model_dir)?;
    restored.eval();
    let record = DefaultEvaluator::new(
        registry.make(ENV_ID, &make_config(args.slippery))?,
        N_EPISODES_PER_EVAL,
        0,
    )?
    .evaluate(&mut restored)?;
    let episode_return = record.get_scalar(EVAL_EPISODE_RETURN)?;
    log::info!("Mean return: {}", episode_return);
    Ok(episode_return)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    std::fs::create_dir_all(MODEL_DIR)?;
    train(&args, TOTAL_TIMESTEPS, MODEL_DIR)?;
    Ok(())
}
