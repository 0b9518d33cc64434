use anyhow::Result;
use clap::Parser;
use paddock::{
    agents::{
        dqn::{Dqn, DqnConfig, EpsilonGreedy},
        linear::{LinearQ, LinearQConfig},
        opt::OptimizerConfig,
        util::CriticLoss,
    },
    core::{
        evaluator::{DefaultEvaluator, EVAL_EPISODE_RETURN},
        replay_buffer::{ReplayBuffer, ReplayBufferConfig},
        vector::{SyncVecEnv, VecEnv},
        Agent, Env, Evaluator, MakeConfig, Registry, Schedule, Trainer, TrainerConfig,
    },
    default_registry,
    tensorboard::TensorboardRecorder,
};
use serde::Serialize;

const ENV_ID: &str = "CartPole-v1";
const N_ENVS: usize = 4;
const LR: f64 = 1e-3;
const BATCH_SIZE: usize = 64;
const LEARNING_STARTS: usize = 1000;
const TARGET_UPDATE_INTERVAL: usize = 250;
const TOTAL_TIMESTEPS: usize = 50_000;
const EVAL_INTERVAL: usize = 5000;
const REPLAY_BUFFER_CAPACITY: usize = 10_000;
const N_EPISODES_PER_EVAL: usize = 5;
const MODEL_DIR: &str = "./paddock/examples/model/dqn_cartpole";

#[derive(Serialize)]
struct DqnCartpoleConfig {
    agent_config: DqnConfig<LinearQConfig>,
    trainer_config: TrainerConfig,
    replay_buffer_config: ReplayBufferConfig,
}

impl DqnCartpoleConfig {
    fn new(total_timesteps: usize, model_dir: &str, eval_interval: usize) -> Self {
        let agent_config = create_agent_config();
        let trainer_config = TrainerConfig::default()
            .learning_starts(LEARNING_STARTS.min(total_timesteps / 2))
            .eval_interval(eval_interval)
            .save_interval(total_timesteps)
            .flush_record_interval(eval_interval)
            .model_dir(model_dir)
            .seed(42);
        let replay_buffer_config = ReplayBufferConfig::default().capacity(REPLAY_BUFFER_CAPACITY);
        Self {
            agent_config,
            trainer_config,
            replay_buffer_config,
        }
    }
}

fn create_agent_config() -> DqnConfig<LinearQConfig> {
    DqnConfig::default()
        .model_config(LinearQConfig::default().opt_config(OptimizerConfig::Sgd { lr: LR }))
        .learning_rate(Schedule::Linear {
            start: LR,
            end: LR * 0.1,
            end_fraction: 1.0,
        })
        .batch_size(BATCH_SIZE)
        .target_update_interval(TARGET_UPDATE_INTERVAL)
        .explorer(EpsilonGreedy::with_exploration_fraction(0.3))
        .critic_loss(CriticLoss::SmoothL1)
}

fn create_venv(registry: &Registry) -> Result<SyncVecEnv> {
    let envs = (0..N_ENVS)
        .map(|_| registry.make(ENV_ID, &MakeConfig::default()))
        .collect::<Result<Vec<_>>>()?;
    SyncVecEnv::new(envs)
}

/// Train/eval DQN agent in cartpole environment
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Train DQN agent, not evaluate
    #[arg(short, long, default_value_t = false)]
    train: bool,

    /// Evaluate DQN agent, not train
    #[arg(short, long, default_value_t = false)]
    eval: bool,
}

fn train(total_timesteps: usize, model_dir: &str, eval_interval: usize) -> Result<()> {
    let registry = default_registry()?;
    let config = DqnCartpoleConfig::new(total_timesteps, model_dir, eval_interval);
    log::info!("{}", serde_yaml::to_string(&config)?);

    let venv = create_venv(&registry)?;
    let mut agent: Dqn<LinearQ> = Dqn::build(
        config.agent_config,
        venv.single_observation_space(),
        venv.single_action_space(),
    )?;
    let mut recorder = TensorboardRecorder::new(model_dir)?;
    let mut evaluator = DefaultEvaluator::new(
        registry.make(ENV_ID, &MakeConfig::default())?,
        N_EPISODES_PER_EVAL,
        0,
    )?;
    let mut trainer = Trainer::build(config.trainer_config, config.replay_buffer_config)
        .with_env(Box::new(venv));

    trainer.learn(&mut agent, total_timesteps, &mut recorder, &mut evaluator)?;
    Ok(())
}

fn eval(model_dir: &str, total_timesteps: usize) -> Result<f32> {
    let registry = default_registry()?;
    let mut trainer = Trainer::build(TrainerConfig::default(), ReplayBufferConfig::default());
    let mut agent = {
        let env = registry.make(ENV_ID, &MakeConfig::default())?;
        let mut agent: Dqn<LinearQ> = Dqn::build(
            create_agent_config(),
            env.observation_space(),
            env.action_space(),
        )?;
        let dir = std::path::Path::new(model_dir).join(total_timesteps.to_string());
        trainer.load_checkpoint(dir, &mut agent)?;
        Agent::<ReplayBuffer>::eval(&mut agent);
        agent
    };

    let record = DefaultEvaluator::new(
        registry.make(ENV_ID, &MakeConfig::default())?,
        N_EPISODES_PER_EVAL,
        1,
    )?
    .evaluate(&mut agent)?;
    let episode_return = record.get_scalar(EVAL_EPISODE_RETURN)?;
    log::info!("Mean return: {}", episode_return);
    Ok(episode_return)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.train {
        train(TOTAL_TIMESTEPS, MODEL_DIR, EVAL_INTERVAL)?;
    } else if args.eval {
        eval(MODEL_DIR, TOTAL_TIMESTEPS)?;
    } else {
        train(TOTAL_TIMESTEPS, MODEL_DIR, EVAL_INTERVAL)?;
        eval(MODEL_DIR, TOTAL_TIMESTEPS)?;
    }

    Ok(())
}
