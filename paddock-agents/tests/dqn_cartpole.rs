use anyhow::Result;
use paddock_agents::{
    dqn::{Dqn, DqnConfig, EpsilonGreedy},
    linear::{LinearQ, LinearQConfig},
    opt::OptimizerConfig,
    util::CriticLoss,
};
use paddock_core::{
    evaluator::{DefaultEvaluator, EVAL_EPISODE_LENGTH},
    record::BufferedRecorder,
    replay_buffer::{ReplayBuffer, ReplayBufferConfig},
    vector::{SyncVecEnv, VecEnv},
    Agent, Evaluator, MakeConfig, Policy, Registry, Schedule, Trainer, TrainerConfig,
};
use tempdir::TempDir;
use test_log::test;

const N_ENVS: usize = 2;
const TOTAL_TIMESTEPS: usize = 2000;
const LEARNING_STARTS: usize = 200;
const BATCH_SIZE: usize = 32;
const REPLAY_BUFFER_CAPACITY: usize = 1000;
const SAVE_INTERVAL: usize = 1000;
const EVAL_INTERVAL: usize = 500;
const N_EPISODES_PER_EVAL: usize = 2;

fn registry() -> Result<Registry> {
    let mut registry = Registry::new();
    paddock_envs::register_envs(&mut registry)?;
    Ok(registry)
}

fn create_venv(registry: &Registry) -> Result<SyncVecEnv> {
    let envs = (0..N_ENVS)
        .map(|_| registry.make("CartPole-v1", &MakeConfig::default()))
        .collect::<Result<Vec<_>>>()?;
    SyncVecEnv::new(envs)
}

fn create_agent(venv: &SyncVecEnv) -> Result<Dqn<LinearQ>> {
    let config = DqnConfig::default()
        .model_config(LinearQConfig::default().opt_config(OptimizerConfig::Sgd { lr: 1e-3 }))
        .learning_rate(Schedule::Linear {
            start: 1e-3,
            end: 1e-4,
            end_fraction: 1.0,
        })
        .batch_size(BATCH_SIZE)
        .target_update_interval(100)
        .explorer(EpsilonGreedy::with_exploration_fraction(0.5))
        .critic_loss(CriticLoss::SmoothL1);
    Dqn::build(
        config,
        venv.single_observation_space(),
        venv.single_action_space(),
    )
}

#[test]
fn test_dqn_cartpole() -> Result<()> {
    let registry = registry()?;
    let venv = create_venv(&registry)?;
    let mut agent = create_agent(&venv)?;
    let model_dir = TempDir::new("dqn_cartpole")?;
    let config = TrainerConfig::default()
        .learning_starts(LEARNING_STARTS)
        .eval_interval(EVAL_INTERVAL)
        .save_interval(SAVE_INTERVAL)
        .model_dir(model_dir.path().to_string_lossy())
        .flush_record_interval(500)
        .seed(42);
    let mut trainer = Trainer::build(
        config,
        ReplayBufferConfig::default().capacity(REPLAY_BUFFER_CAPACITY),
    )
    .with_env(Box::new(venv));
    let mut evaluator = DefaultEvaluator::new(
        registry.make("CartPole-v1", &MakeConfig::default())?,
        N_EPISODES_PER_EVAL,
        0,
    )?;
    let mut recorder = BufferedRecorder::new();

    trainer.learn(&mut agent, TOTAL_TIMESTEPS, &mut recorder, &mut evaluator)?;

    assert_eq!(trainer.num_timesteps(), TOTAL_TIMESTEPS);
    assert!(trainer.num_episodes() > 0);
    assert_eq!(
        agent.n_grad_steps(),
        (TOTAL_TIMESTEPS - LEARNING_STARTS) / N_ENVS + 1
    );
    assert_eq!(agent.exploration_rate(), Some(0.05));
    assert_eq!(recorder.len(), TOTAL_TIMESTEPS / 500);
    assert!(recorder.iter().all(|r| r.get_scalar("step").is_ok()));

    // Checkpoints at 1000 and 2000 timesteps.
    let dir = model_dir.path().join("2000");
    let mut restored = create_agent(&create_venv(&registry)?)?;
    let meta = trainer.load_checkpoint(&dir, &mut restored)?;
    assert_eq!(meta.algorithm_kind, "dqn");
    assert_eq!(meta.num_timesteps, TOTAL_TIMESTEPS);
    assert!(model_dir.path().join("1000").join("metadata.json").exists());

    let obs = trainer
        .env_mut()
        .unwrap()
        .reset(Some(1), None)?
        .0;
    assert_eq!(agent.q_values(&obs)?, restored.q_values(&obs)?);

    Agent::<ReplayBuffer>::eval(&mut restored);
    assert_eq!(restored.sample(&obs)?.len(), N_ENVS);
    let record = evaluator.evaluate(&mut restored)?;
    assert!(record.get_scalar(EVAL_EPISODE_LENGTH)? >= 8.0);
    Ok(())
}
