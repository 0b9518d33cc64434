use anyhow::Result;
use paddock::{
    agents::{
        dqn::{Dqn, DqnConfig},
        linear::{LinearQ, LinearQConfig},
        tabular::{TabularAgent, TabularConfig},
    },
    core::{
        dummy::DummyEnv,
        error::PaddockError,
        record::BufferedRecorder,
        registry::EnvSpec,
        replay_buffer::ReplayBufferConfig,
        vector::{SyncVecEnv, VecEnv},
        wrapper::{EPISODE_LENGTH, EPISODE_RETURN},
        Env, MakeConfig, Registry, Trainer, TrainerConfig, Value,
    },
    default_registry,
};
use serde_json::json;
use tempdir::TempDir;
use test_log::test;

fn registry_with_dummy() -> Result<Registry> {
    let mut registry = default_registry()?;
    registry.register(
        EnvSpec::new("Dummy-v0")?
            .entry_point(|kwargs| {
                let n = kwargs.get("episode_length").and_then(|v| v.as_u64());
                Ok(Box::new(DummyEnv::new(n.map(|n| n as usize))?) as Box<dyn Env>)
            })
            .kwarg("episode_length", json!(3))
            .max_episode_steps(10),
    );
    Ok(registry)
}

#[test]
fn test_dummy_episode_statistics() -> Result<()> {
    let registry = registry_with_dummy()?;
    let config = MakeConfig::default().record_episode_statistics(true);
    let mut env = registry.make("Dummy-v0", &config)?;
    env.reset(Some(0), None)?;

    let mut steps = vec![];
    loop {
        let step = env.step(&Value::Discrete(0))?;
        let done = step.is_done();
        steps.push(step);
        if done {
            break;
        }
    }
    assert_eq!(steps.len(), 3);
    let last = &steps[2];
    assert!(last.is_terminated && !last.is_truncated);
    assert_eq!(last.info.get_scalar(EPISODE_RETURN)?, 3.0);
    assert_eq!(last.info.get_scalar(EPISODE_LENGTH)?, 3.0);
    assert!(steps[..2].iter().all(|s| !s.info.contains_key(EPISODE_RETURN)));
    Ok(())
}

#[test]
fn test_dummy_time_limit() -> Result<()> {
    let registry = registry_with_dummy()?;
    let config = MakeConfig::default().kwarg("episode_length", json!(null));
    let mut env = registry.make("Dummy-v0", &config)?;
    env.reset(Some(0), None)?;
    for t in 1..=10 {
        let step = env.step(&Value::Discrete(1))?;
        assert!(!step.is_terminated);
        assert_eq!(step.is_truncated, t == 10);
    }
    Ok(())
}

#[test]
fn test_vector_autoreset() -> Result<()> {
    let registry = registry_with_dummy()?;
    let envs = (0..2)
        .map(|_| registry.make("Dummy-v0", &MakeConfig::default()))
        .collect::<Result<Vec<_>>>()?;
    let mut venv = SyncVecEnv::new(envs)?;
    venv.reset(Some(0), None)?;
    let acts = vec![Value::Discrete(0); 2];

    for _ in 0..2 {
        let step = venv.step(&acts)?;
        assert!((0..2).all(|i| !step.is_done(i)));
    }
    let step = venv.step(&acts)?;
    assert!((0..2).all(|i| step.is_done(i)));
    assert_eq!(step.final_obs[0], Some(Value::Discrete(3)));

    // Finished slots are reset before the next action is applied.
    let step = venv.step(&acts)?;
    assert!((0..2).all(|i| !step.is_done(i)));
    assert_eq!(step.obs, vec![Value::Discrete(1); 2]);
    Ok(())
}

#[test]
fn test_checkpoint_of_other_algorithm() -> Result<()> {
    let registry = default_registry()?;
    let dir = TempDir::new("checkpoint_of_other_algorithm")?;

    let mut lake = registry.make("FrozenLake-v1", &MakeConfig::default())?;
    let mut tabular =
        TabularAgent::build(TabularConfig::default(), lake.observation_space(), lake.action_space())?;
    tabular.learn(lake.as_mut(), 100, &mut BufferedRecorder::new())?;
    tabular.save(dir.path())?;

    let cartpole = registry.make("CartPole-v1", &MakeConfig::default())?;
    let mut dqn: Dqn<LinearQ> = Dqn::build(
        DqnConfig::<LinearQConfig>::default(),
        cartpole.observation_space(),
        cartpole.action_space(),
    )?;
    let mut trainer = Trainer::build(TrainerConfig::default(), ReplayBufferConfig::default());
    let err = trainer
        .load_checkpoint(dir.path(), &mut dqn)
        .expect_err("a tabular checkpoint must not load into DQN");
    match err.downcast_ref::<PaddockError>() {
        Some(PaddockError::AlgorithmMismatch { expected, found }) => {
            assert_eq!(expected, "dqn");
            assert_eq!(found, "q_learning");
        }
        _ => panic!("unexpected error: {}", err),
    }

    let empty = TempDir::new("empty_checkpoint")?;
    let err = trainer
        .load_checkpoint(empty.path(), &mut dqn)
        .expect_err("an empty directory holds no checkpoint");
    assert!(matches!(
        err.downcast_ref::<PaddockError>(),
        Some(PaddockError::MissingArtifact(_))
    ));
    Ok(())
}

#[test]
fn test_make_unknown_id() -> Result<()> {
    let registry = default_registry()?;
    assert!(registry.make("CartPole-v0", &MakeConfig::default()).is_err());
    assert!(registry.make("Acrobot-v1", &MakeConfig::default()).is_err());
    Ok(())
}
