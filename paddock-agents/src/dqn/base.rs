//! DQN agent.
use super::{config::DqnConfig, model::QModel};
use crate::{
    model::ParamStore,
    util::{argmax, features, features_of_rows, track},
};
use anyhow::Result;
use log::{debug, info};
use paddock_core::{
    checkpoint::artifact,
    error::PaddockError,
    record::{Record, RecordValue},
    replay_buffer::{ArrayBatch, ReplayBatch},
    Agent, ExperienceBufferBase, Policy, ReplayBufferBase, Schedule, Space, Value,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter},
    path::Path,
};

/// File name of the parameters of the online network in a checkpoint.
pub const QNET_FILE: &str = "qnet.json";

/// File name of the parameters of the target network in a checkpoint.
pub const QNET_TGT_FILE: &str = "qnet_tgt.json";

/// File name of the update counters in a checkpoint.
pub const DQN_STATE_FILE: &str = "dqn_state.json";

#[derive(Serialize, Deserialize)]
struct DqnState {
    n_grad_steps: usize,
    n_target_updates: usize,
}

#[allow(clippy::upper_case_acronyms)]
/// DQN agent for discrete action spaces.
///
/// Observations of any space supported by [`Space::flatten`] are one-hot/flattened
/// before they are given to the [`QModel`].
pub struct Dqn<Q: QModel> {
    config: DqnConfig<Q::Config>,
    qnet: Q,
    qnet_tgt: Q,
    obs_space: Space,
    n_actions: usize,
    act_start: i64,
    train: bool,
    progress_remaining: f64,
    n_grad_steps: usize,
    n_target_updates: usize,
    rng: StdRng,
}

impl<Q: QModel> Dqn<Q> {
    /// Constructs DQN agent for the given spaces.
    ///
    /// The action space must be [`Space::Discrete`].
    pub fn build(config: DqnConfig<Q::Config>, obs_space: &Space, act_space: &Space) -> Result<Self> {
        let act = act_space.as_discrete().ok_or_else(|| {
            PaddockError::InvalidConfig(format!(
                "DQN requires a discrete action space, got {:?}",
                act_space
            ))
        })?;
        if config.batch_size == 0 || config.target_update_interval == 0 {
            return Err(PaddockError::InvalidConfig(
                "batch_size and target_update_interval must be positive".into(),
            )
            .into());
        }
        if !(0.0..=1.0).contains(&config.tau) {
            return Err(PaddockError::InvalidConfig(format!("tau = {} not in [0, 1]", config.tau)).into());
        }

        let in_dim = obs_space.flat_dim();
        let mut qnet = Q::build(&config.model_config, in_dim, act.n())?;
        let mut qnet_tgt = Q::build(&config.model_config, in_dim, act.n())?;
        qnet_tgt.set_params(&qnet.params())?;
        let lr = config.learning_rate.value(1.0);
        qnet.set_learning_rate(lr);
        qnet_tgt.set_learning_rate(lr);
        debug!("Built DQN with {} inputs and {} actions", in_dim, act.n());

        Ok(Self {
            qnet,
            qnet_tgt,
            obs_space: obs_space.clone(),
            n_actions: act.n(),
            act_start: act.start(),
            train: false,
            progress_remaining: 1.0,
            n_grad_steps: 0,
            n_target_updates: 0,
            rng: StdRng::seed_from_u64(config.seed),
            config,
        })
    }

    /// The online action-value function.
    pub fn qnet(&self) -> &Q {
        &self.qnet
    }

    /// The target action-value function.
    pub fn qnet_tgt(&self) -> &Q {
        &self.qnet_tgt
    }

    /// Gradient steps taken so far.
    pub fn n_grad_steps(&self) -> usize {
        self.n_grad_steps
    }

    /// Action values of `obs`, one row per observation.
    pub fn q_values(&self, obs: &[Value]) -> Result<ArrayBatch> {
        self.qnet.forward(&features(&self.obs_space, obs)?)
    }

    /// Current exploration rate, `None` for a softmax explorer.
    pub fn exploration_rate(&self) -> Option<f64> {
        self.config
            .explorer
            .exploration_rate(self.progress_remaining)
    }

    fn action_indices(&self, act: &ArrayBatch) -> Result<Vec<usize>> {
        act.data
            .iter()
            .map(|&a| {
                let ix = a.round() as i64 - self.act_start;
                match ix >= 0 && (ix as usize) < self.n_actions {
                    true => Ok(ix as usize),
                    false => Err(PaddockError::InvalidAction(format!("{} in a batch", a)).into()),
                }
            })
            .collect()
    }

    fn update_critic(&mut self, batch: ReplayBatch) -> Result<f32> {
        let obs = features_of_rows(&self.obs_space, &batch.obs)?;
        let next_obs = features_of_rows(&self.obs_space, &batch.next_obs)?;
        let act = self.action_indices(&batch.act)?;

        let q_tgt = self.qnet_tgt.forward(&next_obs)?;
        let q_next: Vec<f32> = match self.config.double_dqn {
            true => {
                let q_online = self.qnet.forward(&next_obs)?;
                (0..q_tgt.len())
                    .map(|i| q_tgt.row(i)[argmax(q_online.row(i))])
                    .collect()
            }
            false => (0..q_tgt.len())
                .map(|i| q_tgt.row(i)[argmax(q_tgt.row(i))])
                .collect(),
        };
        let gamma = self.config.gamma as f32;
        let target = batch
            .reward
            .iter()
            .zip(batch.done.iter())
            .zip(q_next.iter())
            .map(|((r, d), q)| r + gamma * (1.0 - d) * q)
            .collect::<Vec<_>>();

        self.qnet
            .backward_step(&obs, &act, &target, self.config.critic_loss)
    }

    fn update_target(&mut self) -> Result<()> {
        let mut params = self.qnet_tgt.params();
        track(&mut params, &self.qnet.params(), self.config.tau)?;
        self.qnet_tgt.set_params(&params)?;
        self.n_target_updates += 1;
        Ok(())
    }
}

impl<Q: QModel> Policy for Dqn<Q> {
    /// In training mode actions come from the explorer. In evaluation mode the greedy
    /// action is taken, or a random one with probability `eval_epsilon`.
    fn sample(&mut self, obs: &[Value]) -> Result<Vec<Value>> {
        let q = self.q_values(obs)?;
        let mut acts = Vec::with_capacity(q.len());
        for i in 0..q.len() {
            let ix = match self.train {
                true => {
                    self.config
                        .explorer
                        .action(q.row(i), self.progress_remaining, &mut self.rng)?
                }
                false if self.rng.gen::<f64>() < self.config.eval_epsilon => {
                    self.rng.gen_range(0..self.n_actions)
                }
                false => argmax(q.row(i)),
            };
            acts.push(Value::Discrete(self.act_start + ix as i64));
        }
        Ok(acts)
    }
}

impl<Q, R> Agent<R> for Dqn<Q>
where
    Q: QModel,
    R: ExperienceBufferBase + ReplayBufferBase<Batch = ReplayBatch>,
{
    fn kind(&self) -> &str {
        "dqn"
    }

    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn on_step(&mut self, progress_remaining: f64) {
        self.progress_remaining = progress_remaining;
        self.qnet
            .set_learning_rate(self.config.learning_rate.value(progress_remaining));
    }

    fn opt(&mut self, buffer: &mut R, gradient_steps: usize) -> Result<Option<Record>> {
        if gradient_steps == 0 || buffer.len() < self.config.min_transitions_warmup.max(1) {
            return Ok(None);
        }

        let mut loss = 0f32;
        for _ in 0..gradient_steps {
            let batch = buffer.batch(self.config.batch_size)?;
            loss += self.update_critic(batch)?;
            self.n_grad_steps += 1;
            if self.n_grad_steps % self.config.target_update_interval == 0 {
                self.update_target()?;
            }
        }

        let mut record = Record::from_scalar("loss", loss / gradient_steps as f32);
        record.insert(
            "learning_rate",
            RecordValue::Scalar(self.config.learning_rate.value(self.progress_remaining) as f32),
        );
        if let Some(eps) = self.exploration_rate() {
            record.insert("exploration_rate", RecordValue::Scalar(eps as f32));
        }
        record.insert(
            "n_target_updates",
            RecordValue::Scalar(self.n_target_updates as f32),
        );
        Ok(Some(record))
    }

    fn learning_rate(&self) -> &Schedule {
        &self.config.learning_rate
    }

    fn hyperparams(&self) -> serde_json::Value {
        json!({
            "batch_size": self.config.batch_size,
            "gamma": self.config.gamma,
            "tau": self.config.tau,
            "target_update_interval": self.config.target_update_interval,
            "double_dqn": self.config.double_dqn,
            "min_transitions_warmup": self.config.min_transitions_warmup,
            "n_actions": self.n_actions,
        })
    }

    fn save_params(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        self.qnet.save(&dir.join(QNET_FILE))?;
        self.qnet_tgt.save(&dir.join(QNET_TGT_FILE))?;
        let state = DqnState {
            n_grad_steps: self.n_grad_steps,
            n_target_updates: self.n_target_updates,
        };
        serde_json::to_writer(BufWriter::new(File::create(dir.join(DQN_STATE_FILE))?), &state)?;
        info!("Save DQN parameters into {}", dir.display());
        Ok(())
    }

    fn load_params(&mut self, dir: &Path) -> Result<()> {
        self.qnet.load(&artifact(dir, QNET_FILE)?)?;
        self.qnet_tgt.load(&artifact(dir, QNET_TGT_FILE)?)?;
        let rdr = BufReader::new(File::open(artifact(dir, DQN_STATE_FILE)?)?);
        let state: DqnState = serde_json::from_reader(rdr)?;
        self.n_grad_steps = state.n_grad_steps;
        self.n_target_updates = state.n_target_updates;
        info!("Load DQN parameters from {}", dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        linear::{LinearQ, LinearQConfig},
        opt::OptimizerConfig,
        util::CriticLoss,
    };
    use paddock_core::replay_buffer::{ReplayBuffer, ReplayBufferConfig, TransitionBatch};
    use tempdir::TempDir;

    fn config() -> DqnConfig<LinearQConfig> {
        DqnConfig::default()
            .model_config(
                LinearQConfig::default()
                    .opt_config(OptimizerConfig::Sgd { lr: 0.5 })
                    .init_std(0.0),
            )
            .learning_rate(0.5)
            .batch_size(8)
            .gamma(0.5)
            .target_update_interval(1)
            .critic_loss(CriticLoss::Mse)
    }

    fn transition(obs: i64, act: i64, reward: f32, next_obs: i64, terminated: bool) -> TransitionBatch {
        TransitionBatch {
            obs: ArrayBatch {
                data: vec![obs as f32],
                dim: 1,
            },
            act: ArrayBatch {
                data: vec![act as f32],
                dim: 1,
            },
            next_obs: ArrayBatch {
                data: vec![next_obs as f32],
                dim: 1,
            },
            reward: vec![reward],
            is_terminated: vec![terminated as i8],
            is_truncated: vec![0],
        }
    }

    // Two states: action 1 in state 0 moves to state 1, action 0 in state 1 ends the
    // episode with reward 1.
    fn chain_buffer() -> Result<ReplayBuffer> {
        let mut buffer = ReplayBuffer::build(
            &ReplayBufferConfig::default().capacity(10),
            &Space::discrete(2)?,
            &Space::discrete(2)?,
            1,
        )?;
        buffer.push(transition(0, 1, 0.0, 1, false))?;
        buffer.push(transition(1, 0, 1.0, 0, true))?;
        Ok(buffer)
    }

    #[test]
    fn test_rejects_continuous_actions() -> Result<()> {
        let err = Dqn::<LinearQ>::build(
            config(),
            &Space::discrete(2)?,
            &Space::boxed(&[-1.0], &[1.0], &[1])?,
        )
        .err()
        .unwrap();
        assert!(matches!(
            err.downcast_ref::<PaddockError>(),
            Some(PaddockError::InvalidConfig(_))
        ));
        Ok(())
    }

    #[test]
    fn test_learns_bootstrapped_values() -> Result<()> {
        let space = Space::discrete(2)?;
        let mut dqn = Dqn::<LinearQ>::build(config(), &space, &space)?;
        let mut buffer = chain_buffer()?;
        Agent::<ReplayBuffer>::train(&mut dqn);
        for _ in 0..100 {
            dqn.opt(&mut buffer, 5)?;
        }
        assert_eq!(dqn.n_grad_steps(), 500);

        let q = dqn.q_values(&[Value::Discrete(0), Value::Discrete(1)])?;
        // Terminal transition: Q(1, 0) = 1. Bootstrapped: Q(0, 1) = 0.5 * max Q(1, .).
        assert!((q.row(1)[0] - 1.0).abs() < 0.05);
        assert!((q.row(0)[1] - 0.5).abs() < 0.05);

        Agent::<ReplayBuffer>::eval(&mut dqn);
        assert_eq!(dqn.sample(&[Value::Discrete(1)])?, vec![Value::Discrete(0)]);
        Ok(())
    }

    #[test]
    fn test_warmup_and_target_interval() -> Result<()> {
        let space = Space::discrete(2)?;
        let config = config()
            .min_transitions_warmup(3)
            .target_update_interval(4);
        let mut dqn = Dqn::<LinearQ>::build(config, &space, &space)?;
        let mut buffer = chain_buffer()?;
        assert!(dqn.opt(&mut buffer, 1)?.is_none());

        buffer.push(transition(0, 0, 0.0, 0, false))?;
        let initial = dqn.qnet_tgt().params();
        let record = dqn.opt(&mut buffer, 3)?.unwrap();
        assert!(record.get_scalar("loss").is_ok());
        assert_eq!(record.get_scalar("learning_rate")?, 0.5);
        assert_eq!(dqn.qnet_tgt().params(), initial);

        let record = dqn.opt(&mut buffer, 1)?.unwrap();
        assert_eq!(record.get_scalar("n_target_updates")?, 1.0);
        assert_eq!(dqn.qnet_tgt().params(), dqn.qnet().params());
        Ok(())
    }

    #[test]
    fn test_save_load() -> Result<()> {
        let space = Space::discrete(2)?;
        let mut dqn = Dqn::<LinearQ>::build(config(), &space, &space)?;
        let mut buffer = chain_buffer()?;
        dqn.opt(&mut buffer, 10)?;

        let dir = TempDir::new("dqn")?;
        Agent::<ReplayBuffer>::save_params(&dqn, dir.path())?;
        let mut dqn2 = Dqn::<LinearQ>::build(config(), &space, &space)?;
        Agent::<ReplayBuffer>::load_params(&mut dqn2, dir.path())?;
        assert_eq!(dqn.qnet().params(), dqn2.qnet().params());
        assert_eq!(dqn.qnet_tgt().params(), dqn2.qnet_tgt().params());
        assert_eq!(dqn2.n_grad_steps(), 10);

        // Target sync keeps its phase across the reload.
        let mut dqn3 = Dqn::<LinearQ>::build(config().target_update_interval(4), &space, &space)?;
        dqn3.opt(&mut buffer, 2)?;
        Agent::<ReplayBuffer>::save_params(&dqn3, dir.path())?;
        let mut dqn4 = Dqn::<LinearQ>::build(config().target_update_interval(4), &space, &space)?;
        Agent::<ReplayBuffer>::load_params(&mut dqn4, dir.path())?;
        let record = dqn4.opt(&mut buffer, 2)?.unwrap();
        assert_eq!(dqn4.n_grad_steps(), 4);
        assert_eq!(record.get_scalar("n_target_updates")?, 1.0);

        fs::remove_file(dir.path().join(QNET_TGT_FILE))?;
        let err = Agent::<ReplayBuffer>::load_params(&mut dqn2, dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PaddockError>(),
            Some(PaddockError::MissingArtifact(_))
        ));
        Ok(())
    }
}
