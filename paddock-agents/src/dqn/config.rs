//! Configuration of DQN agent.
use super::explorer::DqnExplorer;
use crate::util::CriticLoss;
use anyhow::Result;
use log::info;
use paddock_core::Schedule;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Dqn`](super::Dqn), generic over the configuration `C` of its
/// [`QModel`](super::QModel).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DqnConfig<C> {
    /// Configuration of the action-value function.
    pub model_config: C,

    /// Transitions per gradient step.
    pub batch_size: usize,

    /// Discount factor.
    pub gamma: f64,

    /// Polyak factor of target updates, `1.0` copies the parameters.
    pub tau: f64,

    /// Gradient steps between target updates.
    pub target_update_interval: usize,

    /// Learning rate of the action-value function.
    pub learning_rate: Schedule,

    /// Exploration during training.
    pub explorer: DqnExplorer,

    /// Probability of a random action in evaluation mode.
    pub eval_epsilon: f64,

    /// Picks next actions with the online network and values them with the target one.
    #[serde(default)]
    pub double_dqn: bool,

    /// Optimization is skipped while the buffer holds fewer transitions.
    pub min_transitions_warmup: usize,

    /// Loss of the TD error.
    pub critic_loss: CriticLoss,

    /// Seed of action sampling.
    pub seed: u64,
}

impl<C: Default> Default for DqnConfig<C> {
    fn default() -> Self {
        Self {
            model_config: Default::default(),
            batch_size: 32,
            gamma: 0.99,
            tau: 1.0,
            target_update_interval: 250,
            learning_rate: Schedule::Constant(1e-4),
            explorer: DqnExplorer::default(),
            eval_epsilon: 0.0,
            double_dqn: false,
            min_transitions_warmup: 0,
            critic_loss: CriticLoss::SmoothL1,
            seed: 42,
        }
    }
}

impl<C: Serialize + DeserializeOwned> DqnConfig<C> {
    /// Sets the configuration of the model.
    pub fn model_config(mut self, v: C) -> Self {
        self.model_config = v;
        self
    }

    /// Batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Discount factor.
    pub fn gamma(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// Soft update coefficient.
    pub fn tau(mut self, v: f64) -> Self {
        self.tau = v;
        self
    }

    /// Sets target update interval.
    pub fn target_update_interval(mut self, v: usize) -> Self {
        self.target_update_interval = v;
        self
    }

    /// Learning rate schedule.
    pub fn learning_rate(mut self, v: impl Into<Schedule>) -> Self {
        self.learning_rate = v.into();
        self
    }

    /// Explorer.
    pub fn explorer(mut self, v: DqnExplorer) -> Self {
        self.explorer = v;
        self
    }

    /// Probability of a random action in evaluation mode.
    pub fn eval_epsilon(mut self, v: f64) -> Self {
        self.eval_epsilon = v;
        self
    }

    /// Double DQN
    pub fn double_dqn(mut self, v: bool) -> Self {
        self.double_dqn = v;
        self
    }

    /// Interval before starting optimization.
    pub fn min_transitions_warmup(mut self, v: usize) -> Self {
        self.min_transitions_warmup = v;
        self
    }

    /// Critic loss.
    pub fn critic_loss(mut self, v: CriticLoss) -> Self {
        self.critic_loss = v;
        self
    }

    /// Seed of action sampling.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Loads [`DqnConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of DQN agent from {}", path_.display());
        Ok(b)
    }

    /// Saves [`DqnConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of DQN agent into {}", path_.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{linear::LinearQConfig, opt::OptimizerConfig};
    use tempdir::TempDir;

    #[test]
    fn test_serde_dqn_config() -> Result<()> {
        let config = DqnConfig::<LinearQConfig>::default()
            .batch_size(64)
            .double_dqn(true)
            .learning_rate(Schedule::Linear {
                start: 1e-3,
                end: 1e-4,
                end_fraction: 0.5,
            })
            .model_config(LinearQConfig::default().opt_config(OptimizerConfig::Sgd { lr: 0.01 }));

        let dir = TempDir::new("dqn_config")?;
        let path = dir.path().join("dqn_config.yaml");
        config.save(&path)?;
        let config_ = DqnConfig::<LinearQConfig>::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }
}
