//! Configuration of SAC agent.
use super::ent_coef::EntCoefMode;
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

/// Configuration of [`Sac`](super::Sac), generic over the configuration `C` of its
/// [`SacModel`](super::SacModel).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SacConfig<C> {
    /// Configuration of the actor and critics.
    pub model_config: C,

    /// Transitions per gradient step.
    pub batch_size: usize,

    /// Discount factor.
    pub gamma: f64,

    /// Polyak factor of target updates.
    pub tau: f64,

    /// Gradient steps between target updates.
    pub target_update_interval: usize,

    /// Learning rate of the actor and critics.
    pub learning_rate: Schedule,

    /// Entropy coefficient.
    pub ent_coef_mode: EntCoefMode,

    /// Optimization is skipped while the buffer holds fewer transitions.
    pub min_transitions_warmup: usize,

    /// Loss of the critics.
    pub critic_loss: CriticLoss,

    /// Takes the mode of the policy in evaluation mode.
    pub deterministic_eval: bool,
}

impl<C: Default> Default for SacConfig<C> {
    fn default() -> Self {
        Self {
            model_config: Default::default(),
            batch_size: 256,
            gamma: 0.99,
            tau: 0.005,
            target_update_interval: 1,
            learning_rate: Schedule::Constant(3e-4),
            ent_coef_mode: EntCoefMode::default(),
            min_transitions_warmup: 0,
            critic_loss: CriticLoss::Mse,
            deterministic_eval: true,
        }
    }
}

impl<C: Serialize + DeserializeOwned> SacConfig<C> {
    /// Sets the configuration of the model.
    pub fn model_config(mut self, v: C) -> Self {
        self.model_config = v;
        self
    }

    /// Sets batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets discount factor.
    pub fn gamma(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// Sets soft update coefficient.
    pub fn tau(mut self, v: f64) -> Self {
        self.tau = v;
        self
    }

    /// Sets target update interval.
    pub fn target_update_interval(mut self, v: usize) -> Self {
        self.target_update_interval = v;
        self
    }

    /// Sets learning rate schedule.
    pub fn learning_rate(mut self, v: impl Into<Schedule>) -> Self {
        self.learning_rate = v.into();
        self
    }

    /// Sets entropy coefficient.
    pub fn ent_coef_mode(mut self, v: EntCoefMode) -> Self {
        self.ent_coef_mode = v;
        self
    }

    /// Interval before starting optimization.
    pub fn min_transitions_warmup(mut self, v: usize) -> Self {
        self.min_transitions_warmup = v;
        self
    }

    /// Sets critic loss.
    pub fn critic_loss(mut self, v: CriticLoss) -> Self {
        self.critic_loss = v;
        self
    }

    /// Loads [`SacConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of SAC agent from {}", path_.display());
        Ok(b)
    }

    /// Saves [`SacConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of SAC agent into {}", path_.display());
        Ok(())
    }
}
