//! Configuration of tabular agents.
use anyhow::Result;
use log::info;
use paddock_core::Schedule;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Update rule of [`TabularAgent`](super::TabularAgent).
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
pub enum TabularAlgorithm {
    /// Off-policy, bootstraps with the greedy maximum.
    QLearning,

    /// On-policy, bootstraps with the next action actually taken.
    Sarsa,
}

impl TabularAlgorithm {
    /// Name recorded in checkpoints.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::QLearning => "q_learning",
            Self::Sarsa => "sarsa",
        }
    }
}

/// Configuration of [`TabularAgent`](super::TabularAgent).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TabularConfig {
    /// Update rule.
    pub algorithm: TabularAlgorithm,

    /// Step size of the TD update.
    pub learning_rate: Schedule,

    /// Discount factor.
    pub gamma: f64,

    /// Probability of a random action during training.
    pub exploration: Schedule,

    /// Seed of the first reset and of action sampling.
    pub seed: u64,
}

impl Default for TabularConfig {
    fn default() -> Self {
        Self {
            algorithm: TabularAlgorithm::QLearning,
            learning_rate: Schedule::Constant(0.1),
            gamma: 0.99,
            exploration: Schedule::Linear {
                start: 1.0,
                end: 0.05,
                end_fraction: 0.5,
            },
            seed: 42,
        }
    }
}

impl TabularConfig {
    /// Sets the update rule.
    pub fn algorithm(mut self, v: TabularAlgorithm) -> Self {
        self.algorithm = v;
        self
    }

    /// Sets the step size schedule.
    pub fn learning_rate(mut self, v: impl Into<Schedule>) -> Self {
        self.learning_rate = v.into();
        self
    }

    /// Sets the discount factor.
    pub fn gamma(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// Sets the exploration schedule.
    pub fn exploration(mut self, v: impl Into<Schedule>) -> Self {
        self.exploration = v.into();
        self
    }

    /// Sets the seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Loads [`TabularConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of tabular agent from {}", path_.display());
        Ok(b)
    }

    /// Saves [`TabularConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of tabular agent into {}", path_.display());
        Ok(())
    }
}
