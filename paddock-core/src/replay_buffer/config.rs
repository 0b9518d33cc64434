//! Configuration of [`ReplayBuffer`](super::ReplayBuffer).
use crate::error::PaddockError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`ReplayBuffer`](super::ReplayBuffer).
///
/// ```
/// use paddock_core::replay_buffer::ReplayBufferConfig;
///
/// let config = ReplayBufferConfig::default()
///     .capacity(50_000)
///     .seed(7)
///     .handle_timeout_termination(false)
///     .optimize_memory_usage(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ReplayBufferConfig {
    /// Number of positions of the ring. Each position holds one transition per slot of
    /// the vectorized environment.
    pub capacity: usize,

    /// Seed of the random number generator used by
    /// [`ReplayBufferBase::batch`](super::ReplayBufferBase::batch).
    pub seed: u64,

    /// Stores next observations in the observation array of the following position
    /// instead of a separate array.
    pub optimize_memory_usage: bool,

    /// Ignores the `done` flag of transitions cut off by a time limit when sampling,
    /// so they are bootstrapped like any other transition.
    pub handle_timeout_termination: bool,
}

impl Default for ReplayBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 10000,
            seed: 42,
            optimize_memory_usage: false,
            handle_timeout_termination: true,
        }
    }
}

impl ReplayBufferConfig {
    /// Sets the capacity of the replay buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the random seed for sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets whether next observations share the observation array.
    pub fn optimize_memory_usage(mut self, v: bool) -> Self {
        self.optimize_memory_usage = v;
        self
    }

    /// Sets whether time-limit truncations are bootstrapped.
    pub fn handle_timeout_termination(mut self, v: bool) -> Self {
        self.handle_timeout_termination = v;
        self
    }

    /// Checks the consistency of the fields.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(PaddockError::InvalidConfig("capacity must be positive".into()).into());
        }
        if self.optimize_memory_usage && self.handle_timeout_termination {
            return Err(PaddockError::IncompatibleBufferFlags.into());
        }
        if self.optimize_memory_usage && self.capacity < 2 {
            return Err(PaddockError::InvalidConfig(
                "capacity must be at least 2 with optimize_memory_usage".into(),
            )
            .into());
        }
        Ok(())
    }

    /// Constructs [`ReplayBufferConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ReplayBufferConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
