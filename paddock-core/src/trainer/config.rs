//! Configuration of [`Trainer`](super::Trainer).
use crate::error::PaddockError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Unit of [`TrainFreq`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
pub enum TrainFreqUnit {
    /// Steps of the vectorized environment.
    Step,

    /// Finished episodes, summed over slots.
    Episode,
}

/// How often a training round runs.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
pub struct TrainFreq {
    /// Number of units between training rounds.
    pub frequency: usize,

    /// Unit of `frequency`.
    pub unit: TrainFreqUnit,
}

impl TrainFreq {
    /// Every `n` vectorized steps.
    pub fn steps(n: usize) -> Self {
        Self {
            frequency: n,
            unit: TrainFreqUnit::Step,
        }
    }

    /// Every `n` finished episodes.
    pub fn episodes(n: usize) -> Self {
        Self {
            frequency: n,
            unit: TrainFreqUnit::Episode,
        }
    }
}

/// Number of gradient steps per training round.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
pub enum GradientSteps {
    /// A fixed number.
    Fixed(usize),

    /// As many as transitions were collected since the last round.
    AsCollected,
}

/// Configuration of [`Trainer`](super::Trainer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TrainerConfig {
    /// Environment steps taken with uniformly random actions before the agent acts
    /// and learns.
    pub learning_starts: usize,

    /// Interval of training rounds.
    pub train_freq: TrainFreq,

    /// Gradient steps per training round.
    pub gradient_steps: GradientSteps,

    /// Interval of evaluation in environment steps, `0` to disable.
    pub eval_interval: usize,

    /// Interval of saving checkpoints in environment steps, `0` to disable.
    pub save_interval: usize,

    /// Where checkpoints are saved, in subdirectories named after the number of
    /// environment steps.
    pub model_dir: Option<String>,

    /// Interval of flushing records in environment steps, `0` to disable.
    pub flush_record_interval: usize,

    /// Seed of the first reset of the environment and of random actions.
    pub seed: Option<u64>,

    /// Restart the counters at each call of [`Trainer::learn`](super::Trainer::learn).
    ///
    /// When `false`, a call continues the schedules too: the remaining progress runs
    /// from `1 - num_timesteps / end` down to zero, where `end` is the step count the
    /// call trains up to.
    pub reset_num_timesteps: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            learning_starts: 100,
            train_freq: TrainFreq::steps(1),
            gradient_steps: GradientSteps::Fixed(1),
            eval_interval: 0,
            save_interval: 0,
            model_dir: None,
            flush_record_interval: 1000,
            seed: None,
            reset_num_timesteps: true,
        }
    }
}

impl TrainerConfig {
    /// Sets the number of random steps before learning starts.
    pub fn learning_starts(mut self, v: usize) -> Self {
        self.learning_starts = v;
        self
    }

    /// Sets the interval of training rounds.
    pub fn train_freq(mut self, v: TrainFreq) -> Self {
        self.train_freq = v;
        self
    }

    /// Sets the number of gradient steps per training round.
    pub fn gradient_steps(mut self, v: GradientSteps) -> Self {
        self.gradient_steps = v;
        self
    }

    /// Sets the interval of evaluation in environment steps.
    pub fn eval_interval(mut self, v: usize) -> Self {
        self.eval_interval = v;
        self
    }

    /// Sets the interval of saving in environment steps.
    pub fn save_interval(mut self, v: usize) -> Self {
        self.save_interval = v;
        self
    }

    /// Sets the directory of checkpoints.
    pub fn model_dir(mut self, v: impl Into<String>) -> Self {
        self.model_dir = Some(v.into());
        self
    }

    /// Sets the interval of flushing records in environment steps.
    pub fn flush_record_interval(mut self, v: usize) -> Self {
        self.flush_record_interval = v;
        self
    }

    /// Sets the seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = Some(v);
        self
    }

    /// Sets whether counters restart at each call of `learn`.
    pub fn reset_num_timesteps(mut self, v: bool) -> Self {
        self.reset_num_timesteps = v;
        self
    }

    /// Checks the consistency of the fields.
    pub fn validate(&self) -> Result<()> {
        if self.train_freq.frequency == 0 {
            return Err(PaddockError::InvalidConfig("train_freq must be positive".into()).into());
        }
        if self.save_interval > 0 && self.model_dir.is_none() {
            return Err(
                PaddockError::InvalidConfig("save_interval requires model_dir".into()).into(),
            );
        }
        Ok(())
    }

    /// Constructs [`TrainerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TrainerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_trainer_config() -> Result<()> {
        let config = TrainerConfig::default()
            .learning_starts(1000)
            .train_freq(TrainFreq::episodes(2))
            .gradient_steps(GradientSteps::AsCollected)
            .eval_interval(5000)
            .model_dir("some/directory");

        let dir = TempDir::new("trainer_config")?;
        let path = dir.path().join("trainer_config.yaml");
        config.save(&path)?;
        let config_ = TrainerConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }

    #[test]
    fn test_validate() {
        assert!(TrainerConfig::default().validate().is_ok());
        assert!(TrainerConfig::default()
            .train_freq(TrainFreq::steps(0))
            .validate()
            .is_err());
        assert!(TrainerConfig::default().save_interval(10).validate().is_err());
    }
}
