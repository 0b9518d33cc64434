//! Policies and trainable agents.
use crate::{record::Record, replay_buffer::ReplayBufferBase, schedule::Schedule, space::Value};
use anyhow::Result;
use std::path::Path;

/// A policy on observations.
pub trait Policy {
    /// Samples one action per observation.
    fn sample(&mut self, obs: &[Value]) -> Result<Vec<Value>>;
}

/// A policy whose parameters are optimized with batches from a replay buffer.
///
/// [`Trainer::learn`](crate::Trainer::learn) calls [`on_step`](Self::on_step) before
/// every environment step and [`opt`](Self::opt) whenever a training round is due.
pub trait Agent<R: ReplayBufferBase>: Policy {
    /// Name of the algorithm, recorded in checkpoints.
    fn kind(&self) -> &str;

    /// Set the policy to training mode.
    fn train(&mut self);

    /// Set the policy to evaluation mode.
    fn eval(&mut self);

    /// Return if it is in training mode.
    fn is_train(&self) -> bool;

    /// Updates schedules from the remaining progress of training, in `[0, 1]`.
    fn on_step(&mut self, _progress_remaining: f64) {}

    /// Performs `gradient_steps` optimization steps with batches sampled from
    /// `buffer` and returns the values to be recorded, if any.
    ///
    /// Agents may skip optimization, for example while the buffer is warming up, and
    /// return `Ok(None)`.
    fn opt(&mut self, buffer: &mut R, gradient_steps: usize) -> Result<Option<Record>>;

    /// Learning rate schedule.
    fn learning_rate(&self) -> &Schedule;

    /// Hyperparameters as a JSON object.
    fn hyperparams(&self) -> serde_json::Value;

    /// Save the parameters of the agent in the given directory.
    fn save_params(&self, dir: &Path) -> Result<()>;

    /// Load the parameters of the agent from the given directory.
    fn load_params(&mut self, dir: &Path) -> Result<()>;
}
