//! Actor and critics of SAC.
use crate::{model::ParamStore, util::CriticLoss};
use anyhow::Result;
use paddock_core::replay_buffer::ArrayBatch;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

/// Stochastic actor, twin critics and their target copies used by
/// [`Sac`](super::Sac).
///
/// Actions are in `[-1, 1]^act_dim`; the agent rescales them to the bounds of the
/// action space. Observations are flattened features. The model owns its optimizers.
pub trait SacModel: ParamStore + Send {
    /// Configuration of the model.
    type Config: Serialize + DeserializeOwned + Clone + Debug + PartialEq;

    /// Constructs a model for `obs_dim` features and `act_dim` action components.
    fn build(config: &Self::Config, obs_dim: usize, act_dim: usize) -> Result<Self>
    where
        Self: Sized;

    /// Samples actions and returns them with their log-probabilities. With
    /// `deterministic` the mode of the policy is returned.
    fn sample_action(
        &mut self,
        obs: &ArrayBatch,
        deterministic: bool,
    ) -> Result<(ArrayBatch, Vec<f32>)>;

    /// Values of each critic, or of each target critic, one vector per critic.
    fn critic_values(&self, obs: &ArrayBatch, act: &ArrayBatch, target: bool)
        -> Result<Vec<Vec<f32>>>;

    /// Takes a gradient step of every critic toward `target_q` and returns the mean
    /// loss over critics.
    fn update_critics(
        &mut self,
        obs: &ArrayBatch,
        act: &ArrayBatch,
        target_q: &[f32],
        loss: CriticLoss,
    ) -> Result<f32>;

    /// Takes a gradient step of the actor on `alpha * log pi(a|s) - min Q(s, a)` and
    /// returns the loss and the log-probabilities of the sampled actions.
    fn update_actor(&mut self, obs: &ArrayBatch, alpha: f32) -> Result<(f32, Vec<f32>)>;

    /// Polyak update of the target critics.
    fn soft_update(&mut self, tau: f64) -> Result<()>;

    /// Sets the learning rate of the actor and critic optimizers.
    fn set_learning_rate(&mut self, lr: f64);
}
