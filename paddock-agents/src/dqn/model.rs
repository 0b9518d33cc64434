//! Action-value function of DQN.
use crate::{model::ParamStore, util::CriticLoss};
use anyhow::Result;
use paddock_core::replay_buffer::ArrayBatch;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

/// Action-value function used by [`Dqn`](super::Dqn).
///
/// The model owns its optimizer. Observations are given as flattened features, see
/// [`features`](crate::util::features).
pub trait QModel: ParamStore + Send {
    /// Configuration of the model.
    type Config: Serialize + DeserializeOwned + Clone + Debug + PartialEq;

    /// Constructs a model mapping `in_dim` features to `n_actions` action values.
    fn build(config: &Self::Config, in_dim: usize, n_actions: usize) -> Result<Self>
    where
        Self: Sized;

    /// Action values, one row of `n_actions` per row of `obs`.
    fn forward(&self, obs: &ArrayBatch) -> Result<ArrayBatch>;

    /// Takes a gradient step on the mean of `loss(Q(obs, act) - target)` and returns
    /// the mean loss before the step.
    fn backward_step(
        &mut self,
        obs: &ArrayBatch,
        act: &[usize],
        target: &[f32],
        loss: CriticLoss,
    ) -> Result<f32>;

    /// Sets the learning rate of the optimizer.
    fn set_learning_rate(&mut self, lr: f64);
}
