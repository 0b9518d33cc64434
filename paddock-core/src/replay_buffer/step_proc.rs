//! Conversion of vectorized steps into transitions.
use super::{ArrayBatch, TransitionBatch};
use crate::{
    error::PaddockError,
    space::{Space, Value},
    vector::VecStep,
};
use anyhow::Result;

/// Turns [`VecStep`]s into [`TransitionBatch`]es.
///
/// The processor remembers the observation each slot acted on. For a slot that ended
/// its episode the transition points to `final_obs`, and when a slot was reset
/// automatically before acting, the observation of that reset replaces the
/// remembered one.
pub struct StepProcessor {
    obs_space: Space,
    act_space: Space,
    prev_obs: Option<Vec<Value>>,
}

impl StepProcessor {
    /// Constructs a processor for the given spaces.
    pub fn new(obs_space: &Space, act_space: &Space) -> Self {
        Self {
            obs_space: obs_space.clone(),
            act_space: act_space.clone(),
            prev_obs: None,
        }
    }

    /// Starts a rollout from the observations returned by
    /// [`VecEnv::reset`](crate::vector::VecEnv::reset).
    pub fn reset(&mut self, obs: Vec<Value>) {
        self.prev_obs = Some(obs);
    }

    /// Observations the next actions are taken on, `None` before [`reset`](Self::reset).
    pub fn prev_obs(&self) -> Option<&[Value]> {
        self.prev_obs.as_deref()
    }

    /// Builds the transitions of `step`, produced by applying `acts`.
    pub fn process(&mut self, acts: &[Value], step: &VecStep) -> Result<TransitionBatch> {
        let prev_obs = self
            .prev_obs
            .as_ref()
            .ok_or_else(|| PaddockError::ResetNeeded("process".into()))?;
        let n = step.len();
        if prev_obs.len() != n || acts.len() != n {
            return Err(PaddockError::InvalidConfig(format!(
                "{} observations and {} actions for a step of {} slots",
                prev_obs.len(),
                acts.len(),
                n
            ))
            .into());
        }

        let obs = (0..n)
            .map(|i| step.reset_obs[i].as_ref().unwrap_or(&prev_obs[i]).clone())
            .collect::<Vec<_>>();
        let next_obs = (0..n)
            .map(|i| step.final_obs[i].as_ref().unwrap_or(&step.obs[i]).clone())
            .collect::<Vec<_>>();
        let batch = TransitionBatch {
            obs: ArrayBatch::pack(&self.obs_space, &obs)?,
            act: ArrayBatch::pack(&self.act_space, acts)?,
            next_obs: ArrayBatch::pack(&self.obs_space, &next_obs)?,
            reward: step.reward.clone(),
            is_terminated: step.is_terminated.clone(),
            is_truncated: step.is_truncated.clone(),
        };
        self.prev_obs = Some(step.obs.clone());
        Ok(batch)
    }
}
