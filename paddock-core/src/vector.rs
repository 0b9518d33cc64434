//! Vectorized environments.
//!
//! A [`VecEnv`] runs `num_envs` copies of an environment in lock step. Slots that end an
//! episode are reset automatically according to the [`AutoresetMode`]:
//!
//! * [`AutoresetMode::NextStep`]: a slot that finishes on step `k` reports its terminal
//!   observation on step `k` (both in `obs` and `final_obs`). It is reset right before
//!   the action of step `k + 1` is applied, and the observation returned by that reset is
//!   reported in `reset_obs` of step `k + 1`.
//! * [`AutoresetMode::SameStep`]: a slot that finishes on step `k` is reset within the
//!   same call. `obs` holds the first observation of the new episode and `final_obs`
//!   the terminal one.
//!
//! [`SyncVecEnv`] steps the slots one after the other on the calling thread.
//! [`ThreadVecEnv`] owns one worker thread per slot.
mod slot;
mod sync;
mod thread;
use crate::{
    record::Record,
    space::{Space, Value},
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
pub(crate) use slot::{EnvSlot, SlotStep};
pub use sync::SyncVecEnv;
pub use thread::ThreadVecEnv;

/// When slots that ended an episode are reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AutoresetMode {
    /// Reset before the next action is applied.
    #[default]
    NextStep,

    /// Reset in the step that ended the episode.
    SameStep,
}

/// Batched output of [`VecEnv::step`], one entry per slot.
#[derive(Debug, Clone, Default)]
pub struct VecStep {
    /// Observations.
    pub obs: Vec<Value>,

    /// Rewards.
    pub reward: Vec<f32>,

    /// `1` if the episode of the slot terminated.
    pub is_terminated: Vec<i8>,

    /// `1` if the episode of the slot was truncated.
    pub is_truncated: Vec<i8>,

    /// Info maps.
    pub info: Vec<Record>,

    /// Terminal observations of slots that ended an episode in this step.
    pub final_obs: Vec<Option<Value>>,

    /// Terminal info maps of slots that ended an episode in this step.
    pub final_info: Vec<Option<Record>>,

    /// Observations returned by an automatic reset performed before the action of this
    /// step was applied.
    pub reset_obs: Vec<Option<Value>>,
}

impl VecStep {
    pub(crate) fn from_slots(steps: Vec<SlotStep>) -> Self {
        let n = steps.len();
        let mut out = Self {
            obs: Vec::with_capacity(n),
            reward: Vec::with_capacity(n),
            is_terminated: Vec::with_capacity(n),
            is_truncated: Vec::with_capacity(n),
            info: Vec::with_capacity(n),
            final_obs: Vec::with_capacity(n),
            final_info: Vec::with_capacity(n),
            reset_obs: Vec::with_capacity(n),
        };
        for step in steps {
            out.obs.push(step.obs);
            out.reward.push(step.reward);
            out.is_terminated.push(step.is_terminated as i8);
            out.is_truncated.push(step.is_truncated as i8);
            out.info.push(step.info);
            out.final_obs.push(step.final_obs);
            out.final_info.push(step.final_info);
            out.reset_obs.push(step.reset_obs);
        }
        out
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.obs.len()
    }

    /// Returns `true` if the batch has no slots.
    pub fn is_empty(&self) -> bool {
        self.obs.is_empty()
    }

    /// Returns `true` if the episode of slot `i` ended in this step.
    pub fn is_done(&self, i: usize) -> bool {
        self.is_terminated[i] == 1 || self.is_truncated[i] == 1
    }
}

/// A batch of environments stepped together.
pub trait VecEnv {
    /// Number of slots.
    fn num_envs(&self) -> usize;

    /// Observation space of a single slot.
    fn single_observation_space(&self) -> &Space;

    /// Action space of a single slot.
    fn single_action_space(&self) -> &Space;

    /// Autoreset mode.
    fn autoreset_mode(&self) -> AutoresetMode;

    /// Resets every slot. With `Some(seed)`, slot `i` is reset with `seed + i`.
    fn reset(
        &mut self,
        seed: Option<u64>,
        options: Option<&Record>,
    ) -> Result<(Vec<Value>, Vec<Record>)>;

    /// Applies one action per slot.
    ///
    /// Fails with [`PaddockError::InvalidAction`](crate::error::PaddockError::InvalidAction)
    /// if the number of actions differs from [`num_envs`](Self::num_envs).
    fn step(&mut self, acts: &[Value]) -> Result<VecStep>;

    /// Closes every slot. Later calls are no-ops.
    fn close(&mut self) -> Result<()>;

    /// Returns `true` after [`close`](Self::close).
    fn is_closed(&self) -> bool;
}

fn slot_seed(seed: Option<u64>, i: usize) -> Option<u64> {
    seed.map(|s| s.wrapping_add(i as u64))
}
