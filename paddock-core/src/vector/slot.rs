use super::AutoresetMode;
use crate::{
    env::Env,
    record::Record,
    space::Value,
};
use anyhow::Result;
use log::trace;

/// Output of one slot for one vectorized step.
#[derive(Debug, Clone)]
pub(crate) struct SlotStep {
    pub obs: Value,
    pub reward: f32,
    pub is_terminated: bool,
    pub is_truncated: bool,
    pub info: Record,
    pub final_obs: Option<Value>,
    pub final_info: Option<Record>,
    pub reset_obs: Option<Value>,
}

/// An environment exclusively owned by one slot of a vectorized environment,
/// together with its autoreset state.
pub(crate) struct EnvSlot<E: Env> {
    env: E,
    needs_reset: bool,
    mode: AutoresetMode,
}

impl<E: Env> EnvSlot<E> {
    pub fn new(env: E, mode: AutoresetMode) -> Self {
        Self {
            env,
            needs_reset: false,
            mode,
        }
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn into_env(self) -> E {
        self.env
    }

    pub fn reset(&mut self, seed: Option<u64>, options: Option<&Record>) -> Result<(Value, Record)> {
        let out = self.env.reset(seed, options)?;
        self.needs_reset = false;
        Ok(out)
    }

    pub fn step(&mut self, act: &Value) -> Result<SlotStep> {
        let reset_obs = if self.needs_reset {
            trace!("Autoreset before step");
            Some(self.reset(None, None)?.0)
        } else {
            None
        };

        let step = self.env.step(act)?;
        if !step.is_done() {
            return Ok(SlotStep {
                obs: step.obs,
                reward: step.reward,
                is_terminated: step.is_terminated,
                is_truncated: step.is_truncated,
                info: step.info,
                final_obs: None,
                final_info: None,
                reset_obs,
            });
        }

        match self.mode {
            AutoresetMode::NextStep => {
                self.needs_reset = true;
                Ok(SlotStep {
                    final_obs: Some(step.obs.clone()),
                    final_info: Some(step.info.clone()),
                    obs: step.obs,
                    reward: step.reward,
                    is_terminated: step.is_terminated,
                    is_truncated: step.is_truncated,
                    info: step.info,
                    reset_obs,
                })
            }
            AutoresetMode::SameStep => {
                let (obs, info) = self.reset(None, None)?;
                Ok(SlotStep {
                    obs,
                    reward: step.reward,
                    is_terminated: step.is_terminated,
                    is_truncated: step.is_truncated,
                    info,
                    final_obs: Some(step.obs),
                    final_info: Some(step.info),
                    reset_obs,
                })
            }
        }
    }

    pub fn close(&mut self) -> Result<()> {
        self.env.close()
    }
}
