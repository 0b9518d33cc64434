use super::Wrapper;
use crate::{
    env::{Env, Info, RenderFrame, Step},
    error::PaddockError,
    record::Record,
    registry::EnvSpec,
    space::{Space, Value},
};
use anyhow::Result;
use log::debug;

/// Checks the first `reset`, `step` and `render` calls against the declared spaces.
///
/// On the first `step` the action is checked before it reaches the inner environment,
/// so a rejected action never changes its state. Later calls are forwarded unchecked.
pub struct EnvChecker<E: Env = Box<dyn Env>> {
    env: E,
    checked_reset: bool,
    checked_step: bool,
    checked_render: bool,
}

impl<E: Env> EnvChecker<E> {
    /// Wraps `env`.
    pub fn new(env: E) -> Self {
        Self {
            env,
            checked_reset: false,
            checked_step: false,
            checked_render: false,
        }
    }

    fn check_obs(&self, obs: &Value, method: &str) -> Result<()> {
        if !self.env.observation_space().contains(obs) {
            return Err(PaddockError::InvalidObservation(format!(
                "observation returned by `{}` is not contained in the observation space: {:?} not in {:?}",
                method,
                obs,
                self.env.observation_space()
            ))
            .into());
        }
        Ok(())
    }
}

impl<E: Env> Wrapper for EnvChecker<E> {
    type Inner = E;

    fn inner(&self) -> &E {
        &self.env
    }

    fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn into_inner(self) -> E {
        self.env
    }
}

impl<E: Env> Env for EnvChecker<E> {
    fn observation_space(&self) -> &Space {
        self.env.observation_space()
    }

    fn action_space(&self) -> &Space {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<&Record>) -> Result<(Value, Info)> {
        let (obs, info) = self.env.reset(seed, options)?;
        if !self.checked_reset {
            self.check_obs(&obs, "reset")?;
            self.checked_reset = true;
            debug!("Passed the check of the first reset");
        }
        Ok((obs, info))
    }

    fn step(&mut self, act: &Value) -> Result<Step> {
        if self.checked_step {
            return self.env.step(act);
        }

        if !self.env.action_space().contains(act) {
            return Err(PaddockError::InvalidAction(format!(
                "{:?} is not contained in the action space {:?}",
                act,
                self.env.action_space()
            ))
            .into());
        }
        let step = self.env.step(act)?;
        self.check_obs(&step.obs, "step")?;
        if !step.reward.is_finite() {
            return Err(PaddockError::InvalidObservation(format!(
                "reward returned by `step` is not finite: {}",
                step.reward
            ))
            .into());
        }
        self.checked_step = true;
        debug!("Passed the check of the first step");
        Ok(step)
    }

    fn render(&mut self) -> Result<Option<RenderFrame>> {
        let frame = self.env.render()?;
        if !self.checked_render {
            self.checked_render = true;
            debug!("First render returned a frame: {}", frame.is_some());
        }
        Ok(frame)
    }

    fn close(&mut self) -> Result<()> {
        self.env.close()
    }

    fn spec(&self) -> Option<&EnvSpec> {
        self.env.spec()
    }
}
