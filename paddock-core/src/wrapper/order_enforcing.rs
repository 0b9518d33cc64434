use super::Wrapper;
use crate::{
    env::{Env, Info, RenderFrame, Step},
    error::PaddockError,
    record::Record,
    registry::EnvSpec,
    space::{Space, Value},
};
use anyhow::Result;

/// Rejects `step` (and by default `render`) before the first `reset`.
pub struct OrderEnforcing<E: Env = Box<dyn Env>> {
    env: E,
    has_reset: bool,
    disable_render_order_enforcing: bool,
}

impl<E: Env> OrderEnforcing<E> {
    /// Wraps `env`.
    ///
    /// With `disable_render_order_enforcing`, `render` is allowed before `reset`.
    pub fn new(env: E, disable_render_order_enforcing: bool) -> Self {
        Self {
            env,
            has_reset: false,
            disable_render_order_enforcing,
        }
    }

    /// Returns `true` once `reset` has succeeded.
    pub fn has_reset(&self) -> bool {
        self.has_reset
    }
}

impl<E: Env> Wrapper for OrderEnforcing<E> {
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

impl<E: Env> Env for OrderEnforcing<E> {
    fn observation_space(&self) -> &Space {
        self.env.observation_space()
    }

    fn action_space(&self) -> &Space {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<&Record>) -> Result<(Value, Info)> {
        let out = self.env.reset(seed, options)?;
        self.has_reset = true;
        Ok(out)
    }

    fn step(&mut self, act: &Value) -> Result<Step> {
        if !self.has_reset {
            return Err(PaddockError::ResetNeeded("step".into()).into());
        }
        self.env.step(act)
    }

    fn render(&mut self) -> Result<Option<RenderFrame>> {
        if !self.disable_render_order_enforcing && !self.has_reset {
            return Err(PaddockError::ResetNeeded("render".into()).into());
        }
        self.env.render()
    }

    fn close(&mut self) -> Result<()> {
        self.env.close()
    }

    fn spec(&self) -> Option<&EnvSpec> {
        self.env.spec()
    }
}
