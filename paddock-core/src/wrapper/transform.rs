//! Wrappers applying caller-supplied maps to observations, actions and rewards.
use super::Wrapper;
use crate::{
    env::{Env, Info, RenderFrame, Step},
    record::Record,
    registry::EnvSpec,
    space::{Space, Value},
};
use anyhow::Result;

/// Map applied to observations.
pub type ObservationFn = Box<dyn FnMut(Value) -> Value + Send>;

/// Map from the actions given to the wrapper to the actions of the inner env.
pub type ActionFn = Box<dyn FnMut(&Value) -> Value + Send>;

/// Map applied to rewards.
pub type RewardFn = Box<dyn FnMut(f32) -> f32 + Send>;

/// Applies a function to every observation returned by `reset` and `step`.
pub struct TransformObservation<E: Env = Box<dyn Env>> {
    env: E,
    f: ObservationFn,
    observation_space: Option<Space>,
}

impl<E: Env> TransformObservation<E> {
    /// Wraps `env`. The observation space is unchanged unless
    /// [`with_observation_space`](Self::with_observation_space) is called.
    pub fn new(env: E, f: impl FnMut(Value) -> Value + Send + 'static) -> Self {
        Self {
            env,
            f: Box::new(f),
            observation_space: None,
        }
    }

    /// Declares the space of transformed observations.
    pub fn with_observation_space(mut self, space: Space) -> Self {
        self.observation_space = Some(space);
        self
    }
}

impl<E: Env> Wrapper for TransformObservation<E> {
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

impl<E: Env> Env for TransformObservation<E> {
    fn observation_space(&self) -> &Space {
        match &self.observation_space {
            Some(space) => space,
            None => self.env.observation_space(),
        }
    }

    fn action_space(&self) -> &Space {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<&Record>) -> Result<(Value, Info)> {
        let (obs, info) = self.env.reset(seed, options)?;
        Ok(((self.f)(obs), info))
    }

    fn step(&mut self, act: &Value) -> Result<Step> {
        let mut step = self.env.step(act)?;
        step.obs = (self.f)(step.obs);
        Ok(step)
    }

    fn render(&mut self) -> Result<Option<RenderFrame>> {
        self.env.render()
    }

    fn close(&mut self) -> Result<()> {
        self.env.close()
    }

    fn spec(&self) -> Option<&EnvSpec> {
        self.env.spec()
    }
}

/// Applies a function to every action before it reaches the inner environment.
pub struct TransformAction<E: Env = Box<dyn Env>> {
    env: E,
    f: ActionFn,
    action_space: Option<Space>,
}

impl<E: Env> TransformAction<E> {
    /// Wraps `env`. The action space is unchanged unless
    /// [`with_action_space`](Self::with_action_space) is called.
    pub fn new(env: E, f: impl FnMut(&Value) -> Value + Send + 'static) -> Self {
        Self {
            env,
            f: Box::new(f),
            action_space: None,
        }
    }

    /// Declares the space of actions accepted by the wrapper.
    pub fn with_action_space(mut self, space: Space) -> Self {
        self.action_space = Some(space);
        self
    }
}

impl<E: Env> Wrapper for TransformAction<E> {
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

impl<E: Env> Env for TransformAction<E> {
    fn observation_space(&self) -> &Space {
        self.env.observation_space()
    }

    fn action_space(&self) -> &Space {
        match &self.action_space {
            Some(space) => space,
            None => self.env.action_space(),
        }
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<&Record>) -> Result<(Value, Info)> {
        self.env.reset(seed, options)
    }

    fn step(&mut self, act: &Value) -> Result<Step> {
        let act = (self.f)(act);
        self.env.step(&act)
    }

    fn render(&mut self) -> Result<Option<RenderFrame>> {
        self.env.render()
    }

    fn close(&mut self) -> Result<()> {
        self.env.close()
    }

    fn spec(&self) -> Option<&EnvSpec> {
        self.env.spec()
    }
}

/// Applies a function to every reward.
pub struct TransformReward<E: Env = Box<dyn Env>> {
    env: E,
    f: RewardFn,
}

impl<E: Env> TransformReward<E> {
    /// Wraps `env`.
    pub fn new(env: E, f: impl FnMut(f32) -> f32 + Send + 'static) -> Self {
        Self {
            env,
            f: Box::new(f),
        }
    }
}

impl<E: Env> Wrapper for TransformReward<E> {
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

impl<E: Env> Env for TransformReward<E> {
    fn observation_space(&self) -> &Space {
        self.env.observation_space()
    }

    fn action_space(&self) -> &Space {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<&Record>) -> Result<(Value, Info)> {
        self.env.reset(seed, options)
    }

    fn step(&mut self, act: &Value) -> Result<Step> {
        let mut step = self.env.step(act)?;
        step.reward = (self.f)(step.reward);
        Ok(step)
    }

    fn render(&mut self) -> Result<Option<RenderFrame>> {
        self.env.render()
    }

    fn close(&mut self) -> Result<()> {
        self.env.close()
    }

    fn spec(&self) -> Option<&EnvSpec> {
        self.env.spec()
    }
}
