use super::Wrapper;
use crate::{
    env::{Env, Info, RenderFrame, Step},
    error::PaddockError,
    record::Record,
    registry::EnvSpec,
    space::{Space, Value},
};
use anyhow::Result;

/// Truncates episodes after `max_episode_steps` steps.
///
/// The step at which the elapsed count reaches the limit has `is_truncated == true`,
/// whatever the inner environment reported for `is_terminated`.
pub struct TimeLimit<E: Env = Box<dyn Env>> {
    env: E,
    max_episode_steps: usize,
    elapsed_steps: usize,
}

impl<E: Env> TimeLimit<E> {
    /// Wraps `env`. `max_episode_steps` must be positive.
    pub fn new(env: E, max_episode_steps: usize) -> Result<Self> {
        if max_episode_steps == 0 {
            return Err(
                PaddockError::InvalidConfig("max_episode_steps must be positive".into()).into(),
            );
        }
        Ok(Self {
            env,
            max_episode_steps,
            elapsed_steps: 0,
        })
    }

    /// The step limit.
    pub fn max_episode_steps(&self) -> usize {
        self.max_episode_steps
    }

    /// Steps since the last reset.
    pub fn elapsed_steps(&self) -> usize {
        self.elapsed_steps
    }
}

impl<E: Env> Wrapper for TimeLimit<E> {
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

impl<E: Env> Env for TimeLimit<E> {
    fn observation_space(&self) -> &Space {
        self.env.observation_space()
    }

    fn action_space(&self) -> &Space {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<&Record>) -> Result<(Value, Info)> {
        let out = self.env.reset(seed, options)?;
        self.elapsed_steps = 0;
        Ok(out)
    }

    fn step(&mut self, act: &Value) -> Result<Step> {
        let mut step = self.env.step(act)?;
        self.elapsed_steps += 1;
        if self.elapsed_steps >= self.max_episode_steps {
            step.is_truncated = true;
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy::DummyEnv;

    #[test]
    fn test_truncated_on_last_step_only() -> Result<()> {
        let mut env = TimeLimit::new(DummyEnv::new(None)?, 5)?;
        env.reset(Some(1), None)?;
        for t in 1..=5 {
            let step = env.step(&Value::Discrete(0))?;
            assert_eq!(step.is_truncated, t == 5, "step {}", t);
            assert!(!step.is_terminated);
        }

        env.reset(None, None)?;
        assert_eq!(env.elapsed_steps(), 0);
        assert!(!env.step(&Value::Discrete(0))?.is_truncated);
        Ok(())
    }

    #[test]
    fn test_truncation_is_additive() -> Result<()> {
        let mut env = TimeLimit::new(DummyEnv::new(Some(2))?, 2)?;
        env.reset(None, None)?;
        env.step(&Value::Discrete(0))?;
        let step = env.step(&Value::Discrete(0))?;
        assert!(step.is_terminated && step.is_truncated);
        Ok(())
    }

    #[test]
    fn test_zero_limit() -> Result<()> {
        assert!(TimeLimit::new(DummyEnv::new(None)?, 0).is_err());
        Ok(())
    }
}
