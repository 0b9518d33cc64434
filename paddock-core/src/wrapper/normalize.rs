use super::Wrapper;
use crate::{
    env::{Env, Info, RenderFrame, Step},
    error::PaddockError,
    record::Record,
    registry::EnvSpec,
    space::{BoxSpace, Space, Value},
    util::RunningMeanStd,
};
use anyhow::Result;

/// Normalizes box observations with running statistics.
///
/// Each observation first updates the statistics (unless frozen), then is mapped to
/// `(x - mean) / sqrt(var + epsilon)`.
pub struct NormalizeObservation<E: Env = Box<dyn Env>> {
    env: E,
    rms: RunningMeanStd,
    epsilon: f64,
    update_running_mean: bool,
    observation_space: Space,
}

impl<E: Env> NormalizeObservation<E> {
    /// Wraps `env`, which must have a box observation space.
    pub fn new(env: E, epsilon: f64) -> Result<Self> {
        let shape = match env.observation_space() {
            Space::Box(space) => space.shape().to_vec(),
            other => {
                return Err(PaddockError::InvalidConfig(format!(
                    "NormalizeObservation requires a Box observation space, got {:?}",
                    other
                ))
                .into())
            }
        };
        let dim = shape.iter().product();
        let observation_space = Space::Box(BoxSpace::uniform(
            f32::NEG_INFINITY,
            f32::INFINITY,
            &shape,
        )?);
        Ok(Self {
            env,
            rms: RunningMeanStd::new(dim),
            epsilon,
            update_running_mean: true,
            observation_space,
        })
    }

    /// Stops (or resumes) updating the statistics, for example during evaluation.
    pub fn set_update_running_mean(&mut self, v: bool) {
        self.update_running_mean = v;
    }

    /// Current statistics.
    pub fn running_mean_std(&self) -> &RunningMeanStd {
        &self.rms
    }

    fn normalize(&mut self, obs: Value) -> Result<Value> {
        let x = obs.as_box().ok_or_else(|| {
            PaddockError::InvalidObservation(format!("expected a Box observation, got {:?}", obs))
        })?;
        if self.update_running_mean {
            self.rms.update(x);
        }
        Ok(Value::Box(self.rms.normalize(x, self.epsilon)))
    }
}

impl<E: Env> Wrapper for NormalizeObservation<E> {
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

impl<E: Env> Env for NormalizeObservation<E> {
    fn observation_space(&self) -> &Space {
        &self.observation_space
    }

    fn action_space(&self) -> &Space {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<&Record>) -> Result<(Value, Info)> {
        let (obs, info) = self.env.reset(seed, options)?;
        Ok((self.normalize(obs)?, info))
    }

    fn step(&mut self, act: &Value) -> Result<Step> {
        let mut step = self.env.step(act)?;
        step.obs = self.normalize(step.obs)?;
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
    use crate::{dummy::DummyEnv, wrapper::TransformObservation};

    #[test]
    fn test_constant_observation_stays_finite() -> Result<()> {
        let env = TransformObservation::new(DummyEnv::new(None)?, |_| Value::Box(vec![3.0]))
            .with_observation_space(Space::boxed(&[0.0], &[10.0], &[1])?);
        let mut env = NormalizeObservation::new(env, 1e-8)?;
        let (obs, _) = env.reset(None, None)?;
        assert!(obs.as_box().unwrap()[0].is_finite());
        for _ in 0..10 {
            let step = env.step(&Value::Discrete(0))?;
            let x = step.obs.as_box().unwrap()[0];
            assert!(x.is_finite());
            assert!(x.abs() < 1.0);
        }
        Ok(())
    }

    #[test]
    fn test_requires_box() -> Result<()> {
        assert!(NormalizeObservation::new(DummyEnv::new(None)?, 1e-8).is_err());
        Ok(())
    }
}
