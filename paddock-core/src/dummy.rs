//! This module is used for tests.
use crate::{
    env::{seeded_rng, Env, Info, RenderFrame, Step},
    error::PaddockError,
    record::{Record, RecordValue},
    space::{Space, Value},
};
use anyhow::Result;
use rand::{rngs::StdRng, Rng};

/// Dummy env.
///
/// The observation is the number of steps taken since the last reset (modulo the
/// size of the observation space), the action space is `Discrete(2)` and every step
/// yields reward `1.0`. With `Some(n)` the episode terminates after exactly `n` steps,
/// with `None` it never terminates.
///
/// Every reset draws a number from the environment's RNG and reports it in the info
/// under `"noise"`, so seeding can be observed.
pub struct DummyEnv {
    episode_length: Option<usize>,
    t: Option<usize>,
    obs_space: Space,
    act_space: Space,
    rng: StdRng,
    n_obs: usize,
}

impl DummyEnv {
    /// Constructs the env.
    pub fn new(episode_length: Option<usize>) -> Result<Self> {
        let n_obs = episode_length.map_or(16, |n| n + 1);
        Ok(Self {
            episode_length,
            t: None,
            obs_space: Space::discrete(n_obs)?,
            act_space: Space::discrete(2)?,
            rng: seeded_rng(None),
            n_obs,
        })
    }

    fn obs(&self, t: usize) -> Value {
        Value::Discrete((t % self.n_obs) as i64)
    }
}

impl Env for DummyEnv {
    fn observation_space(&self) -> &Space {
        &self.obs_space
    }

    fn action_space(&self) -> &Space {
        &self.act_space
    }

    fn reset(&mut self, seed: Option<u64>, _options: Option<&Record>) -> Result<(Value, Info)> {
        if seed.is_some() {
            self.rng = seeded_rng(seed);
        }
        self.t = Some(0);
        let noise: f32 = self.rng.gen();
        let info = Record::from_scalar("noise", noise);
        Ok((self.obs(0), info))
    }

    fn step(&mut self, act: &Value) -> Result<Step> {
        let t = self
            .t
            .ok_or_else(|| PaddockError::ResetNeeded("step".into()))?;
        if !self.act_space.contains(act) {
            return Err(PaddockError::InvalidAction(format!("{:?}", act)).into());
        }
        let t = t + 1;
        self.t = Some(t);
        let is_terminated = self.episode_length.map_or(false, |n| t >= n);
        let mut info = Record::empty();
        info.insert("t", RecordValue::Scalar(t as f32));
        Ok(Step::new(self.obs(t), 1.0, is_terminated, false, info))
    }

    fn render(&mut self) -> Result<Option<RenderFrame>> {
        match self.t {
            Some(t) => Ok(Some(RenderFrame::Ansi(format!("t = {}", t)))),
            None => Ok(None),
        }
    }
}
