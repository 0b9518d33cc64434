//! Environment.
use crate::{
    record::Record,
    registry::EnvSpec,
    space::{Space, Value},
};
use anyhow::Result;
use rand::{rngs::StdRng, SeedableRng};

/// Info map returned by [`Env::reset`] and [`Env::step`].
pub type Info = Record;

/// Represents an action, observation and reward tuple `(a_t, o_t+1, r_t)`
/// with some additional information.
#[derive(Debug, Clone)]
pub struct Step {
    /// Observation after the action was applied.
    pub obs: Value,

    /// Reward.
    pub reward: f32,

    /// The episode reached an intrinsic end (goal or failure).
    pub is_terminated: bool,

    /// The episode was cut off from outside, for example by a time limit.
    pub is_truncated: bool,

    /// Information defined by user.
    pub info: Info,
}

impl Step {
    /// Constructs a [`Step`] object.
    pub fn new(obs: Value, reward: f32, is_terminated: bool, is_truncated: bool, info: Info) -> Self {
        Step {
            obs,
            reward,
            is_terminated,
            is_truncated,
            info,
        }
    }

    /// Terminated or truncated.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.is_terminated || self.is_truncated
    }
}

/// Output of [`Env::render`].
#[derive(Debug, Clone, PartialEq)]
pub enum RenderFrame {
    /// Text rendering.
    Ansi(String),

    /// Row-major `height x width x 3` image.
    RgbArray {
        /// Pixel data.
        data: Vec<u8>,
        /// Height in pixels.
        height: usize,
        /// Width in pixels.
        width: usize,
    },
}

/// Represents an environment, typically an MDP.
///
/// The lifecycle is `reset` (always legal) followed by any number of `step`s.
/// Calling `step` before the first `reset` fails with
/// [`PaddockError::ResetNeeded`](crate::error::PaddockError::ResetNeeded). `close` is
/// idempotent.
///
/// Base environments never set [`Step::is_truncated`]; episode length limits are
/// imposed by [`TimeLimit`](crate::wrapper::TimeLimit).
pub trait Env: Send {
    /// The set of legal observations.
    fn observation_space(&self) -> &Space;

    /// The set of legal actions.
    fn action_space(&self) -> &Space;

    /// Resets the environment and returns the initial observation.
    ///
    /// With `Some(seed)`, the random number generator of the environment is reseeded and
    /// the returned observation is a deterministic function of the seed. With `None`,
    /// the environment keeps drawing from its current stream.
    fn reset(&mut self, seed: Option<u64>, options: Option<&Record>) -> Result<(Value, Info)>;

    /// Performs an environment step.
    fn step(&mut self, act: &Value) -> Result<Step>;

    /// Renders the current state without changing it.
    fn render(&mut self) -> Result<Option<RenderFrame>> {
        Ok(None)
    }

    /// Releases resources held by the environment.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// The specification the environment was built from by
    /// [`Registry::make`](crate::registry::Registry::make).
    fn spec(&self) -> Option<&EnvSpec> {
        None
    }
}

impl Env for Box<dyn Env> {
    fn observation_space(&self) -> &Space {
        (**self).observation_space()
    }

    fn action_space(&self) -> &Space {
        (**self).action_space()
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<&Record>) -> Result<(Value, Info)> {
        (**self).reset(seed, options)
    }

    fn step(&mut self, act: &Value) -> Result<Step> {
        (**self).step(act)
    }

    fn render(&mut self) -> Result<Option<RenderFrame>> {
        (**self).render()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn spec(&self) -> Option<&EnvSpec> {
        (**self).spec()
    }
}

/// Random number generator for environments.
///
/// A given seed always produces the same stream; without a seed the generator is
/// initialised from system entropy.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
