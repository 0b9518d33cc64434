use super::Wrapper;
use crate::{
    env::{Env, Info, RenderFrame, Step},
    record::{Record, RecordValue},
    registry::EnvSpec,
    space::{Space, Value},
};
use anyhow::Result;
use std::{collections::VecDeque, time::Instant};

/// Info key of the return of a finished episode.
pub const EPISODE_RETURN: &str = "episode_return";

/// Info key of the length of a finished episode.
pub const EPISODE_LENGTH: &str = "episode_length";

/// Info key of the wall-clock duration of a finished episode in seconds.
pub const EPISODE_TIME: &str = "episode_time";

/// Accumulates the return and length of episodes.
///
/// When a step ends an episode, [`EPISODE_RETURN`], [`EPISODE_LENGTH`] and
/// [`EPISODE_TIME`] are inserted into its info, and the return and length are pushed
/// into rolling queues holding the last `buffer_length` episodes.
pub struct EpisodeStatistics<E: Env = Box<dyn Env>> {
    env: E,
    episode_return: f64,
    episode_length: usize,
    episode_start: Instant,
    episode_count: usize,
    return_queue: VecDeque<f32>,
    length_queue: VecDeque<usize>,
    buffer_length: usize,
}

impl<E: Env> EpisodeStatistics<E> {
    /// Wraps `env`.
    pub fn new(env: E, buffer_length: usize) -> Self {
        Self {
            env,
            episode_return: 0.0,
            episode_length: 0,
            episode_start: Instant::now(),
            episode_count: 0,
            return_queue: VecDeque::with_capacity(buffer_length),
            length_queue: VecDeque::with_capacity(buffer_length),
            buffer_length,
        }
    }

    /// Returns of the most recent episodes, oldest first.
    pub fn return_queue(&self) -> &VecDeque<f32> {
        &self.return_queue
    }

    /// Lengths of the most recent episodes, oldest first.
    pub fn length_queue(&self) -> &VecDeque<usize> {
        &self.length_queue
    }

    /// The number of finished episodes.
    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    fn push_bounded<T>(queue: &mut VecDeque<T>, v: T, cap: usize) {
        if cap == 0 {
            return;
        }
        if queue.len() == cap {
            queue.pop_front();
        }
        queue.push_back(v);
    }
}

impl<E: Env> Wrapper for EpisodeStatistics<E> {
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

impl<E: Env> Env for EpisodeStatistics<E> {
    fn observation_space(&self) -> &Space {
        self.env.observation_space()
    }

    fn action_space(&self) -> &Space {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<&Record>) -> Result<(Value, Info)> {
        let out = self.env.reset(seed, options)?;
        self.episode_return = 0.0;
        self.episode_length = 0;
        self.episode_start = Instant::now();
        Ok(out)
    }

    fn step(&mut self, act: &Value) -> Result<Step> {
        let mut step = self.env.step(act)?;
        self.episode_return += step.reward as f64;
        self.episode_length += 1;

        if step.is_done() {
            let ret = self.episode_return as f32;
            let len = self.episode_length;
            step.info.insert(EPISODE_RETURN, RecordValue::Scalar(ret));
            step.info.insert(EPISODE_LENGTH, RecordValue::Scalar(len as f32));
            step.info.insert(
                EPISODE_TIME,
                RecordValue::Scalar(self.episode_start.elapsed().as_secs_f32()),
            );
            Self::push_bounded(&mut self.return_queue, ret, self.buffer_length);
            Self::push_bounded(&mut self.length_queue, len, self.buffer_length);
            self.episode_count += 1;
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
    fn test_episode_summary() -> Result<()> {
        let mut env = EpisodeStatistics::new(DummyEnv::new(Some(3))?, 2);

        for episode in 0..3 {
            env.reset(Some(episode), None)?;
            loop {
                let step = env.step(&Value::Discrete(1))?;
                if step.is_done() {
                    assert_eq!(step.info.get_scalar(EPISODE_RETURN), Ok(3.0));
                    assert_eq!(step.info.get_scalar(EPISODE_LENGTH), Ok(3.0));
                    assert!(step.info.get_scalar(EPISODE_TIME)? >= 0.0);
                    break;
                } else {
                    assert!(!step.info.contains_key(EPISODE_RETURN));
                }
            }
        }

        assert_eq!(env.episode_count(), 3);
        assert_eq!(env.return_queue().len(), 2);
        assert_eq!(env.length_queue().iter().copied().collect::<Vec<_>>(), vec![3, 3]);
        Ok(())
    }

    #[test]
    fn test_reset_clears_accumulators() -> Result<()> {
        let mut env = EpisodeStatistics::new(DummyEnv::new(Some(3))?, 10);
        env.reset(None, None)?;
        env.step(&Value::Discrete(0))?;
        env.step(&Value::Discrete(0))?;

        env.reset(None, None)?;
        env.step(&Value::Discrete(0))?;
        env.step(&Value::Discrete(0))?;
        let step = env.step(&Value::Discrete(0))?;
        assert_eq!(step.info.get_scalar(EPISODE_LENGTH), Ok(3.0));
        Ok(())
    }
}
