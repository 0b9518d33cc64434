//! Default implementation of the [`Evaluator`] trait.
use super::Evaluator;
use crate::{
    env::Env,
    error::PaddockError,
    record::{Record, RecordValue},
    Policy,
};
use anyhow::Result;
use log::debug;

/// Record key of the mean return of evaluation episodes.
pub const EVAL_EPISODE_RETURN: &str = "eval/episode_return";

/// Record key of the mean length of evaluation episodes.
pub const EVAL_EPISODE_LENGTH: &str = "eval/episode_length";

/// Runs a fixed number of episodes on its own environment.
///
/// Episode `i` starts with `reset(Some(seed + i))`, so every evaluation sees the same
/// initial states. The environment must end every episode, typically with a
/// [`TimeLimit`](crate::wrapper::TimeLimit).
pub struct DefaultEvaluator {
    n_episodes: usize,
    seed: u64,
    env: Box<dyn Env>,
}

impl DefaultEvaluator {
    /// Constructs a new [`DefaultEvaluator`].
    pub fn new(env: impl Env + 'static, n_episodes: usize, seed: u64) -> Result<Self> {
        if n_episodes == 0 {
            return Err(PaddockError::InvalidConfig("n_episodes must be positive".into()).into());
        }
        Ok(Self {
            n_episodes,
            seed,
            env: Box::new(env),
        })
    }
}

impl<P: Policy + ?Sized> Evaluator<P> for DefaultEvaluator {
    fn evaluate(&mut self, policy: &mut P) -> Result<Record> {
        let mut r_total = 0f32;
        let mut len_total = 0usize;

        for ix in 0..self.n_episodes {
            let (mut obs, _) = self
                .env
                .reset(Some(self.seed.wrapping_add(ix as u64)), None)?;
            loop {
                let act = policy
                    .sample(std::slice::from_ref(&obs))?
                    .pop()
                    .ok_or_else(|| PaddockError::InvalidAction("policy returned no action".into()))?;
                let step = self.env.step(&act)?;
                r_total += step.reward;
                len_total += 1;
                if step.is_done() {
                    break;
                }
                obs = step.obs;
            }
        }

        let n = self.n_episodes as f32;
        debug!("Evaluated {} episodes", self.n_episodes);
        Ok(Record::from_slice(&[
            (EVAL_EPISODE_RETURN, RecordValue::Scalar(r_total / n)),
            (EVAL_EPISODE_LENGTH, RecordValue::Scalar(len_total as f32 / n)),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dummy::DummyEnv, space::Value};

    struct Constant;

    impl Policy for Constant {
        fn sample(&mut self, obs: &[Value]) -> Result<Vec<Value>> {
            Ok(vec![Value::Discrete(0); obs.len()])
        }
    }

    #[test]
    fn test_evaluate() -> Result<()> {
        let mut evaluator = DefaultEvaluator::new(DummyEnv::new(Some(4))?, 3, 0)?;
        let record = evaluator.evaluate(&mut Constant)?;
        assert_eq!(record.get_scalar(EVAL_EPISODE_RETURN)?, 4.0);
        assert_eq!(record.get_scalar(EVAL_EPISODE_LENGTH)?, 4.0);
        assert!(DefaultEvaluator::new(DummyEnv::new(Some(4))?, 0, 0).is_err());
        Ok(())
    }
}
