//! Evaluate [`Policy`](crate::Policy).
use crate::record::Record;
use anyhow::Result;
mod default_evaluator;
pub use default_evaluator::{DefaultEvaluator, EVAL_EPISODE_LENGTH, EVAL_EPISODE_RETURN};

/// Evaluate a policy.
pub trait Evaluator<P: ?Sized> {
    /// Evaluate `policy`.
    ///
    /// The caller of this method needs to handle the internal state of the policy,
    /// like training/evaluation mode.
    fn evaluate(&mut self, policy: &mut P) -> Result<Record>;
}
