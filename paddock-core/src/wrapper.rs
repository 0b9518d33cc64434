//! Wrappers decorating an inner [`Env`].
//!
//! Each wrapper owns exactly one inner environment and forwards everything it does
//! not change. [`Registry::make`](crate::registry::Registry::make) composes the
//! default chain, from outermost to innermost:
//!
//! ```text
//! EnvChecker -> OrderEnforcing -> TimeLimit -> EpisodeStatistics -> additional wrappers -> env
//! ```
//!
//! Wrappers are generic over the inner env, defaulting to `Box<dyn Env>`, so they can
//! be stacked statically or behind trait objects.
use crate::Env;
mod env_checker;
mod episode_statistics;
mod normalize;
mod order_enforcing;
mod time_limit;
mod transform;
pub use env_checker::EnvChecker;
pub use episode_statistics::{EpisodeStatistics, EPISODE_LENGTH, EPISODE_RETURN, EPISODE_TIME};
pub use normalize::NormalizeObservation;
pub use order_enforcing::OrderEnforcing;
pub use time_limit::TimeLimit;
pub use transform::{
    ActionFn, ObservationFn, RewardFn, TransformAction, TransformObservation, TransformReward,
};

/// Access to the environment wrapped by a wrapper.
pub trait Wrapper: Env {
    /// Type of the wrapped environment.
    type Inner: Env;

    /// The wrapped environment.
    fn inner(&self) -> &Self::Inner;

    /// The wrapped environment, mutably.
    fn inner_mut(&mut self) -> &mut Self::Inner;

    /// Removes the wrapper.
    fn into_inner(self) -> Self::Inner
    where
        Self: Sized;
}
