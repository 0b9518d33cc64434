#![warn(missing_docs)]
//! RL agents for paddock.
//!
//! * [`dqn`] and [`sac`] implement [`Agent`](paddock_core::Agent) and are trained by
//!   [`Trainer`](paddock_core::Trainer). Their function approximators are opaque
//!   traits, [`QModel`](dqn::QModel) and [`SacModel`](sac::SacModel).
//! * [`linear`] provides [`LinearQ`](linear::LinearQ), a linear action-value function
//!   trained with the optimizers in [`opt`].
//! * [`tabular`] implements Q-learning and SARSA on environments with discrete spaces.
pub mod dqn;
pub mod linear;
pub mod model;
pub mod opt;
pub mod sac;
pub mod tabular;
pub mod util;
pub use model::{ParamStore, Params};
