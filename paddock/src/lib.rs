//! A reinforcement learning toolkit in Rust.
//!
//! paddock consists of the following crates, re-exported here:
//!
//! * [`core`](crate::core) ([paddock-core](https://crates.io/crates/paddock-core)) provides the
//!   environment contract, wrappers, the registry, vectorized execution, the replay
//!   buffer and the off-policy [`Trainer`](crate::core::Trainer).
//! * [`envs`] ([paddock-envs](https://crates.io/crates/paddock-envs)) implements
//!   classic control tasks and FrozenLake.
//! * [`agents`] ([paddock-agents](https://crates.io/crates/paddock-agents)) includes
//!   DQN, SAC and tabular agents.
//! * [`tensorboard`] ([paddock-tensorboard](https://crates.io/crates/paddock-tensorboard))
//!   has [`TensorboardRecorder`](crate::tensorboard::TensorboardRecorder).
//!
//! ```
//! use paddock::{core::{Env, MakeConfig}, default_registry};
//!
//! let registry = default_registry().unwrap();
//! let mut env = registry.make("FrozenLake-v1", &MakeConfig::default()).unwrap();
//! let (obs, _) = env.reset(Some(0), None).unwrap();
//! assert!(env.observation_space().contains(&obs));
//! ```
pub use paddock_agents as agents;
pub use paddock_core as core;
pub use paddock_envs as envs;
pub use paddock_tensorboard as tensorboard;

use anyhow::Result;
use log::debug;
use paddock_core::Registry;

/// A [`Registry`] holding every environment of [`envs`].
pub fn default_registry() -> Result<Registry> {
    let mut registry = Registry::new();
    envs::register_envs(&mut registry)?;
    debug!("Registered {} environments", registry.ids().count());
    Ok(registry)
}
