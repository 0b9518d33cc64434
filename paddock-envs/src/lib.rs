#![warn(missing_docs)]
//! Concrete tasks implementing [`paddock_core::Env`].
//!
//! * [`CartPole`]: balance a pole on a cart, two discrete actions.
//! * [`MountainCar`]: drive an underpowered car up a hill, three discrete actions.
//! * [`Pendulum`]: swing up a pendulum with a continuous torque.
//! * [`FrozenLake`]: cross a frozen lake without falling into holes, a grid world
//!   with an ANSI rendering.
//!
//! [`register_envs`] adds all of them to a [`Registry`]:
//!
//! ```
//! use paddock_core::{registry::MakeConfig, Env, Registry};
//!
//! let mut registry = Registry::new();
//! paddock_envs::register_envs(&mut registry).unwrap();
//! let mut env = registry.make("CartPole-v1", &MakeConfig::default()).unwrap();
//! let (obs, _) = env.reset(Some(42), None).unwrap();
//! assert!(env.observation_space().contains(&obs));
//! ```
mod cartpole;
mod frozen_lake;
mod mountain_car;
mod pendulum;
use anyhow::Result;
pub use cartpole::{CartPole, CartPoleConfig};
pub use frozen_lake::{FrozenLake, FrozenLakeConfig, MapName};
use log::debug;
pub use mountain_car::{MountainCar, MountainCarConfig};
use paddock_core::{
    error::PaddockError,
    registry::{EnvSpec, Kwargs},
    Env, Registry,
};
pub use pendulum::{Pendulum, PendulumConfig};
use serde::de::DeserializeOwned;

/// Builds the configuration of an environment from registry keyword arguments.
///
/// Missing keys take their default values; unknown keys and values of the wrong type
/// fail with [`PaddockError::InvalidConfig`].
pub fn config_from_kwargs<C: DeserializeOwned>(kwargs: &Kwargs) -> Result<C> {
    let object = kwargs
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect::<serde_json::Map<_, _>>();
    serde_json::from_value(serde_json::Value::Object(object))
        .map_err(|e| PaddockError::InvalidConfig(e.to_string()).into())
}

fn specs() -> Result<Vec<EnvSpec>> {
    Ok(vec![
        EnvSpec::new("CartPole-v1")?
            .entry_point(|kwargs| {
                Ok(Box::new(CartPole::build(config_from_kwargs(kwargs)?)?) as Box<dyn Env>)
            })
            .max_episode_steps(500)
            .reward_threshold(475.0),
        EnvSpec::new("MountainCar-v0")?
            .entry_point(|kwargs| {
                Ok(Box::new(MountainCar::build(config_from_kwargs(kwargs)?)?) as Box<dyn Env>)
            })
            .max_episode_steps(200)
            .reward_threshold(-110.0),
        EnvSpec::new("Pendulum-v1")?
            .entry_point(|kwargs| {
                Ok(Box::new(Pendulum::build(config_from_kwargs(kwargs)?)?) as Box<dyn Env>)
            })
            .max_episode_steps(200),
        EnvSpec::new("FrozenLake-v1")?
            .entry_point(|kwargs| {
                Ok(Box::new(FrozenLake::build(config_from_kwargs(kwargs)?)?) as Box<dyn Env>)
            })
            .kwarg("map_name", "4x4".into())
            .max_episode_steps(100)
            .reward_threshold(0.70),
        EnvSpec::new("FrozenLake8x8-v1")?
            .entry_point(|kwargs| {
                Ok(Box::new(FrozenLake::build(config_from_kwargs(kwargs)?)?) as Box<dyn Env>)
            })
            .kwarg("map_name", "8x8".into())
            .max_episode_steps(200)
            .reward_threshold(0.85),
    ])
}

/// Registers the tasks of this crate.
///
/// Ids already present in `registry` are left untouched, so calling this more than once
/// has no further effect.
pub fn register_envs(registry: &mut Registry) -> Result<()> {
    for spec in specs()? {
        if registry.contains(&spec.id) {
            debug!("{} is already registered", spec.id);
            continue;
        }
        registry.register(spec);
    }
    Ok(())
}
