//! Catalog of environments and construction by id.
//!
//! A [`Registry`] is an explicit value: create one, register specifications into it
//! (for example with `paddock_envs::register_envs`) and pass it to whatever needs to
//! build environments.
//!
//! [`Registry::make`] resolves a specification into a fully wrapped environment:
//!
//! 1. caller kwargs are merged over the registered defaults, caller wins;
//! 2. the base environment is built by the entry point;
//! 3. additional wrappers are applied in declared order, innermost first;
//! 4. the default chain is applied according to the flags, giving
//!    `EnvChecker -> OrderEnforcing -> TimeLimit -> EpisodeStatistics` from the outside in;
//! 5. the resolved specification is attached, so [`Env::spec`] reflects the settings
//!    actually in effect.
mod spec;
use crate::{
    env::{Env, Info, RenderFrame, Step},
    error::PaddockError,
    record::Record,
    space::{Space, Value},
    wrapper::{EnvChecker, EpisodeStatistics, OrderEnforcing, TimeLimit, Wrapper},
};
use anyhow::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
pub use spec::{parse_env_id, EnvFactory, EnvSpec, Kwargs, WrapperFactory, WrapperSpec};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Caller overrides of [`Registry::make`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct MakeConfig {
    /// Overrides the registered step limit.
    pub max_episode_steps: Option<usize>,

    /// Overrides the registered `disable_env_checker` flag.
    pub disable_env_checker: Option<bool>,

    /// Allows `render` before `reset`.
    pub disable_render_order_enforcing: bool,

    /// Applies [`EpisodeStatistics`].
    pub record_episode_statistics: bool,

    /// Length of the rolling queues of [`EpisodeStatistics`].
    pub record_buffer_length: usize,

    /// Keyword arguments merged over the registered ones.
    pub kwargs: Kwargs,
}

impl Default for MakeConfig {
    fn default() -> Self {
        Self {
            max_episode_steps: None,
            disable_env_checker: None,
            disable_render_order_enforcing: false,
            record_episode_statistics: false,
            record_buffer_length: 100,
            kwargs: Kwargs::new(),
        }
    }
}

impl MakeConfig {
    /// Sets the step limit.
    pub fn max_episode_steps(mut self, v: usize) -> Self {
        self.max_episode_steps = Some(v);
        self
    }

    /// Sets whether the env checker is skipped.
    pub fn disable_env_checker(mut self, v: bool) -> Self {
        self.disable_env_checker = Some(v);
        self
    }

    /// Sets whether `render` is allowed before `reset`.
    pub fn disable_render_order_enforcing(mut self, v: bool) -> Self {
        self.disable_render_order_enforcing = v;
        self
    }

    /// Sets whether episode statistics are recorded.
    pub fn record_episode_statistics(mut self, v: bool) -> Self {
        self.record_episode_statistics = v;
        self
    }

    /// Sets the length of the rolling queues of episode statistics.
    pub fn record_buffer_length(mut self, v: usize) -> Self {
        self.record_buffer_length = v;
        self
    }

    /// Adds a keyword argument.
    pub fn kwarg(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.kwargs.insert(key.into(), value);
        self
    }

    /// Constructs [`MakeConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`MakeConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Outermost layer of environments built by [`Registry::make`], carrying the resolved
/// specification.
pub struct SpecifiedEnv {
    env: Box<dyn Env>,
    spec: EnvSpec,
}

impl Wrapper for SpecifiedEnv {
    type Inner = Box<dyn Env>;

    fn inner(&self) -> &Box<dyn Env> {
        &self.env
    }

    fn inner_mut(&mut self) -> &mut Box<dyn Env> {
        &mut self.env
    }

    fn into_inner(self) -> Box<dyn Env> {
        self.env
    }
}

impl Env for SpecifiedEnv {
    fn observation_space(&self) -> &Space {
        self.env.observation_space()
    }

    fn action_space(&self) -> &Space {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<&Record>) -> Result<(Value, Info)> {
        self.env.reset(seed, options)
    }

    fn step(&mut self, act: &Value) -> Result<Step> {
        self.env.step(act)
    }

    fn render(&mut self) -> Result<Option<RenderFrame>> {
        self.env.render()
    }

    fn close(&mut self) -> Result<()> {
        self.env.close()
    }

    fn spec(&self) -> Option<&EnvSpec> {
        Some(&self.spec)
    }
}

/// Catalog of environment specifications.
#[derive(Default, Clone)]
pub struct Registry {
    specs: BTreeMap<String, EnvSpec>,
}

impl Registry {
    /// Constructs an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a specification. An existing specification with the same id is replaced.
    pub fn register(&mut self, spec: EnvSpec) {
        if self.specs.contains_key(&spec.id) {
            warn!("Overriding environment {} already in registry", spec.id);
        }
        debug!("Registered {}", spec.id);
        self.specs.insert(spec.id.clone(), spec);
    }

    /// Returns `true` if `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.specs.contains_key(id)
    }

    /// The registered specification of `id`.
    pub fn spec(&self, id: &str) -> Result<&EnvSpec> {
        self.specs
            .get(id)
            .ok_or_else(|| PaddockError::NotRegistered(id.to_string()).into())
    }

    /// Registered ids in lexicographic order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(|k| k.as_str())
    }

    /// Builds the environment registered as `id`.
    pub fn make(&self, id: &str, config: &MakeConfig) -> Result<Box<dyn Env>> {
        let mut spec = self.spec(id)?.clone();
        spec.kwargs.extend(config.kwargs.clone());
        if let Some(n) = config.max_episode_steps {
            spec.max_episode_steps = Some(n);
        }
        if let Some(v) = config.disable_env_checker {
            spec.disable_env_checker = v;
        }

        let entry_point = spec.entry_point.clone().ok_or_else(|| {
            PaddockError::MisconfiguredRegistration {
                id: id.to_string(),
                reason: "no entry point".to_string(),
            }
        })?;
        let mut env = entry_point(&spec.kwargs)?;

        for wrapper in spec.additional_wrappers.iter() {
            let f = wrapper.entry_point.as_ref().ok_or_else(|| {
                PaddockError::MisconfiguredRegistration {
                    id: id.to_string(),
                    reason: format!("wrapper `{}` has no entry point", wrapper.name),
                }
            })?;
            env = f(env, &wrapper.kwargs)?;
        }

        if config.record_episode_statistics {
            env = Box::new(EpisodeStatistics::new(env, config.record_buffer_length));
        }
        if let Some(n) = spec.max_episode_steps {
            env = Box::new(TimeLimit::new(env, n)?);
        }
        if spec.order_enforce {
            env = Box::new(OrderEnforcing::new(
                env,
                config.disable_render_order_enforcing,
            ));
        }
        if !spec.disable_env_checker {
            env = Box::new(EnvChecker::new(env));
        }

        debug!("Made {} with {:?}", id, spec);
        Ok(Box::new(SpecifiedEnv { env, spec }))
    }
}
