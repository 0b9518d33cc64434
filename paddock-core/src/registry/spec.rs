//! Registration metadata of environments.
use crate::{env::Env, error::PaddockError};
use anyhow::Result;
use std::{collections::BTreeMap, fmt, sync::Arc};

/// Keyword arguments of environment and wrapper factories.
pub type Kwargs = BTreeMap<String, serde_json::Value>;

/// Builds a base environment from keyword arguments.
pub type EnvFactory = Arc<dyn Fn(&Kwargs) -> Result<Box<dyn Env>> + Send + Sync>;

/// Wraps an environment given keyword arguments.
pub type WrapperFactory = Arc<dyn Fn(Box<dyn Env>, &Kwargs) -> Result<Box<dyn Env>> + Send + Sync>;

/// Splits an id of the form `[namespace/]name[-vN]`.
///
/// ```
/// use paddock_core::registry::parse_env_id;
///
/// let (ns, name, version) = parse_env_id("toy/Chain-v3").unwrap();
/// assert_eq!(ns.as_deref(), Some("toy"));
/// assert_eq!(name, "Chain");
/// assert_eq!(version, Some(3));
/// ```
pub fn parse_env_id(id: &str) -> Result<(Option<String>, String, Option<u32>)> {
    let invalid = || PaddockError::InvalidConfig(format!("malformed environment id `{}`", id));
    let (namespace, rest) = match id.rfind('/') {
        Some(i) => (Some(&id[..i]), &id[i + 1..]),
        None => (None, id),
    };
    let (name, version) = match rest.rfind("-v") {
        Some(i)
            if i + 2 < rest.len() && rest[i + 2..].chars().all(|c| c.is_ascii_digit()) =>
        {
            let version = rest[i + 2..].parse::<u32>().map_err(|_| invalid())?;
            (&rest[..i], Some(version))
        }
        _ => (rest, None),
    };
    let valid_name = |s: &str| {
        !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
    };
    if !valid_name(name) || !namespace.map_or(true, valid_name) {
        return Err(invalid().into());
    }
    Ok((namespace.map(String::from), name.to_string(), version))
}

/// A wrapper applied by [`Registry::make`](super::Registry::make) after the base
/// environment is built.
#[derive(Clone)]
pub struct WrapperSpec {
    /// Name, for introspection.
    pub name: String,

    /// Factory of the wrapper.
    pub entry_point: Option<WrapperFactory>,

    /// Arguments passed to the factory.
    pub kwargs: Kwargs,
}

impl WrapperSpec {
    /// Constructs a wrapper specification.
    pub fn new(
        name: impl Into<String>,
        entry_point: impl Fn(Box<dyn Env>, &Kwargs) -> Result<Box<dyn Env>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            entry_point: Some(Arc::new(entry_point)),
            kwargs: Kwargs::new(),
        }
    }

    /// Constructs a specification without a factory, which `make` rejects.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entry_point: None,
            kwargs: Kwargs::new(),
        }
    }

    /// Adds a keyword argument.
    pub fn kwarg(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.kwargs.insert(key.into(), value);
        self
    }
}

impl fmt::Debug for WrapperSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapperSpec")
            .field("name", &self.name)
            .field("entry_point", &self.entry_point.as_ref().map(|_| "<fn>"))
            .field("kwargs", &self.kwargs)
            .finish()
    }
}

/// Specification of a registered environment.
///
/// Built with chained setters:
///
/// ```
/// use paddock_core::{dummy::DummyEnv, registry::EnvSpec, Env};
///
/// let spec = EnvSpec::new("Dummy-v0")
///     .unwrap()
///     .entry_point(|_| Ok(Box::new(DummyEnv::new(Some(3))?) as Box<dyn Env>))
///     .max_episode_steps(10);
/// assert_eq!(spec.name, "Dummy");
/// ```
#[derive(Clone)]
pub struct EnvSpec {
    /// Full id.
    pub id: String,

    /// Namespace parsed from the id.
    pub namespace: Option<String>,

    /// Name parsed from the id.
    pub name: String,

    /// Version parsed from the id.
    pub version: Option<u32>,

    /// Factory of the base environment.
    pub entry_point: Option<EnvFactory>,

    /// Return at which the task is considered solved.
    pub reward_threshold: Option<f32>,

    /// The environment is not deterministic even when seeded.
    pub nondeterministic: bool,

    /// Step limit applied with [`TimeLimit`](crate::wrapper::TimeLimit).
    pub max_episode_steps: Option<usize>,

    /// Whether to apply [`OrderEnforcing`](crate::wrapper::OrderEnforcing).
    pub order_enforce: bool,

    /// Whether to skip [`EnvChecker`](crate::wrapper::EnvChecker).
    pub disable_env_checker: bool,

    /// Default keyword arguments of the factory.
    pub kwargs: Kwargs,

    /// Wrappers applied around the base environment, innermost first.
    pub additional_wrappers: Vec<WrapperSpec>,
}

impl EnvSpec {
    /// Constructs a specification without an entry point.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let (namespace, name, version) = parse_env_id(&id)?;
        Ok(Self {
            id,
            namespace,
            name,
            version,
            entry_point: None,
            reward_threshold: None,
            nondeterministic: false,
            max_episode_steps: None,
            order_enforce: true,
            disable_env_checker: false,
            kwargs: Kwargs::new(),
            additional_wrappers: vec![],
        })
    }

    /// Sets the factory of the base environment.
    pub fn entry_point(
        mut self,
        f: impl Fn(&Kwargs) -> Result<Box<dyn Env>> + Send + Sync + 'static,
    ) -> Self {
        self.entry_point = Some(Arc::new(f));
        self
    }

    /// Sets the reward threshold.
    pub fn reward_threshold(mut self, v: f32) -> Self {
        self.reward_threshold = Some(v);
        self
    }

    /// Sets the nondeterministic flag.
    pub fn nondeterministic(mut self, v: bool) -> Self {
        self.nondeterministic = v;
        self
    }

    /// Sets the step limit.
    pub fn max_episode_steps(mut self, v: usize) -> Self {
        self.max_episode_steps = Some(v);
        self
    }

    /// Sets whether order is enforced.
    pub fn order_enforce(mut self, v: bool) -> Self {
        self.order_enforce = v;
        self
    }

    /// Sets whether the env checker is skipped.
    pub fn disable_env_checker(mut self, v: bool) -> Self {
        self.disable_env_checker = v;
        self
    }

    /// Adds a default keyword argument.
    pub fn kwarg(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.kwargs.insert(key.into(), value);
        self
    }

    /// Appends an additional wrapper.
    pub fn additional_wrapper(mut self, wrapper: WrapperSpec) -> Self {
        self.additional_wrappers.push(wrapper);
        self
    }
}

impl fmt::Debug for EnvSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvSpec")
            .field("id", &self.id)
            .field("entry_point", &self.entry_point.as_ref().map(|_| "<fn>"))
            .field("reward_threshold", &self.reward_threshold)
            .field("nondeterministic", &self.nondeterministic)
            .field("max_episode_steps", &self.max_episode_steps)
            .field("order_enforce", &self.order_enforce)
            .field("disable_env_checker", &self.disable_env_checker)
            .field("kwargs", &self.kwargs)
            .field("additional_wrappers", &self.additional_wrappers)
            .finish()
    }
}
