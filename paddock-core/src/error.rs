//! Errors in the library.
use std::path::PathBuf;
use thiserror::Error;

/// Typed faults raised by environments, wrappers, the registry, buffers and trainers.
///
/// Functions in this workspace return [`anyhow::Result`]; callers that need to react
/// to a specific fault recover it with `err.downcast_ref::<PaddockError>()`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaddockError {
    /// A space was constructed with inconsistent parameters.
    #[error("Invalid space: {0}")]
    InvalidSpace(String),

    /// An action outside of the declared action space.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// An observation outside of the declared observation space.
    #[error("Invalid observation: {0}")]
    InvalidObservation(String),

    /// `step` or `render` was called before `reset`.
    #[error("Cannot call `{0}` before `reset`")]
    ResetNeeded(String),

    /// The environment has been closed.
    #[error("Environment has been closed")]
    EnvClosed,

    /// No environment is registered with the given id.
    #[error("Environment `{0}` is not registered")]
    NotRegistered(String),

    /// The registered specification cannot be used to build an environment.
    #[error("Misconfigured registration of `{id}`: {reason}")]
    MisconfiguredRegistration {
        /// Id of the environment.
        id: String,
        /// What is missing or wrong.
        reason: String,
    },

    /// A configuration value is out of its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// `optimize_memory_usage` and `handle_timeout_termination` were both enabled.
    #[error("optimize_memory_usage and handle_timeout_termination cannot be enabled together")]
    IncompatibleBufferFlags,

    /// Sampling was requested from a buffer without transitions.
    #[error("Cannot sample from an empty replay buffer")]
    EmptyBuffer,

    /// The vectorized environment has been closed.
    #[error("Vectorized environment has been closed")]
    VecEnvClosed,

    /// A worker of a parallel vectorized environment failed.
    #[error("Worker {index} failed: {reason}")]
    WorkerFailed {
        /// Slot index of the worker.
        index: usize,
        /// Description of the failure.
        reason: String,
    },

    /// Training was requested without an environment attached.
    #[error("No environment is attached to the trainer")]
    NoEnvironment,

    /// A file required to restore a checkpoint does not exist.
    #[error("Missing artifact: {0:?}")]
    MissingArtifact(PathBuf),

    /// A checkpoint was written by a different algorithm.
    #[error("Checkpoint was saved by `{found}`, but `{expected}` was requested")]
    AlgorithmMismatch {
        /// Algorithm of the loader.
        expected: String,
        /// Algorithm recorded in the checkpoint.
        found: String,
    },

    /// A checkpoint was written with an unsupported format version.
    #[error("Checkpoint format version {found} is not supported (expected {expected})")]
    VersionMismatch {
        /// Supported version.
        expected: String,
        /// Version recorded in the checkpoint.
        found: String,
    },

    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),
}
