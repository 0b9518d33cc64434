//! Replay buffer.
//!
//! [`ReplayBuffer`] stores transitions collected from a vectorized environment in a
//! fixed-size ring and samples uniform batches from it. [`StepProcessor`] turns the
//! output of [`VecEnv::step`](crate::vector::VecEnv::step) into the
//! [`TransitionBatch`]es the buffer consumes.
//!
//! ```
//! use paddock_core::{
//!     dummy::DummyEnv,
//!     replay_buffer::{ReplayBuffer, ReplayBufferBase, ReplayBufferConfig, StepProcessor},
//!     vector::{SyncVecEnv, VecEnv},
//!     ExperienceBufferBase, Value,
//! };
//!
//! let mut venv = SyncVecEnv::new(vec![DummyEnv::new(Some(3)).unwrap()]).unwrap();
//! let obs_space = venv.single_observation_space().clone();
//! let act_space = venv.single_action_space().clone();
//! let config = ReplayBufferConfig::default().capacity(100);
//! let mut buffer = ReplayBuffer::build(&config, &obs_space, &act_space, 1).unwrap();
//! let mut step_proc = StepProcessor::new(&obs_space, &act_space);
//!
//! step_proc.reset(venv.reset(Some(0), None).unwrap().0);
//! for _ in 0..10 {
//!     let acts = vec![Value::Discrete(0)];
//!     let step = venv.step(&acts).unwrap();
//!     buffer.push(step_proc.process(&acts, &step).unwrap()).unwrap();
//! }
//! assert_eq!(buffer.len(), 10);
//! let batch = buffer.batch(4).unwrap();
//! assert_eq!(batch.len(), 4);
//! ```
mod base;
mod batch;
mod config;
mod step_proc;
use anyhow::Result;
pub use base::{BufferMeta, ReplayBuffer};
pub use batch::{ArrayBatch, ReplayBatch, TransitionBatch};
pub use config::ReplayBufferConfig;
pub use step_proc::StepProcessor;

/// Interface for buffers that store experiences from environments.
pub trait ExperienceBufferBase {
    /// Items pushed into the buffer.
    type Item;

    /// Pushes an item into the buffer.
    fn push(&mut self, tr: Self::Item) -> Result<()>;

    /// The number of items in the buffer.
    fn len(&self) -> usize;

    /// Returns `true` if the buffer holds no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Interface of replay buffers generating batches used to train agents.
pub trait ReplayBufferBase {
    /// Batch generated from the buffer.
    type Batch;

    /// Constructs a batch of `size` samples.
    fn batch(&mut self, size: usize) -> Result<Self::Batch>;
}
