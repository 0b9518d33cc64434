#![warn(missing_docs)]
//! Core components for reinforcement learning.
//!
//! * [`Env`] and [`Space`] define the environment contract, [`wrapper`] layers
//!   behavior on top of it and [`registry`] constructs environments by id.
//! * [`vector`] steps several environments in lockstep, in the calling thread or in
//!   worker threads.
//! * [`replay_buffer`] stores transitions and [`Trainer`] runs the off-policy loop
//!   driving an [`Agent`].
pub mod checkpoint;
pub mod dummy;
pub mod error;
pub mod evaluator;
pub mod record;
pub mod registry;
pub mod replay_buffer;
pub mod space;
pub mod util;
pub mod vector;
pub mod wrapper;

mod agent;
pub use agent::{Agent, Policy};

mod env;
pub use env::{seeded_rng, Env, Info, RenderFrame, Step};

mod schedule;
pub use schedule::Schedule;

mod trainer;
pub use trainer::{
    Callback, GradientSteps, StopAfterEpisodes, StopHandle, TrainFreq, TrainFreqUnit, Trainer,
    TrainerConfig,
};

pub use error::PaddockError;
pub use evaluator::{DefaultEvaluator, Evaluator};
pub use registry::{MakeConfig, Registry};
pub use replay_buffer::{ExperienceBufferBase, ReplayBufferBase};
pub use space::{Space, Value};
pub use vector::VecEnv;
