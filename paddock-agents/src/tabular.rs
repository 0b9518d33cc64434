//! Tabular Q-learning and SARSA.
//!
//! These agents interact with a single [`Env`](paddock_core::Env) whose observation and
//! action spaces are both [`Space::Discrete`](paddock_core::Space::Discrete), updating a
//! table of action values in place after every step.
mod base;
mod config;
pub use base::{TabularAgent, Q_TABLE_FILE};
pub use config::{TabularAlgorithm, TabularConfig};
