//! DQN agent.
mod base;
mod config;
mod explorer;
mod model;
pub use base::{Dqn, QNET_FILE, QNET_TGT_FILE};
pub use config::DqnConfig;
pub use explorer::{DqnExplorer, EpsilonGreedy, Softmax};
pub use model::QModel;
