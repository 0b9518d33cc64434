//! Soft actor-critic (SAC) agent.
mod base;
mod config;
mod ent_coef;
mod model;
pub use base::{Sac, ENT_COEF_FILE, SAC_MODEL_FILE};
pub use config::SacConfig;
pub use ent_coef::{EntCoef, EntCoefMode};
pub use model::SacModel;
