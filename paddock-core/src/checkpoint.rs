//! Checkpoint directories.
//!
//! A checkpoint is a directory holding
//!
//! * the parameter files of the agent, one per named component, written by
//!   [`Agent::save_params`](crate::Agent::save_params),
//! * optionally the replay buffer in [`REPLAY_BUFFER_DIR`],
//! * [`METADATA_FILE`], a JSON document described by [`CheckpointMetadata`].
use crate::error::PaddockError;
use anyhow::Result;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

/// Version of the checkpoint layout written by this crate.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Name of the metadata file.
pub const METADATA_FILE: &str = "metadata.json";

/// Name of the replay buffer subdirectory.
pub const REPLAY_BUFFER_DIR: &str = "replay_buffer";

/// Contents of [`METADATA_FILE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Layout version.
    pub format_version: u32,

    /// Algorithm that wrote the checkpoint, see [`Agent::kind`](crate::Agent::kind).
    pub algorithm_kind: String,

    /// Environment steps taken when the checkpoint was written.
    pub num_timesteps: usize,

    /// Episodes finished when the checkpoint was written.
    pub num_episodes: usize,

    /// Gradient steps requested from the agent when the checkpoint was written.
    #[serde(default)]
    pub opt_steps: usize,

    /// Description of the learning rate schedule.
    pub learning_rate: String,

    /// Hyperparameters of the agent.
    pub hyperparams: serde_json::Value,

    /// Local time of writing, RFC 3339.
    pub saved_at: String,
}

impl CheckpointMetadata {
    /// Metadata stamped with the current version and time.
    pub fn new(
        algorithm_kind: impl Into<String>,
        num_timesteps: usize,
        num_episodes: usize,
        learning_rate: impl Into<String>,
        hyperparams: serde_json::Value,
    ) -> Self {
        Self {
            format_version: CHECKPOINT_VERSION,
            algorithm_kind: algorithm_kind.into(),
            num_timesteps,
            num_episodes,
            opt_steps: 0,
            learning_rate: learning_rate.into(),
            hyperparams,
            saved_at: Local::now().to_rfc3339(),
        }
    }

    /// Sets the number of gradient steps.
    pub fn with_opt_steps(mut self, v: usize) -> Self {
        self.opt_steps = v;
        self
    }

    /// Writes [`METADATA_FILE`] into `dir`.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let file = File::create(dir.as_ref().join(METADATA_FILE))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Reads [`METADATA_FILE`] from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let path = artifact(dir, METADATA_FILE)?;
        let rdr = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(rdr)?)
    }

    /// Checks that the checkpoint can be restored by an agent of `algorithm_kind`.
    pub fn check(&self, algorithm_kind: &str) -> Result<()> {
        if self.format_version != CHECKPOINT_VERSION {
            return Err(PaddockError::VersionMismatch {
                expected: CHECKPOINT_VERSION.to_string(),
                found: self.format_version.to_string(),
            }
            .into());
        }
        if self.algorithm_kind != algorithm_kind {
            return Err(PaddockError::AlgorithmMismatch {
                expected: algorithm_kind.to_string(),
                found: self.algorithm_kind.clone(),
            }
            .into());
        }
        Ok(())
    }
}

/// Path of the artifact `name` in `dir`, failing with
/// [`PaddockError::MissingArtifact`] if it does not exist.
pub fn artifact(dir: impl AsRef<Path>, name: &str) -> Result<PathBuf> {
    let path = dir.as_ref().join(name);
    match path.exists() {
        true => Ok(path),
        false => Err(PaddockError::MissingArtifact(path).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempdir::TempDir;

    #[test]
    fn test_metadata() -> Result<()> {
        let dir = TempDir::new("checkpoint")?;
        assert!(matches!(
            CheckpointMetadata::load(dir.path())
                .unwrap_err()
                .downcast_ref::<PaddockError>(),
            Some(PaddockError::MissingArtifact(_))
        ));

        let meta = CheckpointMetadata::new("dqn", 1000, 12, "constant(0.0001)", json!({"gamma": 0.99}))
            .with_opt_steps(250);
        meta.save(dir.path())?;
        let loaded = CheckpointMetadata::load(dir.path())?;
        assert_eq!(loaded, meta);
        assert_eq!(loaded.opt_steps, 250);
        assert!(loaded.check("dqn").is_ok());
        assert_eq!(
            loaded.check("sac").unwrap_err().downcast_ref::<PaddockError>(),
            Some(&PaddockError::AlgorithmMismatch {
                expected: "sac".into(),
                found: "dqn".into()
            })
        );

        let old = CheckpointMetadata {
            format_version: 0,
            ..meta
        };
        assert!(matches!(
            old.check("dqn").unwrap_err().downcast_ref::<PaddockError>(),
            Some(PaddockError::VersionMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_metadata_without_opt_steps() -> Result<()> {
        let dir = TempDir::new("checkpoint")?;
        let mut value = serde_json::to_value(CheckpointMetadata::new("sac", 10, 1, "constant(1)", json!({})))?;
        if let Some(object) = value.as_object_mut() {
            object.remove("opt_steps");
        }
        std::fs::write(dir.path().join(METADATA_FILE), value.to_string())?;
        assert_eq!(CheckpointMetadata::load(dir.path())?.opt_steps, 0);
        Ok(())
    }
}
