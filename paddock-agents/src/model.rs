//! Parameters of models.
use anyhow::Result;
use log::info;
use paddock_core::error::PaddockError;
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

/// Parameters of a model, flattened and identified by their names.
pub type Params = BTreeMap<String, Vec<f32>>;

/// Checks that `given` has the same names and sizes as `expected`.
pub fn check_params(expected: &Params, given: &Params) -> Result<()> {
    if expected.len() != given.len() {
        return Err(PaddockError::InvalidConfig(format!(
            "expected {} parameters, found {}",
            expected.len(),
            given.len()
        ))
        .into());
    }
    for (name, v) in expected.iter() {
        match given.get(name) {
            Some(w) if w.len() == v.len() => {}
            Some(w) => {
                return Err(PaddockError::InvalidConfig(format!(
                    "parameter `{}` has {} elements, expected {}",
                    name,
                    w.len(),
                    v.len()
                ))
                .into())
            }
            None => {
                return Err(
                    PaddockError::InvalidConfig(format!("parameter `{}` is missing", name)).into(),
                )
            }
        }
    }
    Ok(())
}

/// A model whose parameters can be read, written and persisted.
///
/// The default [`save`](ParamStore::save) and [`load`](ParamStore::load) write the
/// parameters as a JSON object.
pub trait ParamStore {
    /// A copy of the parameters.
    fn params(&self) -> Params;

    /// Overwrites the parameters. Names and sizes must match [`params`](Self::params).
    fn set_params(&mut self, params: &Params) -> Result<()>;

    /// Saves the parameters into a file.
    fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), &self.params())?;
        info!("Saved parameters to {:?}", path);
        Ok(())
    }

    /// Loads the parameters from a file.
    fn load(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(PaddockError::MissingArtifact(path.to_path_buf()).into());
        }
        let rdr = BufReader::new(File::open(path)?);
        let params: Params = serde_json::from_reader(rdr)?;
        self.set_params(&params)?;
        info!("Loaded parameters from {:?}", path);
        Ok(())
    }
}
