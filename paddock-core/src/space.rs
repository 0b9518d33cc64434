//! Spaces of observations and actions.
//!
//! A [`Space`] is a predicate over [`Value`]s together with a sampler. Primitive spaces
//! ([`Discrete`], [`BoxSpace`], [`MultiDiscrete`]) have a well-defined shape and element
//! type; composite spaces (tuples and dicts) hold heterogeneous children and defer
//! both to them.
//!
//! Besides membership and sampling, spaces convert values into flat `f32` rows in two
//! ways:
//!
//! * [`Space::flatten`] one-hot encodes discrete components. Models use it to featurize
//!   observations.
//! * [`Space::pack`] keeps a discrete value as a single number. The replay buffer stores
//!   packed rows and [`Space::unpack`] restores the value.
mod boxed;
mod discrete;
mod multi_discrete;
mod value;
use crate::error::PaddockError;
use anyhow::Result;
pub use boxed::BoxSpace;
pub use discrete::Discrete;
pub use multi_discrete::MultiDiscrete;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
pub use value::Value;

/// Element type of a primitive space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DType {
    /// Signed integers.
    Int64,
    /// Single precision reals.
    Float32,
}

/// The set of legal observations or actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Space {
    /// Integers in a range.
    Discrete(Discrete),

    /// Bounded real vectors.
    Box(BoxSpace),

    /// Vectors of independent integer ranges.
    MultiDiscrete(MultiDiscrete),

    /// Ordered composite of sub-spaces.
    Tuple(Vec<Space>),

    /// Named composite of sub-spaces.
    Dict(BTreeMap<String, Space>),
}

fn mismatch(space: &Space, value: &Value) -> anyhow::Error {
    PaddockError::InvalidObservation(format!(
        "a {} value does not fit {:?}",
        value.kind(),
        space
    ))
    .into()
}

impl Space {
    /// Shortcut of `Space::Discrete(Discrete::new(n)?)`.
    pub fn discrete(n: usize) -> Result<Self> {
        Ok(Self::Discrete(Discrete::new(n)?))
    }

    /// Shortcut of `Space::Box(BoxSpace::new(low, high, shape)?)`.
    pub fn boxed(low: &[f32], high: &[f32], shape: &[usize]) -> Result<Self> {
        Ok(Self::Box(BoxSpace::new(low, high, shape)?))
    }

    /// Shortcut of `Space::MultiDiscrete(MultiDiscrete::new(nvec)?)`.
    pub fn multi_discrete(nvec: &[usize]) -> Result<Self> {
        Ok(Self::MultiDiscrete(MultiDiscrete::new(nvec)?))
    }

    /// Returns the inner [`Discrete`], if any.
    pub fn as_discrete(&self) -> Option<&Discrete> {
        match self {
            Self::Discrete(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the inner [`BoxSpace`], if any.
    pub fn as_box(&self) -> Option<&BoxSpace> {
        match self {
            Self::Box(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` if `value` is a member of the space.
    ///
    /// Composite spaces check every child; a dict value must have exactly the keys of
    /// the space.
    pub fn contains(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Discrete(s), Value::Discrete(x)) => s.contains(*x),
            (Self::Box(s), Value::Box(x)) => s.contains(x),
            (Self::MultiDiscrete(s), Value::MultiDiscrete(x)) => s.contains(x),
            (Self::Tuple(ss), Value::Tuple(xs)) => {
                ss.len() == xs.len() && ss.iter().zip(xs.iter()).all(|(s, x)| s.contains(x))
            }
            (Self::Dict(ss), Value::Dict(xs)) => {
                ss.len() == xs.len()
                    && ss
                        .iter()
                        .all(|(k, s)| xs.get(k).map_or(false, |x| s.contains(x)))
            }
            _ => false,
        }
    }

    /// Draws a value uniformly from the space.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        match self {
            Self::Discrete(s) => Value::Discrete(s.sample(rng)),
            Self::Box(s) => Value::Box(s.sample(rng)),
            Self::MultiDiscrete(s) => Value::MultiDiscrete(s.sample(rng)),
            Self::Tuple(ss) => Value::Tuple(ss.iter().map(|s| s.sample(rng)).collect()),
            Self::Dict(ss) => Value::Dict(
                ss.iter()
                    .map(|(k, s)| (k.clone(), s.sample(rng)))
                    .collect(),
            ),
        }
    }

    /// Shape of the elements, `None` for composite spaces.
    pub fn shape(&self) -> Option<Vec<usize>> {
        match self {
            Self::Discrete(_) => Some(vec![]),
            Self::Box(s) => Some(s.shape().to_vec()),
            Self::MultiDiscrete(s) => Some(vec![s.nvec().len()]),
            Self::Tuple(_) | Self::Dict(_) => None,
        }
    }

    /// Element type, `None` for composite spaces.
    pub fn dtype(&self) -> Option<DType> {
        match self {
            Self::Discrete(_) | Self::MultiDiscrete(_) => Some(DType::Int64),
            Self::Box(_) => Some(DType::Float32),
            Self::Tuple(_) | Self::Dict(_) => None,
        }
    }

    /// Length of [`Space::flatten`] outputs.
    pub fn flat_dim(&self) -> usize {
        match self {
            Self::Discrete(s) => s.n(),
            Self::Box(s) => s.dim(),
            Self::MultiDiscrete(s) => s.nvec().iter().sum(),
            Self::Tuple(ss) => ss.iter().map(|s| s.flat_dim()).sum(),
            Self::Dict(ss) => ss.values().map(|s| s.flat_dim()).sum(),
        }
    }

    /// Encodes a member as a flat vector, one-hot encoding discrete components.
    pub fn flatten(&self, value: &Value) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(self.flat_dim());
        self.flatten_into(value, &mut out)?;
        Ok(out)
    }

    fn flatten_into(&self, value: &Value, out: &mut Vec<f32>) -> Result<()> {
        match (self, value) {
            (Self::Discrete(s), Value::Discrete(x)) => {
                let ix = s.index_of(*x).ok_or_else(|| mismatch(self, value))?;
                let mut onehot = vec![0f32; s.n()];
                onehot[ix] = 1.0;
                out.extend(onehot);
            }
            (Self::Box(s), Value::Box(x)) if x.len() == s.dim() => out.extend_from_slice(x),
            (Self::MultiDiscrete(s), Value::MultiDiscrete(xs)) if xs.len() == s.nvec().len() => {
                for ((x, n), st) in xs.iter().zip(s.nvec().iter()).zip(s.start().iter()) {
                    let ix = x - st;
                    if ix < 0 || ix >= *n as i64 {
                        return Err(mismatch(self, value));
                    }
                    let mut onehot = vec![0f32; *n];
                    onehot[ix as usize] = 1.0;
                    out.extend(onehot);
                }
            }
            (Self::Tuple(ss), Value::Tuple(xs)) if ss.len() == xs.len() => {
                for (s, x) in ss.iter().zip(xs.iter()) {
                    s.flatten_into(x, out)?;
                }
            }
            (Self::Dict(ss), Value::Dict(xs)) => {
                for (k, s) in ss.iter() {
                    let x = xs.get(k).ok_or_else(|| mismatch(self, value))?;
                    s.flatten_into(x, out)?;
                }
            }
            _ => return Err(mismatch(self, value)),
        }
        Ok(())
    }

    /// Length of [`Space::pack`] outputs.
    pub fn packed_dim(&self) -> usize {
        match self {
            Self::Discrete(_) => 1,
            Self::Box(s) => s.dim(),
            Self::MultiDiscrete(s) => s.nvec().len(),
            Self::Tuple(ss) => ss.iter().map(|s| s.packed_dim()).sum(),
            Self::Dict(ss) => ss.values().map(|s| s.packed_dim()).sum(),
        }
    }

    /// Encodes a value as a flat row of numbers without one-hot expansion.
    ///
    /// The value is only checked for structure, not for bounds.
    pub fn pack(&self, value: &Value) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(self.packed_dim());
        self.pack_into(value, &mut out)?;
        Ok(out)
    }

    fn pack_into(&self, value: &Value, out: &mut Vec<f32>) -> Result<()> {
        match (self, value) {
            (Self::Discrete(_), Value::Discrete(x)) => out.push(*x as f32),
            (Self::Box(s), Value::Box(x)) if x.len() == s.dim() => out.extend_from_slice(x),
            (Self::MultiDiscrete(s), Value::MultiDiscrete(xs)) if xs.len() == s.nvec().len() => {
                out.extend(xs.iter().map(|x| *x as f32))
            }
            (Self::Tuple(ss), Value::Tuple(xs)) if ss.len() == xs.len() => {
                for (s, x) in ss.iter().zip(xs.iter()) {
                    s.pack_into(x, out)?;
                }
            }
            (Self::Dict(ss), Value::Dict(xs)) => {
                for (k, s) in ss.iter() {
                    let x = xs.get(k).ok_or_else(|| mismatch(self, value))?;
                    s.pack_into(x, out)?;
                }
            }
            _ => return Err(mismatch(self, value)),
        }
        Ok(())
    }

    /// Inverse of [`Space::pack`].
    pub fn unpack(&self, row: &[f32]) -> Result<Value> {
        if row.len() != self.packed_dim() {
            return Err(PaddockError::InvalidObservation(format!(
                "row of length {} cannot be unpacked into {:?}",
                row.len(),
                self
            ))
            .into());
        }
        let mut offset = 0;
        Ok(self.unpack_from(row, &mut offset))
    }

    fn unpack_from(&self, row: &[f32], offset: &mut usize) -> Value {
        let n = self.packed_dim();
        let xs = &row[*offset..*offset + n];
        match self {
            Self::Discrete(_) => {
                *offset += n;
                Value::Discrete(xs[0].round() as i64)
            }
            Self::Box(_) => {
                *offset += n;
                Value::Box(xs.to_vec())
            }
            Self::MultiDiscrete(_) => {
                *offset += n;
                Value::MultiDiscrete(xs.iter().map(|x| x.round() as i64).collect())
            }
            Self::Tuple(ss) => Value::Tuple(ss.iter().map(|s| s.unpack_from(row, offset)).collect()),
            Self::Dict(ss) => Value::Dict(
                ss.iter()
                    .map(|(k, s)| (k.clone(), s.unpack_from(row, offset)))
                    .collect(),
            ),
        }
    }
}
