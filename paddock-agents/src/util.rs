//! Utilities.
use crate::model::{check_params, Params};
use anyhow::Result;
use ordered_float::OrderedFloat;
use paddock_core::{replay_buffer::ArrayBatch, Space, Value};
use serde::{Deserialize, Serialize};

/// Critic loss type.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
pub enum CriticLoss {
    /// Mean squared error, `0.5 * d^2`.
    Mse,

    /// Smooth L1 (Huber) loss with threshold 1.
    SmoothL1,
}

impl CriticLoss {
    /// Loss of a difference `d = prediction - target`.
    pub fn loss(&self, d: f32) -> f32 {
        match self {
            Self::Mse => 0.5 * d * d,
            Self::SmoothL1 if d.abs() < 1.0 => 0.5 * d * d,
            Self::SmoothL1 => d.abs() - 0.5,
        }
    }

    /// Derivative of [`loss`](Self::loss) with respect to the prediction.
    pub fn grad(&self, d: f32) -> f32 {
        match self {
            Self::Mse => d,
            Self::SmoothL1 => d.clamp(-1.0, 1.0),
        }
    }
}

/// Apply soft update on parameters.
///
/// Parameters are identified by their names.
///
/// dest = tau * src + (1.0 - tau) * dest
pub fn track(dest: &mut Params, src: &Params, tau: f64) -> Result<()> {
    check_params(dest, src)?;
    let tau = tau as f32;
    for (name, d) in dest.iter_mut() {
        for (d, s) in d.iter_mut().zip(src[name].iter()) {
            *d = tau * s + (1.0 - tau) * *d;
        }
    }
    Ok(())
}

/// Index of the largest element, the first one on ties. `0` for an empty slice.
pub fn argmax(xs: &[f32]) -> usize {
    xs.iter()
        .enumerate()
        .max_by_key(|&(i, &x)| (OrderedFloat(x), std::cmp::Reverse(i)))
        .map_or(0, |(i, _)| i)
}

/// Flattened features of `values`, see [`Space::flatten`].
pub fn features(space: &Space, values: &[Value]) -> Result<ArrayBatch> {
    let dim = space.flat_dim();
    let mut data = Vec::with_capacity(values.len() * dim);
    for v in values.iter() {
        data.extend(space.flatten(v)?);
    }
    Ok(ArrayBatch { data, dim })
}

/// Flattened features of rows packed by the replay buffer.
pub fn features_of_rows(space: &Space, rows: &ArrayBatch) -> Result<ArrayBatch> {
    features(space, &rows.unpack(space)?)
}
