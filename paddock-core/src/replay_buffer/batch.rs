//! Row-major arrays and transition batches.
use crate::{
    error::PaddockError,
    space::{Space, Value},
};
use anyhow::Result;

/// A row-major `f32` array with rows of `dim` elements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArrayBatch {
    /// Elements, `len() * dim` of them.
    pub data: Vec<f32>,

    /// Number of elements in a row.
    pub dim: usize,
}

impl ArrayBatch {
    /// An array of `rows` rows filled with zeros.
    pub fn zeros(rows: usize, dim: usize) -> Self {
        Self {
            data: vec![0.0; rows * dim],
            dim,
        }
    }

    /// Stacks `rows`, each of which must have `dim` elements.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a [f32]>, dim: usize) -> Result<Self> {
        let mut data = vec![];
        for row in rows {
            if row.len() != dim {
                return Err(PaddockError::InvalidConfig(format!(
                    "row of {} elements in an array of dimension {}",
                    row.len(),
                    dim
                ))
                .into());
            }
            data.extend_from_slice(row);
        }
        Ok(Self { data, dim })
    }

    /// Packs `values` of `space` into rows.
    pub fn pack(space: &Space, values: &[Value]) -> Result<Self> {
        let dim = space.packed_dim();
        let mut data = Vec::with_capacity(values.len() * dim);
        for v in values.iter() {
            data.extend(space.pack(v)?);
        }
        Ok(Self { data, dim })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    /// Returns `true` if the array has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row `i`.
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    /// Overwrites row `i`.
    pub fn set_row(&mut self, i: usize, row: &[f32]) {
        self.data[i * self.dim..(i + 1) * self.dim].copy_from_slice(row);
    }

    /// Gathers the rows at `ixs`.
    pub fn sample(&self, ixs: &[usize]) -> Self {
        let mut data = Vec::with_capacity(ixs.len() * self.dim);
        for &i in ixs.iter() {
            data.extend_from_slice(self.row(i));
        }
        Self {
            data,
            dim: self.dim,
        }
    }

    /// Restores the values of `space` from the rows.
    pub fn unpack(&self, space: &Space) -> Result<Vec<Value>> {
        (0..self.len()).map(|i| space.unpack(self.row(i))).collect()
    }
}

/// Transitions of one vectorized step, one row per slot. The input of
/// [`ReplayBuffer::push`](super::ReplayBuffer).
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionBatch {
    /// Observations before the action.
    pub obs: ArrayBatch,

    /// Actions.
    pub act: ArrayBatch,

    /// Observations after the action.
    pub next_obs: ArrayBatch,

    /// Rewards.
    pub reward: Vec<f32>,

    /// Termination flags.
    pub is_terminated: Vec<i8>,

    /// Truncation flags.
    pub is_truncated: Vec<i8>,
}

impl TransitionBatch {
    /// Number of transitions.
    pub fn len(&self) -> usize {
        self.reward.len()
    }

    /// Returns `true` if there are no transitions.
    pub fn is_empty(&self) -> bool {
        self.reward.is_empty()
    }
}

/// A batch sampled from [`ReplayBuffer`](super::ReplayBuffer).
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayBatch {
    /// Observations.
    pub obs: ArrayBatch,

    /// Actions.
    pub act: ArrayBatch,

    /// Next observations.
    pub next_obs: ArrayBatch,

    /// Rewards.
    pub reward: Vec<f32>,

    /// `1.0` where the next observation must not be bootstrapped.
    pub done: Vec<f32>,

    /// Storage rows of the sampled transitions.
    pub ix_sample: Vec<usize>,
}

impl ReplayBatch {
    /// Number of transitions.
    pub fn len(&self) -> usize {
        self.reward.len()
    }

    /// Returns `true` if there are no transitions.
    pub fn is_empty(&self) -> bool {
        self.reward.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows() -> Result<()> {
        let mut a = ArrayBatch::zeros(3, 2);
        a.set_row(1, &[1.0, 2.0]);
        assert_eq!(a.len(), 3);
        assert_eq!(a.row(1), &[1.0, 2.0]);
        assert_eq!(a.sample(&[1, 1, 0]).data, vec![1.0, 2.0, 1.0, 2.0, 0.0, 0.0]);
        assert!(ArrayBatch::from_rows([&[1.0f32][..]], 2).is_err());

        let space = Space::discrete(4)?;
        let packed = ArrayBatch::pack(&space, &[Value::Discrete(3), Value::Discrete(1)])?;
        assert_eq!(packed.data, vec![3.0, 1.0]);
        assert_eq!(packed.unpack(&space)?, vec![Value::Discrete(3), Value::Discrete(1)]);
        Ok(())
    }
}
