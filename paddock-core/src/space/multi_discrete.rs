//! Cartesian product of discrete ranges.
use crate::error::PaddockError;
use anyhow::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Vectors whose `i`-th entry is in `[start[i], start[i] + nvec[i])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiDiscrete {
    nvec: Vec<usize>,
    start: Vec<i64>,
}

impl MultiDiscrete {
    /// Constructs a space with all ranges starting at zero.
    pub fn new(nvec: &[usize]) -> Result<Self> {
        Self::with_start(nvec, &vec![0; nvec.len()])
    }

    /// Constructs a space with per-dimension offsets.
    pub fn with_start(nvec: &[usize], start: &[i64]) -> Result<Self> {
        if nvec.is_empty() || nvec.iter().any(|n| *n == 0) {
            return Err(PaddockError::InvalidSpace(format!(
                "MultiDiscrete needs non-empty positive nvec, got {:?}",
                nvec
            ))
            .into());
        }
        if start.len() != nvec.len() {
            return Err(PaddockError::InvalidSpace(format!(
                "start has {} entries, nvec has {}",
                start.len(),
                nvec.len()
            ))
            .into());
        }
        Ok(Self {
            nvec: nvec.to_vec(),
            start: start.to_vec(),
        })
    }

    /// Number of values per dimension.
    pub fn nvec(&self) -> &[usize] {
        &self.nvec
    }

    /// Smallest value per dimension.
    pub fn start(&self) -> &[i64] {
        &self.start
    }

    pub fn contains(&self, x: &[i64]) -> bool {
        x.len() == self.nvec.len()
            && x
                .iter()
                .zip(self.nvec.iter().zip(self.start.iter()))
                .all(|(v, (n, s))| *v >= *s && *v < *s + *n as i64)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<i64> {
        self.nvec
            .iter()
            .zip(self.start.iter())
            .map(|(n, s)| *s + rng.gen_range(0..*n) as i64)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_multi_discrete() -> Result<()> {
        let space = MultiDiscrete::with_start(&[2, 3], &[0, -1])?;
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            assert!(space.contains(&space.sample(&mut rng)));
        }
        assert!(space.contains(&[1, 1]));
        assert!(!space.contains(&[1, 2]));
        assert!(!space.contains(&[1]));
        assert!(MultiDiscrete::new(&[2, 0]).is_err());
        Ok(())
    }
}
