//! Finite set of integers.
use crate::error::PaddockError;
use anyhow::Result;
use rand::{distributions::WeightedIndex, Rng};
use serde::{Deserialize, Serialize};

/// Integers in `[start, start + n)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrete {
    n: usize,
    start: i64,
}

impl Discrete {
    /// Constructs `{0, 1, ..., n - 1}`.
    pub fn new(n: usize) -> Result<Self> {
        Self::with_start(n, 0)
    }

    /// Constructs `{start, ..., start + n - 1}`.
    pub fn with_start(n: usize, start: i64) -> Result<Self> {
        if n == 0 {
            return Err(PaddockError::InvalidSpace("Discrete space needs n > 0".into()).into());
        }
        Ok(Self { n, start })
    }

    /// The number of elements.
    pub fn n(&self) -> usize {
        self.n
    }

    /// The smallest element.
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Position of `x` in the space, `x - start`, if `x` is a member.
    pub fn index_of(&self, x: i64) -> Option<usize> {
        if self.contains(x) {
            Some((x - self.start) as usize)
        } else {
            None
        }
    }

    /// Returns `true` if `x` is in `[start, start + n)`.
    pub fn contains(&self, x: i64) -> bool {
        x >= self.start && x < self.start + self.n as i64
    }

    /// Draws an element uniformly.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        self.start + rng.gen_range(0..self.n) as i64
    }

    /// Draws uniformly among the elements whose mask entry is `true`.
    ///
    /// If no entry is `true`, `start` is returned.
    pub fn sample_masked<R: Rng + ?Sized>(&self, rng: &mut R, mask: &[bool]) -> Result<i64> {
        if mask.len() != self.n {
            return Err(PaddockError::InvalidAction(format!(
                "mask of length {} given for Discrete({})",
                mask.len(),
                self.n
            ))
            .into());
        }
        let valid = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &m)| if m { Some(i) } else { None })
            .collect::<Vec<_>>();
        if valid.is_empty() {
            return Ok(self.start);
        }
        Ok(self.start + valid[rng.gen_range(0..valid.len())] as i64)
    }

    /// Draws an element following the given probabilities.
    ///
    /// `probs` must have length `n`, be non-negative and sum to one.
    pub fn sample_with_probability<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        probs: &[f32],
    ) -> Result<i64> {
        if probs.len() != self.n {
            return Err(PaddockError::InvalidAction(format!(
                "probability of length {} given for Discrete({})",
                probs.len(),
                self.n
            ))
            .into());
        }
        if probs.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(
                PaddockError::InvalidAction("probabilities must be non-negative".into()).into(),
            );
        }
        let total: f32 = probs.iter().sum();
        if (total - 1.0).abs() > 1e-4 {
            return Err(PaddockError::InvalidAction(format!(
                "probabilities sum to {}, expected 1",
                total
            ))
            .into());
        }
        let dist = WeightedIndex::new(probs)?;
        Ok(self.start + rng.sample(dist) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_sample_in_range() -> Result<()> {
        let space = Discrete::with_start(5, -2)?;
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let x = space.sample(&mut rng);
            assert!(space.contains(x));
            assert!((-2..3).contains(&x));
        }
        Ok(())
    }

    #[test]
    fn test_all_false_mask_returns_start() -> Result<()> {
        let space = Discrete::with_start(3, 7)?;
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(space.sample_masked(&mut rng, &[false, false, false])?, 7);
        for _ in 0..100 {
            assert_eq!(space.sample_masked(&mut rng, &[false, true, false])?, 8);
        }
        assert!(space.sample_masked(&mut rng, &[true]).is_err());
        Ok(())
    }

    #[test]
    fn test_probability_override() -> Result<()> {
        let space = Discrete::new(3)?;
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(space.sample_with_probability(&mut rng, &[0.0, 0.0, 1.0])?, 2);
        }
        assert!(space
            .sample_with_probability(&mut rng, &[0.5, 0.2, 0.2])
            .is_err());
        Ok(())
    }

    #[test]
    fn test_zero_elements() {
        let err = Discrete::new(0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PaddockError>(),
            Some(PaddockError::InvalidSpace(_))
        ));
    }
}
