//! Elementwise-bounded real vectors.
use crate::error::PaddockError;
use anyhow::Result;
use rand::Rng;
use rand_distr::{Exp1, StandardNormal};
use serde::{Deserialize, Serialize};

/// A product of real intervals `[low[i], high[i]]`.
///
/// Bounds may be infinite. Elements are stored flattened in row-major order, `shape`
/// only records how they are laid out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    low: Vec<f32>,
    high: Vec<f32>,
    shape: Vec<usize>,
}

fn broadcast(name: &str, v: &[f32], n: usize) -> Result<Vec<f32>> {
    match v.len() {
        1 => Ok(vec![v[0]; n]),
        m if m == n => Ok(v.to_vec()),
        m => Err(PaddockError::InvalidSpace(format!(
            "`{}` has {} elements but the shape holds {}",
            name, m, n
        ))
        .into()),
    }
}

impl BoxSpace {
    /// Constructs a box space.
    ///
    /// `low` and `high` either have one element, broadcast over the shape, or exactly as
    /// many elements as the shape holds.
    pub fn new(low: &[f32], high: &[f32], shape: &[usize]) -> Result<Self> {
        let n = shape.iter().product::<usize>();
        if n == 0 {
            return Err(PaddockError::InvalidSpace("Box space needs a non-empty shape".into()).into());
        }
        let low = broadcast("low", low, n)?;
        let high = broadcast("high", high, n)?;
        for (i, (l, h)) in low.iter().zip(high.iter()).enumerate() {
            if l.is_nan() || h.is_nan() || l > h {
                return Err(PaddockError::InvalidSpace(format!(
                    "low[{}] = {} must not exceed high[{}] = {}",
                    i, l, i, h
                ))
                .into());
            }
        }
        Ok(Self {
            low,
            high,
            shape: shape.to_vec(),
        })
    }

    /// Constructs a box space with the same bounds on every element.
    pub fn uniform(low: f32, high: f32, shape: &[usize]) -> Result<Self> {
        Self::new(&[low], &[high], shape)
    }

    /// Lower bounds.
    pub fn low(&self) -> &[f32] {
        &self.low
    }

    /// Upper bounds.
    pub fn high(&self) -> &[f32] {
        &self.high
    }

    /// Shape of the elements.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The number of scalars in an element.
    pub fn dim(&self) -> usize {
        self.low.len()
    }

    /// Returns `true` if all bounds are finite.
    pub fn is_bounded(&self) -> bool {
        self.low.iter().chain(self.high.iter()).all(|v| v.is_finite())
    }

    /// Returns `true` if `x` has the right size and lies within the bounds.
    pub fn contains(&self, x: &[f32]) -> bool {
        x.len() == self.low.len()
            && x
                .iter()
                .zip(self.low.iter().zip(self.high.iter()))
                .all(|(v, (l, h))| *v >= *l && *v <= *h)
    }

    /// Draws an element.
    ///
    /// Bounded dimensions are uniform, half-bounded dimensions are shifted exponentials
    /// and unbounded dimensions are standard normal.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f32> {
        self.low
            .iter()
            .zip(self.high.iter())
            .map(|(&l, &h)| match (l.is_finite(), h.is_finite()) {
                (true, true) => {
                    if l == h {
                        l
                    } else {
                        // `h - l` can overflow f32.
                        let x = rng.gen_range(l as f64..=h as f64) as f32;
                        x.clamp(l, h)
                    }
                }
                (true, false) => l + rng.sample::<f32, _>(Exp1),
                (false, true) => h - rng.sample::<f32, _>(Exp1),
                (false, false) => rng.sample::<f32, _>(StandardNormal),
            })
            .collect()
    }

    /// Clips each element of `x` into the bounds.
    pub fn clip(&self, x: &[f32]) -> Vec<f32> {
        x.iter()
            .zip(self.low.iter().zip(self.high.iter()))
            .map(|(v, (l, h))| v.max(*l).min(*h))
            .collect()
    }
}
