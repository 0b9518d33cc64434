//! Hyperparameters that change over the course of training.
use serde::{Deserialize, Serialize};

/// A value driven by the remaining progress of training, which goes from `1` at the
/// start of [`Trainer::learn`](crate::Trainer::learn) to `0` at its end.
///
/// ```
/// use paddock_core::Schedule;
///
/// let eps = Schedule::Linear { start: 1.0, end: 0.05, end_fraction: 0.1 };
/// assert_eq!(eps.value(1.0), 1.0);
/// assert!((eps.value(0.95) - 0.525).abs() < 1e-9);
/// assert_eq!(eps.value(0.5), 0.05);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Schedule {
    /// The same value throughout.
    Constant(f64),

    /// Linear interpolation from `start` to `end` over the first `end_fraction` of
    /// training, then `end`.
    Linear {
        /// Value at the start.
        start: f64,
        /// Final value.
        end: f64,
        /// Fraction of training over which the value moves.
        end_fraction: f64,
    },
}

impl Schedule {
    /// The value at `progress_remaining`.
    pub fn value(&self, progress_remaining: f64) -> f64 {
        match self {
            Self::Constant(v) => *v,
            Self::Linear {
                start,
                end,
                end_fraction,
            } => {
                let progress = 1.0 - progress_remaining;
                if progress >= *end_fraction {
                    *end
                } else {
                    start + progress * (end - start) / end_fraction
                }
            }
        }
    }

    /// Human-readable form, stored in checkpoint metadata.
    pub fn description(&self) -> String {
        match self {
            Self::Constant(v) => format!("constant({})", v),
            Self::Linear {
                start,
                end,
                end_fraction,
            } => format!(
                "linear({} -> {} over {}% of training)",
                start,
                end,
                end_fraction * 100.0
            ),
        }
    }
}

impl From<f64> for Schedule {
    fn from(v: f64) -> Self {
        Self::Constant(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedules() {
        assert_eq!(Schedule::Constant(3e-4).value(0.3), 3e-4);
        assert_eq!(Schedule::from(0.5).description(), "constant(0.5)");

        let lr = Schedule::Linear {
            start: 1e-3,
            end: 0.0,
            end_fraction: 1.0,
        };
        assert!((lr.value(0.25) - 2.5e-4).abs() < 1e-12);
        assert_eq!(lr.value(0.0), 0.0);
        assert_eq!(lr.description(), "linear(0.001 -> 0 over 100% of training)");

        // A zero fraction jumps straight to the end value.
        let step = Schedule::Linear {
            start: 1.0,
            end: 0.1,
            end_fraction: 0.0,
        };
        assert_eq!(step.value(1.0), 0.1);
    }
}
