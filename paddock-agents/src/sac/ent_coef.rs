//! Entropy coefficient of SAC.
use crate::{
    model::{ParamStore, Params},
    opt::{Optimizer, OptimizerConfig},
};
use anyhow::Result;
use paddock_core::error::PaddockError;
use serde::{Deserialize, Serialize};

/// Mode of the entropy coefficient of SAC.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum EntCoefMode {
    /// Use a constant as alpha.
    Fix(f64),

    /// Automatic tuning of `log(alpha)`.
    Auto {
        /// Target entropy, `-act_dim` if not given.
        target_entropy: Option<f64>,

        /// Learning rate of `log(alpha)`.
        learning_rate: f64,
    },
}

impl Default for EntCoefMode {
    fn default() -> Self {
        Self::Auto {
            target_entropy: None,
            learning_rate: 3e-4,
        }
    }
}

/// The entropy coefficient of SAC.
///
/// The parameter is `log(alpha)`, so alpha stays positive whatever the updates.
pub struct EntCoef {
    params: Params,
    target_entropy: Option<f64>,
    opt: Option<Optimizer>,
}

impl EntCoef {
    /// Constructs an instance of `EntCoef` for an action space of `act_dim` components.
    pub fn new(mode: EntCoefMode, act_dim: usize) -> Result<Self> {
        let (log_alpha, target_entropy, opt) = match mode {
            EntCoefMode::Fix(alpha) if alpha > 0.0 => (alpha.ln(), None, None),
            EntCoefMode::Fix(alpha) => {
                return Err(PaddockError::InvalidConfig(format!(
                    "entropy coefficient must be positive, got {}",
                    alpha
                ))
                .into())
            }
            EntCoefMode::Auto {
                target_entropy,
                learning_rate,
            } => {
                let opt = OptimizerConfig::Adam {
                    lr: learning_rate,
                    beta1: 0.9,
                    beta2: 0.999,
                    eps: 1e-8,
                }
                .build();
                let target = target_entropy.unwrap_or(-(act_dim as f64));
                (0.0, Some(target), Some(opt))
            }
        };

        Ok(Self {
            params: Params::from([("log_alpha".to_string(), vec![log_alpha as f32])]),
            target_entropy,
            opt,
        })
    }

    fn log_alpha(&self) -> f32 {
        self.params["log_alpha"][0]
    }

    /// Returns the entropy coefficient.
    pub fn alpha(&self) -> f32 {
        self.log_alpha().exp()
    }

    /// The target entropy, `None` when alpha is fixed.
    pub fn target_entropy(&self) -> Option<f64> {
        self.target_entropy
    }

    /// Update the parameter given log-probabilities of actions sampled from the
    /// current policy.
    ///
    /// The loss is `-log_alpha * mean(logp + target_entropy)`.
    pub fn update(&mut self, logp: &[f32]) -> Result<()> {
        if let (Some(target), Some(opt)) = (self.target_entropy, &mut self.opt) {
            if logp.is_empty() {
                return Ok(());
            }
            let mean = logp.iter().sum::<f32>() / logp.len() as f32;
            let grad = -(mean + target as f32);
            let grads = Params::from([("log_alpha".to_string(), vec![grad])]);
            opt.backward_step(&mut self.params, &grads)?;
        }
        Ok(())
    }
}

impl ParamStore for EntCoef {
    fn params(&self) -> Params {
        self.params.clone()
    }

    fn set_params(&mut self, params: &Params) -> Result<()> {
        crate::model::check_params(&self.params, params)?;
        self.params = params.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed() -> Result<()> {
        let mut ent_coef = EntCoef::new(EntCoefMode::Fix(0.2), 1)?;
        ent_coef.update(&[10.0, -10.0])?;
        assert!((ent_coef.alpha() - 0.2).abs() < 1e-6);
        assert!(EntCoef::new(EntCoefMode::Fix(0.0), 1).is_err());
        Ok(())
    }

    #[test]
    fn test_auto() -> Result<()> {
        let mut ent_coef = EntCoef::new(EntCoefMode::default(), 2)?;
        assert_eq!(ent_coef.target_entropy(), Some(-2.0));
        assert_eq!(ent_coef.alpha(), 1.0);

        // Entropy above target: alpha decreases but stays positive.
        for _ in 0..10_000 {
            ent_coef.update(&[-50.0])?;
        }
        let alpha = ent_coef.alpha();
        assert!(alpha > 0.0 && alpha < 1.0);

        // Entropy below target: alpha increases.
        for _ in 0..2000 {
            ent_coef.update(&[5.0])?;
        }
        assert!(ent_coef.alpha() > alpha);
        Ok(())
    }
}
