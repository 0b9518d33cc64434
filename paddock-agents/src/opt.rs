//! Optimizers.
use crate::model::{check_params, Params};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Configuration of the optimizer of a model.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// Stochastic gradient descent.
    Sgd {
        /// Learning rate.
        lr: f64,
    },

    /// Adam optimizer.
    Adam {
        /// Learning rate.
        lr: f64,
        #[serde(default = "default_beta1")]
        /// Decay of the first moment.
        beta1: f64,
        #[serde(default = "default_beta2")]
        /// Decay of the second moment.
        beta2: f64,
        #[serde(default = "default_eps")]
        /// Added to the denominator.
        eps: f64,
    },
}

fn default_beta1() -> f64 {
    0.9
}

fn default_beta2() -> f64 {
    0.999
}

fn default_eps() -> f64 {
    1e-8
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::Adam {
            lr: 1e-3,
            beta1: default_beta1(),
            beta2: default_beta2(),
            eps: default_eps(),
        }
    }
}

impl OptimizerConfig {
    /// Constructs [`Optimizer`].
    pub fn build(&self) -> Optimizer {
        Optimizer {
            lr: self.learning_rate(),
            config: self.clone(),
            t: 0,
            m: Params::new(),
            v: Params::new(),
        }
    }

    /// The initial learning rate.
    pub fn learning_rate(&self) -> f64 {
        match self {
            Self::Sgd { lr } => *lr,
            Self::Adam { lr, .. } => *lr,
        }
    }
}

/// Applies gradients to [`Params`].
pub struct Optimizer {
    config: OptimizerConfig,
    lr: f64,
    t: i32,
    m: Params,
    v: Params,
}

impl Optimizer {
    /// Overrides the learning rate, e.g. from a [`Schedule`](paddock_core::Schedule).
    pub fn set_learning_rate(&mut self, lr: f64) {
        self.lr = lr;
    }

    /// The current learning rate.
    pub fn learning_rate(&self) -> f64 {
        self.lr
    }

    /// Takes a step against `grads`, which must match `params` in names and sizes.
    pub fn backward_step(&mut self, params: &mut Params, grads: &Params) -> Result<()> {
        check_params(params, grads)?;
        let lr = self.lr as f32;
        match self.config {
            OptimizerConfig::Sgd { .. } => {
                for (name, p) in params.iter_mut() {
                    for (p, g) in p.iter_mut().zip(grads[name].iter()) {
                        *p -= lr * g;
                    }
                }
            }
            OptimizerConfig::Adam {
                beta1, beta2, eps, ..
            } => {
                self.t += 1;
                let (b1, b2) = (beta1 as f32, beta2 as f32);
                let c1 = 1.0 - b1.powi(self.t);
                let c2 = 1.0 - b2.powi(self.t);
                for (name, p) in params.iter_mut() {
                    let m = self
                        .m
                        .entry(name.clone())
                        .or_insert_with(|| vec![0.0; p.len()]);
                    let v = self
                        .v
                        .entry(name.clone())
                        .or_insert_with(|| vec![0.0; p.len()]);
                    for (((p, g), m), v) in p
                        .iter_mut()
                        .zip(grads[name].iter())
                        .zip(m.iter_mut())
                        .zip(v.iter_mut())
                    {
                        *m = b1 * *m + (1.0 - b1) * g;
                        *v = b2 * *v + (1.0 - b2) * g * g;
                        *p -= lr * (*m / c1) / ((*v / c2).sqrt() + eps as f32);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic(config: OptimizerConfig, steps: usize) -> Result<f32> {
        // Minimizes (x - 3)^2.
        let mut params = Params::from([("x".to_string(), vec![0.0])]);
        let mut opt = config.build();
        for _ in 0..steps {
            let x = params["x"][0];
            let grads = Params::from([("x".to_string(), vec![2.0 * (x - 3.0)])]);
            opt.backward_step(&mut params, &grads)?;
        }
        Ok(params["x"][0])
    }

    #[test]
    fn test_converges() -> Result<()> {
        assert!((quadratic(OptimizerConfig::Sgd { lr: 0.1 }, 100)? - 3.0).abs() < 1e-3);
        let adam = OptimizerConfig::Adam {
            lr: 0.1,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
        };
        assert!((quadratic(adam, 500)? - 3.0).abs() < 5e-2);
        Ok(())
    }

    #[test]
    fn test_mismatched_grads() {
        let mut params = Params::from([("x".to_string(), vec![0.0])]);
        let grads = Params::from([("y".to_string(), vec![0.0])]);
        let mut opt = OptimizerConfig::Sgd { lr: 0.1 }.build();
        assert!(opt.backward_step(&mut params, &grads).is_err());
    }
}
