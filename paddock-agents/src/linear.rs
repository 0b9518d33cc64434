//! Linear action-value function.
use crate::{
    dqn::QModel,
    model::{check_params, ParamStore, Params},
    opt::{Optimizer, OptimizerConfig},
    util::CriticLoss,
};
use anyhow::Result;
use itertools::izip;
use paddock_core::{error::PaddockError, replay_buffer::ArrayBatch};
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Configuration of [`LinearQ`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LinearQConfig {
    /// Optimizer.
    pub opt_config: OptimizerConfig,

    /// Standard deviation of the initial weights, `0` for zeros.
    pub init_std: f32,

    /// Clips the norm of the gradient.
    pub max_grad_norm: Option<f32>,

    /// Seed of the initial weights.
    pub seed: u64,
}

impl Default for LinearQConfig {
    fn default() -> Self {
        Self {
            opt_config: OptimizerConfig::default(),
            init_std: 0.01,
            max_grad_norm: Some(10.0),
            seed: 42,
        }
    }
}

impl LinearQConfig {
    /// Sets the optimizer.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Sets the standard deviation of the initial weights.
    pub fn init_std(mut self, v: f32) -> Self {
        self.init_std = v;
        self
    }

    /// Sets the gradient clipping.
    pub fn max_grad_norm(mut self, v: Option<f32>) -> Self {
        self.max_grad_norm = v;
        self
    }
}

/// `Q(x) = W x + b` with one row of `W` per action.
///
/// Parameters are `"weight"` (row-major, `n_actions x in_dim`) and `"bias"`.
pub struct LinearQ {
    in_dim: usize,
    n_actions: usize,
    params: Params,
    max_grad_norm: Option<f32>,
    opt: Optimizer,
}

impl LinearQ {
    fn weight(&self) -> &[f32] {
        &self.params["weight"]
    }

    fn bias(&self) -> &[f32] {
        &self.params["bias"]
    }

    fn q(&self, x: &[f32], a: usize) -> f32 {
        let w = &self.weight()[a * self.in_dim..(a + 1) * self.in_dim];
        w.iter().zip(x.iter()).map(|(w, x)| w * x).sum::<f32>() + self.bias()[a]
    }

    fn check_input(&self, obs: &ArrayBatch) -> Result<()> {
        if obs.dim != self.in_dim {
            return Err(PaddockError::InvalidObservation(format!(
                "{} features given to a model of {} inputs",
                obs.dim, self.in_dim
            ))
            .into());
        }
        Ok(())
    }
}

impl ParamStore for LinearQ {
    fn params(&self) -> Params {
        self.params.clone()
    }

    fn set_params(&mut self, params: &Params) -> Result<()> {
        check_params(&self.params, params)?;
        self.params = params.clone();
        Ok(())
    }
}

impl QModel for LinearQ {
    type Config = LinearQConfig;

    fn build(config: &Self::Config, in_dim: usize, n_actions: usize) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let weight = match config.init_std > 0.0 {
            true => {
                let normal = Normal::new(0.0, config.init_std)?;
                (0..in_dim * n_actions).map(|_| normal.sample(&mut rng)).collect()
            }
            false => vec![0.0; in_dim * n_actions],
        };
        let params = Params::from([
            ("weight".to_string(), weight),
            ("bias".to_string(), vec![0.0; n_actions]),
        ]);
        Ok(Self {
            in_dim,
            n_actions,
            params,
            max_grad_norm: config.max_grad_norm,
            opt: config.opt_config.build(),
        })
    }

    fn forward(&self, obs: &ArrayBatch) -> Result<ArrayBatch> {
        self.check_input(obs)?;
        let data = (0..obs.len())
            .flat_map(|i| {
                let x = obs.row(i);
                (0..self.n_actions).map(move |a| self.q(x, a))
            })
            .collect();
        Ok(ArrayBatch {
            data,
            dim: self.n_actions,
        })
    }

    fn backward_step(
        &mut self,
        obs: &ArrayBatch,
        act: &[usize],
        target: &[f32],
        loss: CriticLoss,
    ) -> Result<f32> {
        self.check_input(obs)?;
        let n = obs.len();
        let mut grad_w = vec![0f32; self.in_dim * self.n_actions];
        let mut grad_b = vec![0f32; self.n_actions];
        let mut total = 0f32;

        for (i, &a, &y) in izip!(0..n, act.iter(), target.iter()) {
            if a >= self.n_actions {
                return Err(PaddockError::InvalidAction(format!("action index {}", a)).into());
            }
            let x = obs.row(i);
            let d = self.q(x, a) - y;
            total += loss.loss(d);
            let g = loss.grad(d) / n as f32;
            for (gw, x) in grad_w[a * self.in_dim..(a + 1) * self.in_dim]
                .iter_mut()
                .zip(x.iter())
            {
                *gw += g * x;
            }
            grad_b[a] += g;
        }

        if let Some(max_norm) = self.max_grad_norm {
            let norm = grad_w
                .iter()
                .chain(grad_b.iter())
                .map(|g| g * g)
                .sum::<f32>()
                .sqrt();
            if norm > max_norm {
                let scale = max_norm / norm;
                grad_w.iter_mut().chain(grad_b.iter_mut()).for_each(|g| *g *= scale);
            }
        }

        let grads = Params::from([("weight".to_string(), grad_w), ("bias".to_string(), grad_b)]);
        self.opt.backward_step(&mut self.params, &grads)?;
        Ok(total / n.max(1) as f32)
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.opt.set_learning_rate(lr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_fits_targets() -> Result<()> {
        let config = LinearQConfig::default()
            .opt_config(OptimizerConfig::Sgd { lr: 0.5 })
            .init_std(0.0);
        let mut q = LinearQ::build(&config, 2, 2)?;
        let obs = ArrayBatch::from_rows([&[1.0f32, 0.0][..], &[0.0f32, 1.0][..]], 2)?;
        let act = [0, 1];
        let target = [1.0, -1.0];

        let first = q.backward_step(&obs, &act, &target, CriticLoss::Mse)?;
        let mut last = first;
        for _ in 0..200 {
            last = q.backward_step(&obs, &act, &target, CriticLoss::Mse)?;
        }
        assert!(last < first * 1e-3);
        let values = q.forward(&obs)?;
        assert!((values.row(0)[0] - 1.0).abs() < 1e-2);
        assert!((values.row(1)[1] + 1.0).abs() < 1e-2);
        Ok(())
    }

    #[test]
    fn test_save_load() -> Result<()> {
        let config = LinearQConfig::default();
        let q = LinearQ::build(&config, 3, 2)?;
        let dir = TempDir::new("linear_q")?;
        let path = dir.path().join("qnet.json");
        q.save(&path)?;

        let mut q2 = LinearQ::build(&LinearQConfig { seed: 1, ..config }, 3, 2)?;
        assert_ne!(q.params(), q2.params());
        q2.load(&path)?;
        assert_eq!(q.params(), q2.params());

        let mut q3 = LinearQ::build(&LinearQConfig::default(), 4, 2)?;
        assert!(q3.load(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_wrong_input() -> Result<()> {
        let q = LinearQ::build(&LinearQConfig::default(), 3, 2)?;
        assert!(q.forward(&ArrayBatch::zeros(1, 2)).is_err());
        Ok(())
    }
}
