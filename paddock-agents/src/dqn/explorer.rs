//! Exploration strategies of DQN.
use crate::util::argmax;
use anyhow::Result;
use paddock_core::Schedule;
use rand::{distributions::WeightedIndex, Rng};
use serde::{Deserialize, Serialize};

/// Explorers for DQN.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum DqnExplorer {
    /// Softmax action selection.
    Softmax(Softmax),

    /// Epsilon-greedy action selection.
    EpsilonGreedy(EpsilonGreedy),
}

impl Default for DqnExplorer {
    fn default() -> Self {
        Self::EpsilonGreedy(EpsilonGreedy::default())
    }
}

impl DqnExplorer {
    /// Takes an action index given action values, at `progress_remaining` of training.
    pub fn action<R: Rng + ?Sized>(
        &self,
        q: &[f32],
        progress_remaining: f64,
        rng: &mut R,
    ) -> Result<usize> {
        match self {
            Self::Softmax(softmax) => softmax.action(q, rng),
            Self::EpsilonGreedy(egreedy) => {
                Ok(egreedy.action(q, egreedy.eps(progress_remaining), rng))
            }
        }
    }

    /// Probability of a uniformly random action, `None` for softmax.
    pub fn exploration_rate(&self, progress_remaining: f64) -> Option<f64> {
        match self {
            Self::Softmax(_) => None,
            Self::EpsilonGreedy(egreedy) => Some(egreedy.eps(progress_remaining)),
        }
    }
}

/// Softmax explorer for DQN.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct Softmax {
    /// Divides the action values before the softmax.
    pub temperature: f64,
}

impl Default for Softmax {
    fn default() -> Self {
        Self { temperature: 1.0 }
    }
}

impl Softmax {
    /// Samples an action with probability proportional to `exp(q / temperature)`.
    pub fn action<R: Rng + ?Sized>(&self, q: &[f32], rng: &mut R) -> Result<usize> {
        let t = self.temperature.max(1e-8);
        let max = q.iter().copied().fold(f32::NEG_INFINITY, f32::max) as f64;
        let weights = q
            .iter()
            .map(|&v| ((v as f64 - max) / t).exp())
            .collect::<Vec<_>>();
        Ok(rng.sample(WeightedIndex::new(&weights)?))
    }
}

/// Epsilon-greedy explorer for DQN.
///
/// Epsilon decreases linearly from `eps_start` to `eps_final` over the first
/// `exploration_fraction` of training, then stays at `eps_final`.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EpsilonGreedy {
    /// Epsilon at the start of training.
    pub eps_start: f64,

    /// Epsilon at the end of the exploration phase.
    pub eps_final: f64,

    /// Fraction of training over which epsilon decreases.
    pub exploration_fraction: f64,
}

impl Default for EpsilonGreedy {
    fn default() -> Self {
        Self {
            eps_start: 1.0,
            eps_final: 0.05,
            exploration_fraction: 0.1,
        }
    }
}

impl EpsilonGreedy {
    /// Constructs epsilon-greedy explorer.
    pub fn with_exploration_fraction(fraction: f64) -> DqnExplorer {
        DqnExplorer::EpsilonGreedy(Self {
            exploration_fraction: fraction,
            ..Self::default()
        })
    }

    /// Set the epsilon value at the final step.
    pub fn eps_final(mut self, v: f64) -> Self {
        self.eps_final = v;
        self
    }

    /// Set the epsilon value at the start.
    pub fn eps_start(mut self, v: f64) -> Self {
        self.eps_start = v;
        self
    }

    /// The schedule of epsilon.
    pub fn schedule(&self) -> Schedule {
        Schedule::Linear {
            start: self.eps_start,
            end: self.eps_final,
            end_fraction: self.exploration_fraction,
        }
    }

    /// Epsilon at `progress_remaining`.
    pub fn eps(&self, progress_remaining: f64) -> f64 {
        self.schedule().value(progress_remaining)
    }

    /// The greedy action with probability `1 - eps`, a uniformly random one otherwise.
    pub fn action<R: Rng + ?Sized>(&self, q: &[f32], eps: f64, rng: &mut R) -> usize {
        if rng.gen::<f64>() < eps {
            rng.gen_range(0..q.len().max(1))
        } else {
            argmax(q)
        }
    }
}
