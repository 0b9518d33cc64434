//! Pendulum.
use anyhow::Result;
use paddock_core::{
    error::PaddockError, record::Record, seeded_rng, Env, Info, Space, Step, Value,
};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

const MAX_SPEED: f32 = 8.0;
const MAX_TORQUE: f32 = 2.0;
const DT: f32 = 0.05;
const MASS: f32 = 1.0;
const LENGTH: f32 = 1.0;

/// Configuration of [`Pendulum`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PendulumConfig {
    /// Gravity.
    pub g: f32,
}

impl Default for PendulumConfig {
    fn default() -> Self {
        Self { g: 10.0 }
    }
}

fn angle_normalize(x: f32) -> f32 {
    (x + PI).rem_euclid(2.0 * PI) - PI
}

/// An inverted pendulum starting in a random position, to be swung up and kept
/// upright.
///
/// The observation is `[cos(theta), sin(theta), theta_dot]`, the action a torque in
/// `[-2, 2]`. The reward is `-(theta^2 + 0.1 theta_dot^2 + 0.001 torque^2)` with the
/// angle normalized to `[-pi, pi)`. The episode never terminates, registration adds a
/// time limit of 200 steps.
pub struct Pendulum {
    config: PendulumConfig,
    obs_space: Space,
    act_space: Space,
    state: Option<[f32; 2]>,
    rng: StdRng,
}

impl Pendulum {
    /// Constructs the environment.
    pub fn build(config: PendulumConfig) -> Result<Self> {
        Ok(Self {
            config,
            obs_space: Space::boxed(&[-1.0, -1.0, -MAX_SPEED], &[1.0, 1.0, MAX_SPEED], &[3])?,
            act_space: Space::boxed(&[-MAX_TORQUE], &[MAX_TORQUE], &[1])?,
            state: None,
            rng: seeded_rng(None),
        })
    }

    fn obs([theta, theta_dot]: [f32; 2]) -> Value {
        Value::Box(vec![theta.cos(), theta.sin(), theta_dot])
    }
}

impl Env for Pendulum {
    fn observation_space(&self) -> &Space {
        &self.obs_space
    }

    fn action_space(&self) -> &Space {
        &self.act_space
    }

    fn reset(&mut self, seed: Option<u64>, _options: Option<&Record>) -> Result<(Value, Info)> {
        if seed.is_some() {
            self.rng = seeded_rng(seed);
        }
        let state = [self.rng.gen_range(-PI..=PI), self.rng.gen_range(-1.0..=1.0)];
        self.state = Some(state);
        Ok((Self::obs(state), Record::empty()))
    }

    fn step(&mut self, act: &Value) -> Result<Step> {
        let [theta, theta_dot] = self
            .state
            .ok_or_else(|| PaddockError::ResetNeeded("step".into()))?;
        let u = match act.as_box() {
            Some([u]) if u.is_finite() => u.clamp(-MAX_TORQUE, MAX_TORQUE),
            _ => return Err(PaddockError::InvalidAction(format!("{:?}", act)).into()),
        };

        let g = self.config.g;
        let cost = angle_normalize(theta).powi(2) + 0.1 * theta_dot.powi(2) + 0.001 * u.powi(2);
        let theta_dot = (theta_dot
            + (3.0 * g / (2.0 * LENGTH) * theta.sin() + 3.0 / (MASS * LENGTH * LENGTH) * u) * DT)
            .clamp(-MAX_SPEED, MAX_SPEED);
        let theta = theta + theta_dot * DT;
        self.state = Some([theta, theta_dot]);

        Ok(Step::new(
            Self::obs([theta, theta_dot]),
            -cost,
            false,
            false,
            Record::empty(),
        ))
    }
}
