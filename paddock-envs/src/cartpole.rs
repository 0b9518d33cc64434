//! CartPole.
use anyhow::Result;
use log::warn;
use paddock_core::{
    error::PaddockError, record::Record, seeded_rng, Env, Info, Space, Step, Value,
};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Configuration of [`CartPole`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CartPoleConfig {
    /// Gravity.
    pub gravity: f32,

    /// Mass of the cart.
    pub masscart: f32,

    /// Mass of the pole.
    pub masspole: f32,

    /// Half the length of the pole.
    pub length: f32,

    /// Magnitude of the force applied by an action.
    pub force_mag: f32,

    /// Seconds between state updates.
    pub tau: f32,

    /// Use semi-implicit Euler integration instead of explicit Euler.
    pub semi_implicit: bool,
}

impl Default for CartPoleConfig {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            masscart: 1.0,
            masspole: 0.1,
            length: 0.5,
            force_mag: 10.0,
            tau: 0.02,
            semi_implicit: false,
        }
    }
}

/// A pole is attached by an unactuated joint to a cart moving along a frictionless
/// track. Action `0` pushes the cart to the left, `1` to the right.
///
/// The observation is `[x, x_dot, theta, theta_dot]`. Every step yields reward `1`.
/// The episode terminates when the pole leans more than 12 degrees or the cart leaves
/// `[-2.4, 2.4]`. Stepping a terminated episode yields reward `0` and a warning.
pub struct CartPole {
    config: CartPoleConfig,
    obs_space: Space,
    act_space: Space,
    state: Option<[f32; 4]>,
    steps_beyond_terminated: Option<usize>,
    rng: StdRng,
}

const X_THRESHOLD: f32 = 2.4;
const THETA_THRESHOLD: f32 = 12.0 * 2.0 * PI / 360.0;

impl CartPole {
    /// Constructs the environment.
    pub fn build(config: CartPoleConfig) -> Result<Self> {
        let high = [
            X_THRESHOLD * 2.0,
            f32::INFINITY,
            THETA_THRESHOLD * 2.0,
            f32::INFINITY,
        ];
        let low = high.map(|v| -v);
        Ok(Self {
            config,
            obs_space: Space::boxed(&low, &high, &[4])?,
            act_space: Space::discrete(2)?,
            state: None,
            steps_beyond_terminated: None,
            rng: seeded_rng(None),
        })
    }

    fn dynamics(&self, [x, x_dot, theta, theta_dot]: [f32; 4], push_right: bool) -> [f32; 4] {
        let c = &self.config;
        let total_mass = c.masspole + c.masscart;
        let polemass_length = c.masspole * c.length;
        let force = if push_right { c.force_mag } else { -c.force_mag };
        let (sin, cos) = theta.sin_cos();

        let temp = (force + polemass_length * theta_dot * theta_dot * sin) / total_mass;
        let theta_acc = (c.gravity * sin - cos * temp)
            / (c.length * (4.0 / 3.0 - c.masspole * cos * cos / total_mass));
        let x_acc = temp - polemass_length * theta_acc * cos / total_mass;

        if c.semi_implicit {
            let x_dot = x_dot + c.tau * x_acc;
            let theta_dot = theta_dot + c.tau * theta_acc;
            [x + c.tau * x_dot, x_dot, theta + c.tau * theta_dot, theta_dot]
        } else {
            [
                x + c.tau * x_dot,
                x_dot + c.tau * x_acc,
                theta + c.tau * theta_dot,
                theta_dot + c.tau * theta_acc,
            ]
        }
    }
}

impl Env for CartPole {
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
        let state = [(); 4].map(|_| self.rng.gen_range(-0.05..=0.05));
        self.state = Some(state);
        self.steps_beyond_terminated = None;
        Ok((Value::Box(state.to_vec()), Record::empty()))
    }

    fn step(&mut self, act: &Value) -> Result<Step> {
        let state = self
            .state
            .ok_or_else(|| PaddockError::ResetNeeded("step".into()))?;
        let push_right = match act.as_discrete() {
            Some(a @ 0..=1) => a == 1,
            _ => return Err(PaddockError::InvalidAction(format!("{:?}", act)).into()),
        };

        let state = self.dynamics(state, push_right);
        self.state = Some(state);
        let [x, _, theta, _] = state;
        let terminated = !(-X_THRESHOLD..=X_THRESHOLD).contains(&x)
            || !(-THETA_THRESHOLD..=THETA_THRESHOLD).contains(&theta);

        let reward = match (terminated, self.steps_beyond_terminated) {
            (false, _) => 1.0,
            (true, None) => {
                self.steps_beyond_terminated = Some(0);
                1.0
            }
            (true, Some(n)) => {
                if n == 0 {
                    warn!("Calling step() after the episode terminated, call reset() first");
                }
                self.steps_beyond_terminated = Some(n + 1);
                0.0
            }
        };

        Ok(Step::new(
            Value::Box(state.to_vec()),
            reward,
            terminated,
            false,
            Record::empty(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode() -> Result<()> {
        let mut env = CartPole::build(CartPoleConfig::default())?;
        assert!(env.step(&Value::Discrete(0)).is_err());

        let (obs, _) = env.reset(Some(42), None)?;
        assert!(env.observation_space().contains(&obs));
        assert!(obs.as_box().unwrap().iter().all(|v| v.abs() <= 0.05));

        // Pushing to one side makes the pole fall well within 100 steps.
        let mut len = 0;
        loop {
            let step = env.step(&Value::Discrete(1))?;
            len += 1;
            assert_eq!(step.reward, 1.0);
            if step.is_terminated {
                break;
            }
            assert!(len < 100);
        }
        let step = env.step(&Value::Discrete(1))?;
        assert_eq!(step.reward, 0.0);
        Ok(())
    }

    #[test]
    fn test_reset_is_deterministic() -> Result<()> {
        let mut a = CartPole::build(CartPoleConfig::default())?;
        let mut b = CartPole::build(CartPoleConfig::default())?;
        assert_eq!(a.reset(Some(7), None)?.0, b.reset(Some(7), None)?.0);
        Ok(())
    }

    #[test]
    fn test_invalid_action() -> Result<()> {
        let mut env = CartPole::build(CartPoleConfig::default())?;
        env.reset(None, None)?;
        let err = env.step(&Value::Discrete(2)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PaddockError>(),
            Some(PaddockError::InvalidAction(_))
        ));
        Ok(())
    }
}
