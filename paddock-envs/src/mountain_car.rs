//! MountainCar.
use anyhow::Result;
use paddock_core::{
    error::PaddockError, record::Record, seeded_rng, Env, Info, Space, Step, Value,
};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};

const MIN_POSITION: f32 = -1.2;
const MAX_POSITION: f32 = 0.6;
const MAX_SPEED: f32 = 0.07;
const GOAL_POSITION: f32 = 0.5;

/// Configuration of [`MountainCar`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MountainCarConfig {
    /// Minimum velocity at the goal position to end the episode.
    pub goal_velocity: f32,

    /// Acceleration per unit of action.
    pub force: f32,

    /// Gravity.
    pub gravity: f32,
}

impl Default for MountainCarConfig {
    fn default() -> Self {
        Self {
            goal_velocity: 0.0,
            force: 0.001,
            gravity: 0.0025,
        }
    }
}

/// A car placed at the bottom of a sinusoidal valley must reach the flag on the right
/// hill. The engine is too weak to climb directly, so the car has to build momentum.
///
/// Actions are `0` (accelerate left), `1` (don't accelerate) and `2` (accelerate
/// right). The observation is `[position, velocity]`, every step yields reward `-1`.
pub struct MountainCar {
    config: MountainCarConfig,
    obs_space: Space,
    act_space: Space,
    state: Option<[f32; 2]>,
    rng: StdRng,
}

impl MountainCar {
    /// Constructs the environment.
    pub fn build(config: MountainCarConfig) -> Result<Self> {
        Ok(Self {
            config,
            obs_space: Space::boxed(&[MIN_POSITION, -MAX_SPEED], &[MAX_POSITION, MAX_SPEED], &[2])?,
            act_space: Space::discrete(3)?,
            state: None,
            rng: seeded_rng(None),
        })
    }
}

impl Env for MountainCar {
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
        let state = [self.rng.gen_range(-0.6..=-0.4), 0.0];
        self.state = Some(state);
        Ok((Value::Box(state.to_vec()), Record::empty()))
    }

    fn step(&mut self, act: &Value) -> Result<Step> {
        let [position, velocity] = self
            .state
            .ok_or_else(|| PaddockError::ResetNeeded("step".into()))?;
        let a = match act.as_discrete() {
            Some(a @ 0..=2) => a as f32,
            _ => return Err(PaddockError::InvalidAction(format!("{:?}", act)).into()),
        };

        let velocity = (velocity
            + (a - 1.0) * self.config.force
            + (3.0 * position).cos() * -self.config.gravity)
            .clamp(-MAX_SPEED, MAX_SPEED);
        let position = (position + velocity).clamp(MIN_POSITION, MAX_POSITION);
        let velocity = if position == MIN_POSITION && velocity < 0.0 {
            0.0
        } else {
            velocity
        };
        self.state = Some([position, velocity]);

        let terminated = position >= GOAL_POSITION && velocity >= self.config.goal_velocity;
        Ok(Step::new(
            Value::Box(vec![position, velocity]),
            -1.0,
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
    fn test_left_wall() -> Result<()> {
        let mut env = MountainCar::build(MountainCarConfig::default())?;
        env.reset(Some(0), None)?;
        for _ in 0..200 {
            let step = env.step(&Value::Discrete(0))?;
            assert_eq!(step.reward, -1.0);
            assert!(env.observation_space().contains(&step.obs));
            let obs = step.obs.as_box().unwrap();
            if obs[0] == MIN_POSITION {
                assert!(obs[1] >= 0.0);
            }
        }
        Ok(())
    }

    #[test]
    fn test_bang_bang_reaches_goal() -> Result<()> {
        // Accelerating in the direction of the velocity pumps energy into the car.
        let mut env = MountainCar::build(MountainCarConfig::default())?;
        let (obs, _) = env.reset(Some(3), None)?;
        let mut velocity = obs.as_box().unwrap()[1];
        for _ in 0..200 {
            let act = if velocity < 0.0 { 0 } else { 2 };
            let step = env.step(&Value::Discrete(act))?;
            if step.is_terminated {
                return Ok(());
            }
            velocity = step.obs.as_box().unwrap()[1];
        }
        panic!("the goal was not reached");
    }
}
