//! Tabular agent.
use super::config::{TabularAlgorithm, TabularConfig};
use crate::util::argmax;
use anyhow::Result;
use log::info;
use paddock_core::{
    checkpoint::{artifact, CheckpointMetadata},
    error::PaddockError,
    record::{Record, RecordValue, Recorder},
    space::Discrete,
    Env, Policy, Space, Value,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter},
    path::Path,
};

/// File name of the action-value table in a checkpoint.
pub const Q_TABLE_FILE: &str = "q_table.json";

#[derive(Serialize, Deserialize)]
struct QTable {
    n_states: usize,
    n_actions: usize,
    values: Vec<f32>,
}

fn discrete<'a>(space: &'a Space, what: &str) -> Result<&'a Discrete> {
    space.as_discrete().ok_or_else(|| {
        PaddockError::InvalidConfig(format!(
            "tabular agents require a discrete {} space, got {:?}",
            what, space
        ))
        .into()
    })
}

/// Q-learning or SARSA agent holding one action value per state-action pair.
pub struct TabularAgent {
    config: TabularConfig,
    obs_space: Discrete,
    act_space: Discrete,
    q: Vec<f32>,
    train: bool,
    num_timesteps: usize,
    num_episodes: usize,
    rng: StdRng,
}

impl TabularAgent {
    /// Constructs an agent with a zero-initialized table.
    pub fn build(config: TabularConfig, obs_space: &Space, act_space: &Space) -> Result<Self> {
        let obs_space = discrete(obs_space, "observation")?.clone();
        let act_space = discrete(act_space, "action")?.clone();
        Ok(Self {
            q: vec![0.0; obs_space.n() * act_space.n()],
            rng: StdRng::seed_from_u64(config.seed),
            config,
            obs_space,
            act_space,
            train: false,
            num_timesteps: 0,
            num_episodes: 0,
        })
    }

    /// Action values of the state `obs`.
    pub fn q_values(&self, obs: &Value) -> Result<&[f32]> {
        let s = self.state(obs)?;
        Ok(self.row(s))
    }

    /// Steps taken by [`learn`](Self::learn).
    pub fn num_timesteps(&self) -> usize {
        self.num_timesteps
    }

    /// Episodes finished by [`learn`](Self::learn).
    pub fn num_episodes(&self) -> usize {
        self.num_episodes
    }

    /// Set the policy to training mode, where actions are epsilon-greedy.
    pub fn train(&mut self) {
        self.train = true;
    }

    /// Set the policy to evaluation mode, where actions are greedy.
    pub fn eval(&mut self) {
        self.train = false;
    }

    fn n_actions(&self) -> usize {
        self.act_space.n()
    }

    fn row(&self, s: usize) -> &[f32] {
        let n = self.n_actions();
        &self.q[s * n..(s + 1) * n]
    }

    fn state(&self, obs: &Value) -> Result<usize> {
        obs.as_discrete()
            .and_then(|x| self.obs_space.index_of(x))
            .ok_or_else(|| PaddockError::InvalidObservation(format!("{:?}", obs)).into())
    }

    fn choose(&mut self, s: usize, eps: f64) -> usize {
        match self.rng.gen::<f64>() < eps {
            true => self.rng.gen_range(0..self.n_actions()),
            false => argmax(self.row(s)),
        }
    }

    fn action_value(&self, a: usize) -> Value {
        Value::Discrete(self.act_space.start() + a as i64)
    }

    /// Trains the agent for `total_timesteps` steps of `env`.
    ///
    /// The environment is reset with the configured seed at the start and without a
    /// seed after each episode. Episode returns and lengths are stored in `recorder`,
    /// which is flushed at the end.
    pub fn learn(
        &mut self,
        env: &mut dyn Env,
        total_timesteps: usize,
        recorder: &mut dyn Recorder,
    ) -> Result<()> {
        discrete(env.observation_space(), "observation")?;
        discrete(env.action_space(), "action")?;
        self.train();

        let (obs, _) = env.reset(Some(self.config.seed), None)?;
        let mut s = self.state(&obs)?;
        let mut a = self.choose(s, self.config.exploration.value(1.0));
        let (mut ep_return, mut ep_length) = (0f32, 0usize);
        let gamma = self.config.gamma as f32;
        let n = self.n_actions();

        for t in 0..total_timesteps {
            let progress_remaining = 1.0 - t as f64 / total_timesteps as f64;
            let eps = self.config.exploration.value(progress_remaining);
            let lr = self.config.learning_rate.value(progress_remaining) as f32;

            let step = env.step(&self.action_value(a))?;
            let s2 = self.state(&step.obs)?;
            self.num_timesteps += 1;
            ep_return += step.reward;
            ep_length += 1;

            // Terminal transitions do not bootstrap.
            let (bootstrap, a2) = match (step.is_terminated, self.config.algorithm) {
                (true, _) => (0.0, None),
                (false, TabularAlgorithm::QLearning) => {
                    (self.row(s2)[argmax(self.row(s2))], None)
                }
                (false, TabularAlgorithm::Sarsa) => {
                    let a2 = self.choose(s2, eps);
                    (self.row(s2)[a2], Some(a2))
                }
            };
            let q = &mut self.q[s * n + a];
            *q += lr * (step.reward + gamma * bootstrap - *q);

            if step.is_done() {
                self.num_episodes += 1;
                recorder.store(Record::from_slice(&[
                    ("episode_return", RecordValue::Scalar(ep_return)),
                    ("episode_length", RecordValue::Scalar(ep_length as f32)),
                ]));
                ep_return = 0.0;
                ep_length = 0;
                let (obs, _) = env.reset(None, None)?;
                s = self.state(&obs)?;
                a = self.choose(s, eps);
            } else {
                s = s2;
                a = match a2 {
                    Some(a2) => a2,
                    None => self.choose(s2, eps),
                };
            }
        }

        recorder.flush(self.num_timesteps as i64);
        info!(
            "Trained {} for {} timesteps, {} episodes",
            self.config.algorithm.kind(),
            self.num_timesteps,
            self.num_episodes
        );
        Ok(())
    }

    /// Writes the table and checkpoint metadata into `dir`.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let table = QTable {
            n_states: self.obs_space.n(),
            n_actions: self.n_actions(),
            values: self.q.clone(),
        };
        let file = File::create(dir.join(Q_TABLE_FILE))?;
        serde_json::to_writer(BufWriter::new(file), &table)?;
        CheckpointMetadata::new(
            self.config.algorithm.kind(),
            self.num_timesteps,
            self.num_episodes,
            self.config.learning_rate.description(),
            json!({
                "gamma": self.config.gamma,
                "exploration": self.config.exploration.description(),
                "n_states": table.n_states,
                "n_actions": table.n_actions,
            }),
        )
        .save(dir)?;
        info!("Save tabular agent into {}", dir.display());
        Ok(())
    }

    /// Restores the table and counters written by [`save`](Self::save).
    pub fn load(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        let metadata = CheckpointMetadata::load(dir)?;
        metadata.check(self.config.algorithm.kind())?;
        let rdr = BufReader::new(File::open(artifact(dir, Q_TABLE_FILE)?)?);
        let table: QTable = serde_json::from_reader(rdr)?;
        if table.n_states != self.obs_space.n()
            || table.n_actions != self.n_actions()
            || table.values.len() != self.q.len()
        {
            return Err(PaddockError::InvalidConfig(format!(
                "table of {}x{} does not fit {} states and {} actions",
                table.n_states,
                table.n_actions,
                self.obs_space.n(),
                self.n_actions()
            ))
            .into());
        }
        self.q = table.values;
        self.num_timesteps = metadata.num_timesteps;
        self.num_episodes = metadata.num_episodes;
        info!("Load tabular agent from {}", dir.display());
        Ok(())
    }
}

impl Policy for TabularAgent {
    fn sample(&mut self, obs: &[Value]) -> Result<Vec<Value>> {
        let eps = match self.train {
            true => self.config.exploration.value(0.0),
            false => 0.0,
        };
        obs.iter()
            .map(|o| -> Result<Value> {
                let s = self.state(o)?;
                let a = self.choose(s, eps);
                Ok(self.action_value(a))
            })
            .collect()
    }
}
