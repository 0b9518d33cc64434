//! SAC agent.
use super::{
    config::SacConfig,
    ent_coef::{EntCoef, EntCoefMode},
    model::SacModel,
};
use crate::{
    model::ParamStore,
    util::{features, features_of_rows},
};
use anyhow::Result;
use log::{debug, info};
use paddock_core::{
    checkpoint::artifact,
    error::PaddockError,
    record::{Record, RecordValue},
    replay_buffer::{ArrayBatch, ReplayBatch},
    Agent, ExperienceBufferBase, Policy, ReplayBufferBase, Schedule, Space, Value,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter},
    path::Path,
};

/// File name of the parameters of the actor and critics in a checkpoint.
pub const SAC_MODEL_FILE: &str = "sac_model.json";

/// File name of the entropy coefficient in a checkpoint.
pub const ENT_COEF_FILE: &str = "ent_coef.json";

/// File name of the update counter in a checkpoint.
pub const SAC_STATE_FILE: &str = "sac_state.json";

#[derive(Serialize, Deserialize)]
struct SacState {
    n_grad_steps: usize,
}

fn min_over_critics(values: Vec<Vec<f32>>) -> Result<Vec<f32>> {
    values
        .into_iter()
        .reduce(|a, b| a.iter().zip(b.iter()).map(|(a, b)| a.min(*b)).collect())
        .ok_or_else(|| PaddockError::InvalidConfig("SAC model returned no critic".into()).into())
}

/// Soft actor-critic agent for bounded continuous action spaces.
pub struct Sac<M: SacModel> {
    config: SacConfig<M::Config>,
    model: M,
    ent_coef: EntCoef,
    obs_space: Space,
    act_low: Vec<f32>,
    act_high: Vec<f32>,
    train: bool,
    n_grad_steps: usize,
}

impl<M: SacModel> Sac<M> {
    /// Constructs SAC agent for the given spaces.
    ///
    /// The action space must be a bounded [`Space::Box`].
    pub fn build(config: SacConfig<M::Config>, obs_space: &Space, act_space: &Space) -> Result<Self> {
        let act = act_space
            .as_box()
            .filter(|s| s.is_bounded())
            .ok_or_else(|| {
                PaddockError::InvalidConfig(format!(
                    "SAC requires a bounded box action space, got {:?}",
                    act_space
                ))
            })?;
        if config.batch_size == 0 || config.target_update_interval == 0 {
            return Err(PaddockError::InvalidConfig(
                "batch_size and target_update_interval must be positive".into(),
            )
            .into());
        }

        let act_dim = act.dim();
        let mut model = M::build(&config.model_config, obs_space.flat_dim(), act_dim)?;
        model.set_learning_rate(config.learning_rate.value(1.0));
        let ent_coef = EntCoef::new(config.ent_coef_mode.clone(), act_dim)?;
        debug!("Built SAC with {} action components", act_dim);

        Ok(Self {
            model,
            ent_coef,
            obs_space: obs_space.clone(),
            act_low: act.low().to_vec(),
            act_high: act.high().to_vec(),
            train: false,
            n_grad_steps: 0,
            config,
        })
    }

    /// The actor and critics.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Gradient steps taken so far.
    pub fn n_grad_steps(&self) -> usize {
        self.n_grad_steps
    }

    /// The current entropy coefficient.
    pub fn alpha(&self) -> f32 {
        self.ent_coef.alpha()
    }

    // [-1, 1] to the bounds of the action space.
    fn scale(&self, a: &[f32]) -> Vec<f32> {
        a.iter()
            .zip(self.act_low.iter().zip(self.act_high.iter()))
            .map(|(a, (lo, hi))| lo + (a.clamp(-1.0, 1.0) + 1.0) * 0.5 * (hi - lo))
            .collect()
    }

    fn unscale(&self, act: &ArrayBatch) -> ArrayBatch {
        let dim = self.act_low.len();
        let data = act
            .data
            .iter()
            .enumerate()
            .map(|(i, x)| {
                let (lo, hi) = (self.act_low[i % dim], self.act_high[i % dim]);
                2.0 * (x - lo) / (hi - lo) - 1.0
            })
            .collect();
        ArrayBatch { data, dim }
    }

    /// Returns the critic and actor losses.
    fn update(&mut self, batch: ReplayBatch) -> Result<(f32, f32)> {
        let obs = features_of_rows(&self.obs_space, &batch.obs)?;
        let next_obs = features_of_rows(&self.obs_space, &batch.next_obs)?;
        let act = self.unscale(&batch.act);

        let (_, logp) = self.model.sample_action(&obs, false)?;
        self.ent_coef.update(&logp)?;
        let alpha = self.ent_coef.alpha();

        let (next_act, next_logp) = self.model.sample_action(&next_obs, false)?;
        let next_q = min_over_critics(self.model.critic_values(&next_obs, &next_act, true)?)?;
        let gamma = self.config.gamma as f32;
        let target = batch
            .reward
            .iter()
            .zip(batch.done.iter())
            .zip(next_q.iter().zip(next_logp.iter()))
            .map(|((r, d), (q, lp))| r + gamma * (1.0 - d) * (q - alpha * lp))
            .collect::<Vec<_>>();
        let loss_critic =
            self.model
                .update_critics(&obs, &act, &target, self.config.critic_loss)?;

        let (loss_actor, _) = self.model.update_actor(&obs, alpha)?;
        Ok((loss_critic, loss_actor))
    }
}

impl<M: SacModel> Policy for Sac<M> {
    fn sample(&mut self, obs: &[Value]) -> Result<Vec<Value>> {
        let x = features(&self.obs_space, obs)?;
        let deterministic = !self.train && self.config.deterministic_eval;
        let (act, _) = self.model.sample_action(&x, deterministic)?;
        Ok((0..act.len())
            .map(|i| Value::Box(self.scale(act.row(i))))
            .collect())
    }
}

impl<M, R> Agent<R> for Sac<M>
where
    M: SacModel,
    R: ExperienceBufferBase + ReplayBufferBase<Batch = ReplayBatch>,
{
    fn kind(&self) -> &str {
        "sac"
    }

    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn on_step(&mut self, progress_remaining: f64) {
        self.model
            .set_learning_rate(self.config.learning_rate.value(progress_remaining));
    }

    fn opt(&mut self, buffer: &mut R, gradient_steps: usize) -> Result<Option<Record>> {
        if gradient_steps == 0 || buffer.len() < self.config.min_transitions_warmup.max(1) {
            return Ok(None);
        }

        let mut loss_critic = 0f32;
        let mut loss_actor = 0f32;
        for _ in 0..gradient_steps {
            let batch = buffer.batch(self.config.batch_size)?;
            let (lc, la) = self.update(batch)?;
            loss_critic += lc;
            loss_actor += la;
            self.n_grad_steps += 1;
            if self.n_grad_steps % self.config.target_update_interval == 0 {
                self.model.soft_update(self.config.tau)?;
            }
        }

        let n = gradient_steps as f32;
        Ok(Some(Record::from_slice(&[
            ("loss_critic", RecordValue::Scalar(loss_critic / n)),
            ("loss_actor", RecordValue::Scalar(loss_actor / n)),
            ("ent_coef", RecordValue::Scalar(self.ent_coef.alpha())),
        ])))
    }

    fn learning_rate(&self) -> &Schedule {
        &self.config.learning_rate
    }

    fn hyperparams(&self) -> serde_json::Value {
        let ent_coef = match &self.config.ent_coef_mode {
            EntCoefMode::Fix(alpha) => json!(alpha),
            EntCoefMode::Auto { .. } => json!("auto"),
        };
        json!({
            "batch_size": self.config.batch_size,
            "gamma": self.config.gamma,
            "tau": self.config.tau,
            "target_update_interval": self.config.target_update_interval,
            "ent_coef": ent_coef,
            "target_entropy": self.ent_coef.target_entropy(),
            "action_dim": self.act_low.len(),
        })
    }

    fn save_params(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        self.model.save(&dir.join(SAC_MODEL_FILE))?;
        self.ent_coef.save(&dir.join(ENT_COEF_FILE))?;
        let state = SacState {
            n_grad_steps: self.n_grad_steps,
        };
        serde_json::to_writer(BufWriter::new(File::create(dir.join(SAC_STATE_FILE))?), &state)?;
        info!("Save SAC parameters into {}", dir.display());
        Ok(())
    }

    fn load_params(&mut self, dir: &Path) -> Result<()> {
        self.model.load(&artifact(dir, SAC_MODEL_FILE)?)?;
        self.ent_coef.load(&artifact(dir, ENT_COEF_FILE)?)?;
        let rdr = BufReader::new(File::open(artifact(dir, SAC_STATE_FILE)?)?);
        let state: SacState = serde_json::from_reader(rdr)?;
        self.n_grad_steps = state.n_grad_steps;
        info!("Load SAC parameters from {}", dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::Params, util::CriticLoss};
    use paddock_core::{
        evaluator::DefaultEvaluator,
        record::BufferedRecorder,
        replay_buffer::{ReplayBuffer, ReplayBufferConfig, TransitionBatch},
        vector::{SyncVecEnv, VecEnv},
        MakeConfig, Registry, Trainer, TrainerConfig,
    };
    use serde::{Deserialize, Serialize};
    use tempdir::TempDir;

    #[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
    struct StubConfig {
        mu: f32,
        logp: f32,
        q_tgt: (f32, f32),
    }

    // Fixed policy and critics, recording the targets it is given.
    struct StubModel {
        params: Params,
        logp: f32,
        last_target: Vec<f32>,
    }

    impl ParamStore for StubModel {
        fn params(&self) -> Params {
            self.params.clone()
        }

        fn set_params(&mut self, params: &Params) -> Result<()> {
            crate::model::check_params(&self.params, params)?;
            self.params = params.clone();
            Ok(())
        }
    }

    impl SacModel for StubModel {
        type Config = StubConfig;

        fn build(config: &StubConfig, _obs_dim: usize, act_dim: usize) -> Result<Self> {
            let q = vec![config.q_tgt.0, config.q_tgt.1];
            Ok(Self {
                params: Params::from([
                    ("mu".to_string(), vec![config.mu; act_dim]),
                    ("q".to_string(), q.clone()),
                    ("q_tgt".to_string(), q),
                ]),
                logp: config.logp,
                last_target: vec![],
            })
        }

        fn sample_action(
            &mut self,
            obs: &ArrayBatch,
            _deterministic: bool,
        ) -> Result<(ArrayBatch, Vec<f32>)> {
            let mu = &self.params["mu"];
            let rows = (0..obs.len()).map(|_| &mu[..]);
            Ok((ArrayBatch::from_rows(rows, mu.len())?, vec![self.logp; obs.len()]))
        }

        fn critic_values(
            &self,
            obs: &ArrayBatch,
            _act: &ArrayBatch,
            target: bool,
        ) -> Result<Vec<Vec<f32>>> {
            let q = match target {
                true => &self.params["q_tgt"],
                false => &self.params["q"],
            };
            Ok(q.iter().map(|&v| vec![v; obs.len()]).collect())
        }

        fn update_critics(
            &mut self,
            _obs: &ArrayBatch,
            _act: &ArrayBatch,
            target_q: &[f32],
            _loss: CriticLoss,
        ) -> Result<f32> {
            self.last_target = target_q.to_vec();
            Ok(0.0)
        }

        fn update_actor(&mut self, obs: &ArrayBatch, _alpha: f32) -> Result<(f32, Vec<f32>)> {
            Ok((0.0, vec![self.logp; obs.len()]))
        }

        fn soft_update(&mut self, tau: f64) -> Result<()> {
            let mut q_tgt = Params::from([("q".to_string(), self.params["q_tgt"].clone())]);
            let q = Params::from([("q".to_string(), self.params["q"].clone())]);
            crate::util::track(&mut q_tgt, &q, tau)?;
            self.params.insert("q_tgt".to_string(), q_tgt["q"].clone());
            Ok(())
        }

        fn set_learning_rate(&mut self, _lr: f64) {}
    }

    fn config() -> SacConfig<StubConfig> {
        SacConfig::default()
            .model_config(StubConfig {
                mu: 0.5,
                logp: -1.0,
                q_tgt: (2.0, 3.0),
            })
            .batch_size(4)
            .gamma(0.9)
            .ent_coef_mode(EntCoefMode::Fix(0.5))
    }

    fn spaces() -> Result<(Space, Space)> {
        Ok((
            Space::boxed(&[-10.0], &[10.0], &[1])?,
            Space::boxed(&[-2.0], &[2.0], &[1])?,
        ))
    }

    fn transition(reward: f32, terminated: bool) -> TransitionBatch {
        TransitionBatch {
            obs: ArrayBatch {
                data: vec![0.0],
                dim: 1,
            },
            act: ArrayBatch {
                data: vec![2.0],
                dim: 1,
            },
            next_obs: ArrayBatch {
                data: vec![1.0],
                dim: 1,
            },
            reward: vec![reward],
            is_terminated: vec![terminated as i8],
            is_truncated: vec![0],
        }
    }

    #[test]
    fn test_rejects_discrete_actions() -> Result<()> {
        let (obs_space, _) = spaces()?;
        let err = Sac::<StubModel>::build(config(), &obs_space, &Space::discrete(2)?)
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<PaddockError>(),
            Some(PaddockError::InvalidConfig(_))
        ));
        Ok(())
    }

    #[test]
    fn test_actions_are_scaled() -> Result<()> {
        let (obs_space, act_space) = spaces()?;
        let mut sac = Sac::<StubModel>::build(config(), &obs_space, &act_space)?;
        let acts = sac.sample(&[Value::Box(vec![0.0]), Value::Box(vec![1.0])])?;
        assert_eq!(acts, vec![Value::Box(vec![1.0]); 2]);
        assert!(acts.iter().all(|a| act_space.contains(a)));

        let unscaled = sac.unscale(&ArrayBatch {
            data: vec![2.0, -2.0, 0.0],
            dim: 1,
        });
        assert_eq!(unscaled.data, vec![1.0, -1.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_critic_target() -> Result<()> {
        let (obs_space, act_space) = spaces()?;
        let mut sac = Sac::<StubModel>::build(config(), &obs_space, &act_space)?;
        let mut buffer = ReplayBuffer::build(
            &ReplayBufferConfig::default().capacity(4),
            &obs_space,
            &act_space,
            1,
        )?;
        buffer.push(transition(1.0, false))?;
        let record = sac.opt(&mut buffer, 1)?.unwrap();
        assert!((record.get_scalar("ent_coef")? - 0.5).abs() < 1e-6);

        // 1 + 0.9 * (min(2, 3) - 0.5 * -1)
        for y in sac.model().last_target.iter() {
            assert!((y - 3.25).abs() < 1e-5);
        }

        let mut buffer = ReplayBuffer::build(
            &ReplayBufferConfig::default().capacity(4),
            &obs_space,
            &act_space,
            1,
        )?;
        buffer.push(transition(1.0, true))?;
        sac.opt(&mut buffer, 1)?;
        assert_eq!(sac.model().last_target, vec![1.0; 4]);
        Ok(())
    }

    #[test]
    fn test_auto_alpha_stays_positive() -> Result<()> {
        let (obs_space, act_space) = spaces()?;
        let config = config()
            .model_config(StubConfig {
                mu: 0.0,
                logp: -100.0,
                q_tgt: (0.0, 0.0),
            })
            .ent_coef_mode(EntCoefMode::Auto {
                target_entropy: None,
                learning_rate: 0.1,
            });
        let mut sac = Sac::<StubModel>::build(config, &obs_space, &act_space)?;
        let mut buffer = ReplayBuffer::build(
            &ReplayBufferConfig::default().capacity(4),
            &obs_space,
            &act_space,
            1,
        )?;
        buffer.push(transition(0.0, false))?;
        let mut alpha = sac.alpha();
        for _ in 0..20 {
            let record = sac.opt(&mut buffer, 10)?.unwrap();
            let ent_coef = record.get_scalar("ent_coef")?;
            assert!(ent_coef > 0.0 && ent_coef < alpha);
            alpha = ent_coef;
        }
        Ok(())
    }

    #[test]
    fn test_save_load() -> Result<()> {
        let (obs_space, act_space) = spaces()?;
        let mut sac = Sac::<StubModel>::build(config(), &obs_space, &act_space)?;
        let mut buffer = ReplayBuffer::build(
            &ReplayBufferConfig::default().capacity(4),
            &obs_space,
            &act_space,
            1,
        )?;
        buffer.push(transition(0.0, false))?;
        sac.opt(&mut buffer, 3)?;
        let dir = TempDir::new("sac")?;
        Agent::<ReplayBuffer>::save_params(&sac, dir.path())?;

        let config2 = config().ent_coef_mode(EntCoefMode::Fix(0.1));
        let mut sac2 = Sac::<StubModel>::build(config2, &obs_space, &act_space)?;
        Agent::<ReplayBuffer>::load_params(&mut sac2, dir.path())?;
        assert!((sac2.alpha() - 0.5).abs() < 1e-6);
        assert_eq!(sac2.n_grad_steps(), 3);

        fs::remove_file(dir.path().join(ENT_COEF_FILE))?;
        assert!(Agent::<ReplayBuffer>::load_params(&mut sac2, dir.path()).is_err());
        Ok(())
    }

    #[test]
    fn test_trains_on_pendulum() -> Result<()> {
        let mut registry = Registry::new();
        paddock_envs::register_envs(&mut registry)?;
        let env = registry.make("Pendulum-v1", &MakeConfig::default())?;
        let venv = SyncVecEnv::new(vec![env])?;
        let obs_space = venv.single_observation_space().clone();
        let act_space = venv.single_action_space().clone();

        let mut sac = Sac::<StubModel>::build(config(), &obs_space, &act_space)?;
        let mut trainer = Trainer::build(
            TrainerConfig::default().learning_starts(10).seed(0),
            ReplayBufferConfig::default().capacity(100),
        )
        .with_env(Box::new(venv));
        let mut evaluator =
            DefaultEvaluator::new(registry.make("Pendulum-v1", &MakeConfig::default())?, 1, 0)?;
        let mut recorder = BufferedRecorder::new();
        trainer.learn(&mut sac, 50, &mut recorder, &mut evaluator)?;

        assert_eq!(trainer.num_timesteps(), 50);
        assert_eq!(trainer.opt_steps(), 41);
        assert!(sac.alpha() > 0.0);
        Ok(())
    }
}
