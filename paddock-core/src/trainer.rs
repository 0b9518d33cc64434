//! Train [`Agent`].
mod callback;
mod config;
use crate::{
    checkpoint::{CheckpointMetadata, REPLAY_BUFFER_DIR},
    error::PaddockError,
    record::{Record, RecordValue::Scalar, Recorder},
    replay_buffer::{ExperienceBufferBase, ReplayBuffer, ReplayBufferConfig, StepProcessor},
    space::Value,
    vector::VecEnv,
    Agent, Evaluator,
};
use anyhow::Result;
pub use callback::{Callback, StopAfterEpisodes, StopHandle};
pub use config::{GradientSteps, TrainFreq, TrainFreqUnit, TrainerConfig};
use log::{info, warn};
use rand::{rngs::StdRng, SeedableRng};
use std::path::{Path, PathBuf};

/// Returns `true` if a multiple of `interval` lies in `(prev, now]`.
fn crossed(prev: usize, now: usize, interval: usize) -> bool {
    interval > 0 && now / interval > prev / interval
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Manages the off-policy training loop.
///
/// # Training loop
///
/// [`Trainer::learn`] runs the following until `total_timesteps` environment steps
/// (summed over slots) have been taken:
///
/// 0. Given an agent implementing [`Agent`], a recorder implementing [`Recorder`] and
///    an evaluator implementing [`Evaluator`].
/// 1. On the first call, build the [`ReplayBuffer`] from the spaces of the attached
///    [`VecEnv`]. Reset the environment, seeded with [`TrainerConfig::seed`], unless a
///    rollout from a previous call can be continued.
/// 2. Check the [`StopHandle`].
/// 3. Call [`Agent::on_step`] with the remaining progress.
/// 4. Choose actions: uniformly random while `num_timesteps < learning_starts`,
///    otherwise sampled from the agent.
/// 5. Step the environment, turn the step into transitions with [`StepProcessor`] and
///    push them into the buffer. `num_timesteps += num_envs`.
/// 6. For every slot that finished an episode, record `episode_return` and
///    `episode_length` and call [`Callback::on_episode_end`].
/// 7. When `train_freq` is reached, a training round ends. If
///    `num_timesteps >= learning_starts`, call [`Agent::opt`] with the configured number
///    of gradient steps; `AsCollected` counts only the steps of this round.
/// 8. Evaluate, save a checkpoint and flush records at their intervals.
/// 9. Call [`Callback::on_step`]; stop if any callback returns `false`.
///
/// # Interaction of objects
///
/// ```mermaid
/// graph LR
///     A[Agent]-->|actions|B[VecEnv]
///     B -->|VecStep|C[StepProcessor]
///     C -->|TransitionBatch|D[ReplayBuffer]
///     D -->|ReplayBatch|A
/// ```
///
/// An error in any step aborts `learn`. The buffer and counters keep the state
/// reached so far, and the environment stays attached.
pub struct Trainer {
    config: TrainerConfig,
    replay_buffer_config: ReplayBufferConfig,
    env: Option<Box<dyn VecEnv>>,
    buffer: Option<ReplayBuffer>,
    step_proc: Option<StepProcessor>,
    num_timesteps: usize,
    num_episodes: usize,
    opt_steps: usize,
    episode_returns: Vec<f32>,
    episode_lengths: Vec<usize>,
    stop: StopHandle,
    callbacks: Vec<Box<dyn Callback>>,
    rng: StdRng,
}

impl Trainer {
    /// Constructs a trainer without an environment.
    pub fn build(config: TrainerConfig, replay_buffer_config: ReplayBufferConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            replay_buffer_config,
            env: None,
            buffer: None,
            step_proc: None,
            num_timesteps: 0,
            num_episodes: 0,
            opt_steps: 0,
            episode_returns: vec![],
            episode_lengths: vec![],
            stop: StopHandle::default(),
            callbacks: vec![],
            rng,
        }
    }

    /// Attaches the environment used to collect transitions.
    ///
    /// A rollout in progress is discarded. A replay buffer built for a different number
    /// of slots or different spaces is dropped.
    pub fn set_env(&mut self, env: Box<dyn VecEnv>) {
        if let Some(buffer) = &self.buffer {
            if buffer.num_envs() != env.num_envs()
                || buffer.obs_space() != env.single_observation_space()
                || buffer.act_space() != env.single_action_space()
            {
                warn!("Dropping the replay buffer built for another environment");
                self.buffer = None;
            }
        }
        self.step_proc = None;
        self.env = Some(env);
    }

    /// Attaches the environment, see [`set_env`](Self::set_env).
    pub fn with_env(mut self, env: Box<dyn VecEnv>) -> Self {
        self.set_env(env);
        self
    }

    /// The attached environment.
    pub fn env_mut(&mut self) -> Option<&mut (dyn VecEnv + 'static)> {
        self.env.as_deref_mut()
    }

    /// Adds a callback.
    pub fn add_callback(&mut self, callback: Box<dyn Callback>) {
        self.callbacks.push(callback);
    }

    /// A handle to stop [`learn`](Self::learn) from another thread or a callback.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Environment steps taken, summed over slots.
    pub fn num_timesteps(&self) -> usize {
        self.num_timesteps
    }

    /// Finished episodes, summed over slots.
    pub fn num_episodes(&self) -> usize {
        self.num_episodes
    }

    /// Gradient steps requested from the agent.
    pub fn opt_steps(&self) -> usize {
        self.opt_steps
    }

    /// The replay buffer, once built.
    pub fn replay_buffer(&self) -> Option<&ReplayBuffer> {
        self.buffer.as_ref()
    }

    /// The replay buffer, once built.
    pub fn replay_buffer_mut(&mut self) -> Option<&mut ReplayBuffer> {
        self.buffer.as_mut()
    }

    fn ensure_buffer(&mut self, env: &dyn VecEnv) -> Result<()> {
        if self.buffer.is_none() {
            self.buffer = Some(ReplayBuffer::build(
                &self.replay_buffer_config,
                env.single_observation_space(),
                env.single_action_space(),
                env.num_envs(),
            )?);
        }
        Ok(())
    }

    /// Train the agent for `total_timesteps` environment steps.
    pub fn learn<A, D>(
        &mut self,
        agent: &mut A,
        total_timesteps: usize,
        recorder: &mut dyn Recorder,
        evaluator: &mut D,
    ) -> Result<()>
    where
        A: Agent<ReplayBuffer>,
        D: Evaluator<A>,
    {
        self.config.validate()?;
        let mut env = self.env.take().ok_or(PaddockError::NoEnvironment)?;
        let result = self.learn_with_env(env.as_mut(), agent, total_timesteps, recorder, evaluator);
        self.env = Some(env);
        for callback in self.callbacks.iter_mut() {
            callback.on_training_end(self.num_timesteps);
        }
        result
    }

    fn start_rollout(&mut self, env: &mut dyn VecEnv) -> Result<()> {
        let (obs, _) = env.reset(self.config.seed, None)?;
        let mut step_proc =
            StepProcessor::new(env.single_observation_space(), env.single_action_space());
        step_proc.reset(obs);
        self.step_proc = Some(step_proc);
        self.episode_returns = vec![0.0; env.num_envs()];
        self.episode_lengths = vec![0; env.num_envs()];
        Ok(())
    }

    fn learn_with_env<A, D>(
        &mut self,
        env: &mut dyn VecEnv,
        agent: &mut A,
        total_timesteps: usize,
        recorder: &mut dyn Recorder,
        evaluator: &mut D,
    ) -> Result<()>
    where
        A: Agent<ReplayBuffer>,
        D: Evaluator<A>,
    {
        if self.config.reset_num_timesteps {
            self.num_timesteps = 0;
            self.num_episodes = 0;
            self.opt_steps = 0;
        }
        self.ensure_buffer(env)?;
        if self.config.reset_num_timesteps || self.step_proc.is_none() {
            self.start_rollout(env)?;
        }
        self.stop.clear();
        for callback in self.callbacks.iter_mut() {
            callback.on_training_start(self.num_timesteps);
        }
        info!(
            "Start learning for {} timesteps with {} environments",
            total_timesteps,
            env.num_envs()
        );

        let start = self.num_timesteps;
        let end = start + total_timesteps;
        let n_envs = env.num_envs();
        let mut steps_since_train = 0usize;
        let mut episodes_since_train = 0usize;
        agent.train();

        while self.num_timesteps < end {
            if self.stop.is_stopped() {
                info!("Stop requested at {} timesteps", self.num_timesteps);
                break;
            }
            let progress_remaining = 1.0 - self.num_timesteps as f64 / end as f64;
            agent.on_step(progress_remaining);

            // Collect transitions
            let step_proc = self
                .step_proc
                .as_mut()
                .ok_or_else(|| PaddockError::ResetNeeded("learn".into()))?;
            let prev_obs = step_proc
                .prev_obs()
                .ok_or_else(|| PaddockError::ResetNeeded("learn".into()))?;
            let acts = if self.num_timesteps < self.config.learning_starts {
                let space = env.single_action_space();
                (0..n_envs)
                    .map(|_| space.sample(&mut self.rng))
                    .collect::<Vec<Value>>()
            } else {
                agent.sample(prev_obs)?
            };
            let step = env.step(&acts)?;
            let tr = step_proc.process(&acts, &step)?;
            let buffer = self
                .buffer
                .as_mut()
                .ok_or_else(|| PaddockError::InvalidConfig("replay buffer is not built".into()))?;
            buffer.push(tr)?;
            let prev_timesteps = self.num_timesteps;
            self.num_timesteps += n_envs;
            steps_since_train += 1;

            // Episode bookkeeping
            for i in 0..n_envs {
                self.episode_returns[i] += step.reward[i];
                self.episode_lengths[i] += 1;
                if step.is_done(i) {
                    let (ret, len) = (self.episode_returns[i], self.episode_lengths[i]);
                    self.num_episodes += 1;
                    episodes_since_train += 1;
                    recorder.store(Record::from_slice(&[
                        ("episode_return", Scalar(ret)),
                        ("episode_length", Scalar(len as f32)),
                    ]));
                    for callback in self.callbacks.iter_mut() {
                        callback.on_episode_end(i, ret, len);
                    }
                    self.episode_returns[i] = 0.0;
                    self.episode_lengths[i] = 0;
                }
            }

            // Optimization
            let due = match self.config.train_freq.unit {
                TrainFreqUnit::Step => steps_since_train >= self.config.train_freq.frequency,
                TrainFreqUnit::Episode => {
                    episodes_since_train >= self.config.train_freq.frequency
                }
            };
            if due {
                let gradient_steps = match self.config.gradient_steps {
                    GradientSteps::Fixed(n) => n,
                    GradientSteps::AsCollected => steps_since_train * n_envs,
                };
                // Rounds during warmup end without training.
                steps_since_train = 0;
                episodes_since_train = 0;
                if gradient_steps > 0 && self.num_timesteps >= self.config.learning_starts {
                    if let Some(record) = agent.opt(buffer, gradient_steps)? {
                        recorder.store(record);
                    }
                    self.opt_steps += gradient_steps;
                }
            }

            // Evaluation
            if crossed(prev_timesteps, self.num_timesteps, self.config.eval_interval) {
                agent.eval();
                let record = evaluator.evaluate(agent)?;
                agent.train();
                info!("Evaluation at {} timesteps: {:?}", self.num_timesteps, record);
                recorder.store(record);
            }

            // Checkpoint
            if crossed(prev_timesteps, self.num_timesteps, self.config.save_interval) {
                if let Some(model_dir) = &self.config.model_dir {
                    let dir = PathBuf::from(model_dir).join(self.num_timesteps.to_string());
                    self.save_checkpoint(&dir, agent, false)?;
                }
            }

            // Flush records
            if crossed(
                prev_timesteps,
                self.num_timesteps,
                self.config.flush_record_interval,
            ) {
                recorder.flush(self.num_timesteps as i64);
            }

            let mut go_on = true;
            for callback in self.callbacks.iter_mut() {
                go_on &= callback.on_step(self.num_timesteps);
            }
            if !go_on {
                info!("Stopped by a callback at {} timesteps", self.num_timesteps);
                break;
            }
        }

        recorder.flush(self.num_timesteps as i64);
        info!(
            "Finished learning: {} timesteps, {} episodes, {} gradient steps",
            self.num_timesteps, self.num_episodes, self.opt_steps
        );
        Ok(())
    }

    /// Saves the agent, the counters and optionally the replay buffer in `dir`.
    pub fn save_checkpoint<A: Agent<ReplayBuffer>>(
        &self,
        dir: impl AsRef<Path>,
        agent: &A,
        include_buffer: bool,
    ) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        agent.save_params(dir)?;
        if include_buffer {
            match &self.buffer {
                Some(buffer) => buffer.save(dir.join(REPLAY_BUFFER_DIR))?,
                None => warn!("No replay buffer to save"),
            }
        }
        CheckpointMetadata::new(
            agent.kind(),
            self.num_timesteps,
            self.num_episodes,
            agent.learning_rate().description(),
            agent.hyperparams(),
        )
        .with_opt_steps(self.opt_steps)
        .save(dir)?;
        info!("Saved checkpoint in {:?}", dir);
        Ok(())
    }

    /// Restores the agent, the counters and, if saved, the replay buffer from `dir`.
    ///
    /// The environment is reset at the next call of [`learn`](Self::learn).
    pub fn load_checkpoint<A: Agent<ReplayBuffer>>(
        &mut self,
        dir: impl AsRef<Path>,
        agent: &mut A,
    ) -> Result<CheckpointMetadata> {
        let dir = dir.as_ref();
        let meta = CheckpointMetadata::load(dir)?;
        meta.check(agent.kind())?;
        agent.load_params(dir)?;

        let buffer_dir = dir.join(REPLAY_BUFFER_DIR);
        if buffer_dir.exists() {
            if let Some(env) = self.env.take() {
                let built = self.ensure_buffer(env.as_ref());
                self.env = Some(env);
                built?;
            }
            match self.buffer.as_mut() {
                Some(buffer) => buffer.load(&buffer_dir)?,
                None => warn!("Attach an environment to restore the replay buffer"),
            }
        }

        self.num_timesteps = meta.num_timesteps;
        self.num_episodes = meta.num_episodes;
        self.opt_steps = meta.opt_steps;
        self.step_proc = None;
        info!("Loaded checkpoint from {:?}", dir);
        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dummy::DummyEnv,
        evaluator::{DefaultEvaluator, EVAL_EPISODE_RETURN},
        record::BufferedRecorder,
        replay_buffer::ReplayBufferBase,
        schedule::Schedule,
        vector::SyncVecEnv,
        Policy,
    };
    use serde_json::json;
    use std::{cell::RefCell, rc::Rc};
    use tempdir::TempDir;
    use test_log::test;

    /// Counts calls and checks that batches are available.
    struct CountingAgent {
        train: bool,
        sampled: usize,
        opt_calls: usize,
        gradient_steps: usize,
        last_progress: f64,
        fail_opt: bool,
        lr: Schedule,
    }

    impl Default for CountingAgent {
        fn default() -> Self {
            Self {
                train: false,
                sampled: 0,
                opt_calls: 0,
                gradient_steps: 0,
                last_progress: 1.0,
                fail_opt: false,
                lr: Schedule::Constant(1e-3),
            }
        }
    }

    impl Policy for CountingAgent {
        fn sample(&mut self, obs: &[Value]) -> Result<Vec<Value>> {
            self.sampled += 1;
            Ok(vec![Value::Discrete(1); obs.len()])
        }
    }

    impl Agent<ReplayBuffer> for CountingAgent {
        fn kind(&self) -> &str {
            "counting"
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
            self.last_progress = progress_remaining;
        }

        fn opt(&mut self, buffer: &mut ReplayBuffer, gradient_steps: usize) -> Result<Option<Record>> {
            if self.fail_opt {
                anyhow::bail!("diverged");
            }
            for _ in 0..gradient_steps {
                buffer.batch(4)?;
            }
            self.opt_calls += 1;
            self.gradient_steps += gradient_steps;
            Ok(Some(Record::from_scalar("loss", 0.5)))
        }

        fn learning_rate(&self) -> &Schedule {
            &self.lr
        }

        fn hyperparams(&self) -> serde_json::Value {
            json!({ "batch_size": 4 })
        }

        fn save_params(&self, dir: &Path) -> Result<()> {
            std::fs::write(dir.join("counting.json"), self.opt_calls.to_string())?;
            Ok(())
        }

        fn load_params(&mut self, dir: &Path) -> Result<()> {
            let path = crate::checkpoint::artifact(dir, "counting.json")?;
            self.opt_calls = std::fs::read_to_string(path)?.trim().parse()?;
            Ok(())
        }
    }

    fn trainer(config: TrainerConfig, episode_length: usize, n_envs: usize) -> Result<Trainer> {
        let envs = (0..n_envs)
            .map(|_| DummyEnv::new(Some(episode_length)))
            .collect::<Result<Vec<_>>>()?;
        let env: Box<dyn VecEnv> = Box::new(SyncVecEnv::new(envs)?);
        Ok(Trainer::build(config, ReplayBufferConfig::default().capacity(1000)).with_env(env))
    }

    fn evaluator() -> Result<DefaultEvaluator> {
        DefaultEvaluator::new(DummyEnv::new(Some(3))?, 2, 0)
    }

    #[test]
    fn test_no_environment() -> Result<()> {
        let mut trainer = Trainer::build(TrainerConfig::default(), ReplayBufferConfig::default());
        let err = trainer
            .learn(
                &mut CountingAgent::default(),
                10,
                &mut BufferedRecorder::new(),
                &mut evaluator()?,
            )
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<PaddockError>(),
            Some(&PaddockError::NoEnvironment)
        );
        Ok(())
    }

    #[test]
    fn test_learn() -> Result<()> {
        let config = TrainerConfig::default()
            .learning_starts(10)
            .train_freq(TrainFreq::steps(2))
            .gradient_steps(GradientSteps::Fixed(3))
            .eval_interval(20)
            .flush_record_interval(50)
            .seed(1);
        let mut trainer = trainer(config, 3, 2)?;
        let mut agent = CountingAgent::default();
        let mut recorder = BufferedRecorder::new();
        trainer.learn(&mut agent, 100, &mut recorder, &mut evaluator()?)?;

        assert_eq!(trainer.num_timesteps(), 100);
        // 50 vectorized steps, two slots ending an episode every third step.
        assert_eq!(trainer.num_episodes(), 2 * (50 / 3));
        assert_eq!(trainer.replay_buffer().unwrap().len(), 50);
        // Learning starts once 10 timesteps (5 vectorized steps) are collected.
        assert_eq!(agent.sampled, 45);
        assert!(agent.opt_calls > 0);
        assert_eq!(agent.gradient_steps, 3 * agent.opt_calls);
        assert_eq!(trainer.opt_steps(), agent.gradient_steps);
        assert!(agent.is_train());
        assert!(agent.last_progress > 0.0 && agent.last_progress < 0.05);

        let records = recorder.iter().collect::<Vec<_>>();
        // Flushed at 50 and 100 timesteps.
        assert_eq!(records.len(), 2);
        assert!(records[0].get_scalar("loss_mean").is_ok());
        assert_eq!(records[0].get_scalar(&format!("{}_mean", EVAL_EPISODE_RETURN))?, 3.0);
        assert_eq!(records[1].get_scalar("step")?, 100.0);
        Ok(())
    }

    #[test]
    fn test_train_freq_episodes() -> Result<()> {
        let config = TrainerConfig::default()
            .learning_starts(0)
            .train_freq(TrainFreq::episodes(1))
            .gradient_steps(GradientSteps::AsCollected);
        let mut trainer = trainer(config, 4, 1)?;
        let mut agent = CountingAgent::default();
        trainer.learn(&mut agent, 12, &mut BufferedRecorder::new(), &mut evaluator()?)?;
        assert_eq!(agent.opt_calls, 3);
        assert_eq!(agent.gradient_steps, 12);
        Ok(())
    }

    #[test]
    fn test_as_collected_ignores_warmup_steps() -> Result<()> {
        let config = TrainerConfig::default()
            .learning_starts(50)
            .train_freq(TrainFreq::steps(1))
            .gradient_steps(GradientSteps::AsCollected);
        let mut trainer = trainer(config, 1000, 1)?;
        let mut agent = CountingAgent::default();
        trainer.learn(&mut agent, 51, &mut BufferedRecorder::new(), &mut evaluator()?)?;
        // Rounds end at 50 and 51 timesteps, one step collected in each.
        assert_eq!(agent.opt_calls, 2);
        assert_eq!(agent.gradient_steps, 2);
        assert_eq!(trainer.opt_steps(), 2);
        Ok(())
    }

    #[test]
    fn test_opt_failure_keeps_state() -> Result<()> {
        let config = TrainerConfig::default().learning_starts(6);
        let mut trainer = trainer(config, 3, 1)?;
        let mut agent = CountingAgent {
            fail_opt: true,
            ..Default::default()
        };
        let result = trainer.learn(&mut agent, 100, &mut BufferedRecorder::new(), &mut evaluator()?);
        assert!(result.is_err());
        assert_eq!(trainer.num_timesteps(), 6);
        assert_eq!(trainer.replay_buffer().unwrap().len(), 6);
        assert!(trainer.env_mut().is_some());
        Ok(())
    }

    struct StopAt(usize);

    impl Callback for StopAt {
        fn on_step(&mut self, num_timesteps: usize) -> bool {
            num_timesteps < self.0
        }
    }

    struct Episodes(Rc<RefCell<Vec<(usize, f32, usize)>>>);

    impl Callback for Episodes {
        fn on_episode_end(&mut self, slot: usize, ret: f32, len: usize) {
            self.0.borrow_mut().push((slot, ret, len));
        }
    }

    #[test]
    fn test_callbacks() -> Result<()> {
        let mut trainer = trainer(TrainerConfig::default(), 3, 1)?;
        let episodes = Rc::new(RefCell::new(vec![]));
        trainer.add_callback(Box::new(StopAt(7)));
        trainer.add_callback(Box::new(Episodes(episodes.clone())));
        trainer.learn(
            &mut CountingAgent::default(),
            100,
            &mut BufferedRecorder::new(),
            &mut evaluator()?,
        )?;
        assert_eq!(trainer.num_timesteps(), 7);
        assert_eq!(*episodes.borrow(), vec![(0, 3.0, 3), (0, 3.0, 3)]);

        // A stop requested before learning is cleared when it starts.
        let mut trainer = self::trainer(TrainerConfig::default(), 3, 1)?;
        trainer.stop_handle().stop();
        trainer.add_callback(Box::new(StopAfterEpisodes::new(1)));
        trainer.learn(
            &mut CountingAgent::default(),
            100,
            &mut BufferedRecorder::new(),
            &mut evaluator()?,
        )?;
        assert_eq!(trainer.num_timesteps(), 3);
        Ok(())
    }

    #[test]
    fn test_continue_counting() -> Result<()> {
        let config = TrainerConfig::default().reset_num_timesteps(false);
        let mut trainer = trainer(config, 5, 1)?;
        let mut agent = CountingAgent::default();
        let mut recorder = BufferedRecorder::new();
        trainer.learn(&mut agent, 4, &mut recorder, &mut evaluator()?)?;
        assert!((agent.last_progress - 0.25).abs() < 1e-9);
        trainer.learn(&mut agent, 4, &mut recorder, &mut evaluator()?)?;
        assert_eq!(trainer.num_timesteps(), 8);
        // The episode continued across the calls.
        assert_eq!(trainer.num_episodes(), 1);
        // The schedules continued too: the last step of the second call is 7 of 8.
        assert!((agent.last_progress - 0.125).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_checkpoint() -> Result<()> {
        let config = TrainerConfig::default().learning_starts(4).seed(0);
        let mut trainer = trainer(config.clone(), 3, 1)?;
        let mut agent = CountingAgent::default();
        trainer.learn(&mut agent, 20, &mut BufferedRecorder::new(), &mut evaluator()?)?;

        let dir = TempDir::new("trainer_checkpoint")?;
        trainer.save_checkpoint(dir.path(), &agent, true)?;
        assert!(dir.path().join("metadata.json").exists());
        assert!(dir.path().join(REPLAY_BUFFER_DIR).join("buffer_meta.json").exists());

        let mut restored = self::trainer(config, 3, 1)?;
        let mut agent2 = CountingAgent::default();
        let meta = restored.load_checkpoint(dir.path(), &mut agent2)?;
        assert_eq!(meta.algorithm_kind, "counting");
        assert_eq!(meta.learning_rate, "constant(0.001)");
        assert_eq!(agent2.opt_calls, agent.opt_calls);
        assert_eq!(restored.num_timesteps(), 20);
        assert_eq!(restored.num_episodes(), 6);
        assert!(trainer.opt_steps() > 0);
        assert_eq!(restored.opt_steps(), trainer.opt_steps());

        let b1 = trainer.replay_buffer().unwrap();
        let b2 = restored.replay_buffer().unwrap();
        assert_eq!(b1.len(), b2.len());
        assert_eq!(b1.position(), b2.position());
        assert_eq!(b1.is_full(), b2.is_full());
        assert_eq!(
            b1.sample(16, &mut StdRng::seed_from_u64(3))?,
            b2.sample(16, &mut StdRng::seed_from_u64(3))?
        );

        std::fs::remove_file(dir.path().join("counting.json"))?;
        assert!(matches!(
            restored
                .load_checkpoint(dir.path(), &mut agent2)
                .unwrap_err()
                .downcast_ref::<PaddockError>(),
            Some(PaddockError::MissingArtifact(_))
        ));
        Ok(())
    }
}
