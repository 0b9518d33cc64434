//! Ring storage of transitions.
use super::{
    ArrayBatch, ExperienceBufferBase, ReplayBatch, ReplayBufferBase, ReplayBufferConfig,
    TransitionBatch,
};
use crate::{checkpoint::artifact, error::PaddockError, space::Space};
use anyhow::Result;
use log::{info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

const META_FILE: &str = "buffer_meta.json";
const OBS_FILE: &str = "observations.bin";
const NEXT_OBS_FILE: &str = "next_observations.bin";
const ACT_FILE: &str = "actions.bin";
const REWARD_FILE: &str = "rewards.bin";
const DONE_FILE: &str = "dones.bin";
const TIMEOUT_FILE: &str = "timeouts.bin";

/// Pointers and shapes saved along the arrays of a [`ReplayBuffer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferMeta {
    /// Number of positions of the ring.
    pub buffer_size: usize,
    /// See [`ReplayBufferConfig::optimize_memory_usage`].
    pub optimize_memory_usage: bool,
    /// See [`ReplayBufferConfig::handle_timeout_termination`].
    pub handle_timeout_termination: bool,
    /// Seed of the sampling RNG.
    pub seed: u64,
    /// Next write position.
    pub position: usize,
    /// The ring has wrapped at least once.
    pub is_full: bool,
    /// Number of populated positions.
    pub count: usize,
    /// Rows per position.
    pub num_envs: usize,
    /// Packed dimension of observations.
    pub obs_dim: usize,
    /// Packed dimension of actions.
    pub act_dim: usize,
}

/// A fixed-size ring of transitions for off-policy learning.
///
/// Each of the `capacity` positions holds one row per slot of the vectorized
/// environment; the storage row of slot `e` at position `i` is `i * num_envs + e`.
/// Observations and actions are stored as packed rows (see [`Space::pack`]).
///
/// With `optimize_memory_usage`, the next observation of position `i` is the
/// observation stored at position `(i + 1) % capacity`, which is written together
/// with the transition.
pub struct ReplayBuffer {
    config: ReplayBufferConfig,
    capacity: usize,
    num_envs: usize,
    obs_space: Space,
    act_space: Space,
    obs: ArrayBatch,
    next_obs: Option<ArrayBatch>,
    act: ArrayBatch,
    reward: Vec<f32>,
    done: Vec<f32>,
    timeout: Vec<f32>,
    pos: usize,
    full: bool,
    rng: StdRng,
}

impl ReplayBuffer {
    /// Allocates a buffer for transitions of the given spaces.
    pub fn build(
        config: &ReplayBufferConfig,
        obs_space: &Space,
        act_space: &Space,
        num_envs: usize,
    ) -> Result<Self> {
        config.validate()?;
        if num_envs == 0 {
            return Err(PaddockError::InvalidConfig("num_envs must be positive".into()).into());
        }
        let capacity = config.capacity;
        let rows = capacity * num_envs;
        let obs_dim = obs_space.packed_dim();
        let act_dim = act_space.packed_dim();
        Ok(Self {
            config: config.clone(),
            capacity,
            num_envs,
            obs_space: obs_space.clone(),
            act_space: act_space.clone(),
            obs: ArrayBatch::zeros(rows, obs_dim),
            next_obs: match config.optimize_memory_usage {
                true => None,
                false => Some(ArrayBatch::zeros(rows, obs_dim)),
            },
            act: ArrayBatch::zeros(rows, act_dim),
            reward: vec![0.0; rows],
            done: vec![0.0; rows],
            timeout: vec![0.0; rows],
            pos: 0,
            full: false,
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    /// Configuration.
    pub fn config(&self) -> &ReplayBufferConfig {
        &self.config
    }

    /// Number of positions of the ring.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Rows per position.
    pub fn num_envs(&self) -> usize {
        self.num_envs
    }

    /// Next write position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns `true` once the ring has wrapped.
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Observation space.
    pub fn obs_space(&self) -> &Space {
        &self.obs_space
    }

    /// Action space.
    pub fn act_space(&self) -> &Space {
        &self.act_space
    }

    /// Number of populated positions.
    pub fn count(&self) -> usize {
        match self.full {
            true => self.capacity,
            false => self.pos,
        }
    }

    fn check_batch(&self, tr: &TransitionBatch) -> Result<()> {
        let n = self.num_envs;
        let ok = tr.obs.dim == self.obs.dim
            && tr.next_obs.dim == self.obs.dim
            && tr.act.dim == self.act.dim
            && tr.obs.len() == n
            && tr.next_obs.len() == n
            && tr.act.len() == n
            && tr.reward.len() == n
            && tr.is_terminated.len() == n
            && tr.is_truncated.len() == n;
        match ok {
            true => Ok(()),
            false => Err(PaddockError::InvalidConfig(format!(
                "transition batch does not match a buffer of {} slots with dims ({}, {})",
                n, self.obs.dim, self.act.dim
            ))
            .into()),
        }
    }

    /// Samples `batch_size` transitions with `rng`.
    ///
    /// Positions are drawn uniformly among the populated ones, then a slot is drawn
    /// uniformly for each of them. With `optimize_memory_usage` and a full ring, the
    /// write position is excluded because its next observation has been overwritten.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<ReplayBatch> {
        if self.count() == 0 {
            return Err(PaddockError::EmptyBuffer.into());
        }
        let batch_inds = (0..batch_size)
            .map(|_| {
                if self.config.optimize_memory_usage && self.full {
                    (rng.gen_range(1..self.capacity) + self.pos) % self.capacity
                } else {
                    rng.gen_range(0..self.count())
                }
            })
            .collect::<Vec<_>>();
        let env_inds = (0..batch_size)
            .map(|_| rng.gen_range(0..self.num_envs))
            .collect::<Vec<_>>();

        let ixs = batch_inds
            .iter()
            .zip(env_inds.iter())
            .map(|(i, e)| i * self.num_envs + e)
            .collect::<Vec<_>>();
        let next_obs = match &self.next_obs {
            Some(next_obs) => next_obs.sample(&ixs),
            None => {
                let next_ixs = batch_inds
                    .iter()
                    .zip(env_inds.iter())
                    .map(|(i, e)| ((i + 1) % self.capacity) * self.num_envs + e)
                    .collect::<Vec<_>>();
                self.obs.sample(&next_ixs)
            }
        };
        let done = ixs
            .iter()
            .map(|&ix| match self.config.handle_timeout_termination {
                true => self.done[ix] * (1.0 - self.timeout[ix]),
                false => self.done[ix],
            })
            .collect();

        Ok(ReplayBatch {
            obs: self.obs.sample(&ixs),
            act: self.act.sample(&ixs),
            next_obs,
            reward: ixs.iter().map(|&ix| self.reward[ix]).collect(),
            done,
            ix_sample: ixs,
        })
    }

    fn meta(&self) -> BufferMeta {
        BufferMeta {
            buffer_size: self.capacity,
            optimize_memory_usage: self.config.optimize_memory_usage,
            handle_timeout_termination: self.config.handle_timeout_termination,
            seed: self.config.seed,
            position: self.pos,
            is_full: self.full,
            count: self.count(),
            num_envs: self.num_envs,
            obs_dim: self.obs.dim,
            act_dim: self.act.dim,
        }
    }

    /// Number of populated observation positions. In memory-optimized mode the
    /// position after the last transition holds its next observation.
    fn obs_prefix(&self) -> usize {
        if self.config.optimize_memory_usage && !self.full {
            (self.pos + 1).min(self.capacity)
        } else {
            self.count()
        }
    }

    /// Writes the populated part of the arrays and `buffer_meta.json` into `dir`.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let rows = self.count() * self.num_envs;
        let obs_rows = self.obs_prefix() * self.num_envs;

        write_array(dir.join(OBS_FILE), &self.obs.data[..obs_rows * self.obs.dim])?;
        if let Some(next_obs) = &self.next_obs {
            write_array(dir.join(NEXT_OBS_FILE), &next_obs.data[..rows * next_obs.dim])?;
        }
        write_array(dir.join(ACT_FILE), &self.act.data[..rows * self.act.dim])?;
        write_array(dir.join(REWARD_FILE), &self.reward[..rows])?;
        write_array(dir.join(DONE_FILE), &self.done[..rows])?;
        write_array(dir.join(TIMEOUT_FILE), &self.timeout[..rows])?;

        let file = File::create(dir.join(META_FILE))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.meta())?;
        info!("Saved replay buffer ({} positions) in {:?}", self.count(), dir);
        Ok(())
    }

    /// Restores arrays and pointers written by [`save`](Self::save).
    ///
    /// The saved buffer must have the same capacity, number of slots, dimensions and
    /// memory layout. Positions that were not saved are zero.
    pub fn load(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        let meta: BufferMeta = {
            let path = artifact(dir, META_FILE)?;
            serde_json::from_reader(BufReader::new(File::open(path)?))?
        };
        let current = self.meta();
        if meta.buffer_size != current.buffer_size
            || meta.num_envs != current.num_envs
            || meta.obs_dim != current.obs_dim
            || meta.act_dim != current.act_dim
            || meta.optimize_memory_usage != current.optimize_memory_usage
        {
            return Err(PaddockError::InvalidConfig(format!(
                "saved replay buffer {:?} is incompatible with {:?}",
                meta, current
            ))
            .into());
        }
        if meta.handle_timeout_termination != current.handle_timeout_termination {
            warn!(
                "Replay buffer was saved with handle_timeout_termination = {}",
                meta.handle_timeout_termination
            );
        }
        if meta.position >= self.capacity || (!meta.is_full && meta.count != meta.position) {
            return Err(PaddockError::InvalidConfig(format!(
                "inconsistent pointers in {:?}",
                meta
            ))
            .into());
        }

        let rows = self.capacity * self.num_envs;
        self.obs = read_array(dir, OBS_FILE, rows, self.obs.dim)?;
        self.next_obs = match self.next_obs {
            Some(_) => Some(read_array(dir, NEXT_OBS_FILE, rows, self.obs.dim)?),
            None => None,
        };
        self.act = read_array(dir, ACT_FILE, rows, self.act.dim)?;
        self.reward = read_array(dir, REWARD_FILE, rows, 1)?.data;
        self.done = read_array(dir, DONE_FILE, rows, 1)?.data;
        self.timeout = read_array(dir, TIMEOUT_FILE, rows, 1)?.data;
        self.pos = meta.position;
        self.full = meta.is_full;
        info!("Loaded replay buffer ({} positions) from {:?}", self.count(), dir);
        Ok(())
    }
}

fn write_array(path: PathBuf, data: &[f32]) -> Result<()> {
    let file = File::create(path)?;
    bincode::serialize_into(BufWriter::new(file), data)?;
    Ok(())
}

/// Reads a saved prefix and pads it with zeros to `rows` rows.
fn read_array(dir: &Path, name: &str, rows: usize, dim: usize) -> Result<ArrayBatch> {
    let path = artifact(dir, name)?;
    let mut data: Vec<f32> = bincode::deserialize_from(BufReader::new(File::open(&path)?))?;
    if data.len() > rows * dim || data.len() % dim.max(1) != 0 {
        return Err(PaddockError::InvalidConfig(format!(
            "{:?} holds {} elements, more than {} rows of {}",
            path,
            data.len(),
            rows,
            dim
        ))
        .into());
    }
    data.resize(rows * dim, 0.0);
    Ok(ArrayBatch { data, dim })
}

impl ExperienceBufferBase for ReplayBuffer {
    type Item = TransitionBatch;

    /// Writes one row per slot at the current position and advances it.
    fn push(&mut self, tr: TransitionBatch) -> Result<()> {
        self.check_batch(&tr)?;
        let n = self.num_envs;
        for e in 0..n {
            let row = self.pos * n + e;
            self.obs.set_row(row, tr.obs.row(e));
            match &mut self.next_obs {
                Some(next_obs) => next_obs.set_row(row, tr.next_obs.row(e)),
                None => {
                    let next_row = ((self.pos + 1) % self.capacity) * n + e;
                    self.obs.set_row(next_row, tr.next_obs.row(e));
                }
            }
            self.act.set_row(row, tr.act.row(e));
            self.reward[row] = tr.reward[e];
            let truncated = tr.is_truncated[e] == 1;
            self.done[row] = (tr.is_terminated[e] == 1 || truncated) as i32 as f32;
            self.timeout[row] = truncated as i32 as f32;
        }

        self.pos += 1;
        if self.pos == self.capacity {
            self.full = true;
            self.pos = 0;
        }
        Ok(())
    }

    /// Number of populated positions.
    fn len(&self) -> usize {
        self.count()
    }
}

impl ReplayBufferBase for ReplayBuffer {
    type Batch = ReplayBatch;

    fn batch(&mut self, size: usize) -> Result<ReplayBatch> {
        let mut rng = self.rng.clone();
        let batch = self.sample(size, &mut rng)?;
        self.rng = rng;
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::Value;
    use tempdir::TempDir;

    fn transition(x: f32, terminated: bool, truncated: bool) -> TransitionBatch {
        TransitionBatch {
            obs: ArrayBatch {
                data: vec![x],
                dim: 1,
            },
            act: ArrayBatch {
                data: vec![1.0],
                dim: 1,
            },
            next_obs: ArrayBatch {
                data: vec![x + 1.0],
                dim: 1,
            },
            reward: vec![x],
            is_terminated: vec![terminated as i8],
            is_truncated: vec![truncated as i8],
        }
    }

    fn build(config: &ReplayBufferConfig) -> Result<ReplayBuffer> {
        ReplayBuffer::build(
            config,
            &Space::boxed(&[-1000.0], &[1000.0], &[1])?,
            &Space::discrete(2)?,
            1,
        )
    }

    #[test]
    fn test_wraps_around() -> Result<()> {
        let mut buffer = build(&ReplayBufferConfig::default().capacity(10))?;
        for i in 0..15 {
            buffer.push(transition(i as f32, false, false))?;
        }
        assert_eq!(buffer.len(), 10);
        assert!(buffer.is_full());
        assert_eq!(buffer.position(), 5);

        let batch = buffer.batch(200)?;
        assert!(batch.obs.data.iter().all(|&x| x >= 5.0));
        assert!(batch
            .obs
            .data
            .iter()
            .zip(batch.next_obs.data.iter())
            .all(|(o, n)| *n == o + 1.0));
        Ok(())
    }

    #[test]
    fn test_empty() -> Result<()> {
        let mut buffer = build(&ReplayBufferConfig::default())?;
        assert_eq!(
            buffer.batch(4).unwrap_err().downcast_ref::<PaddockError>(),
            Some(&PaddockError::EmptyBuffer)
        );
        Ok(())
    }

    #[test]
    fn test_memory_optimized_aliasing() -> Result<()> {
        let config = ReplayBufferConfig::default()
            .capacity(4)
            .optimize_memory_usage(true)
            .handle_timeout_termination(false);
        let mut buffer = build(&config)?;
        for i in 0..6 {
            buffer.push(transition(i as f32, false, false))?;
        }
        // Position 2 is the write head; its successor no longer matches.
        let batch = buffer.batch(200)?;
        for (ix, (o, n)) in batch
            .ix_sample
            .iter()
            .zip(batch.obs.data.iter().zip(batch.next_obs.data.iter()))
        {
            assert_ne!(*ix, buffer.position());
            assert_eq!(*n, buffer.obs.row((ix + 1) % 4)[0]);
            assert_eq!(*n, o + 1.0);
        }
        Ok(())
    }

    #[test]
    fn test_timeout_correction() -> Result<()> {
        let mut buffer = build(&ReplayBufferConfig::default().capacity(4))?;
        buffer.push(transition(0.0, false, true))?;
        assert!(buffer.batch(10)?.done.iter().all(|&d| d == 0.0));

        let mut buffer = build(&ReplayBufferConfig::default().capacity(4))?;
        buffer.push(transition(0.0, true, true))?;
        assert!(buffer.batch(10)?.done.iter().all(|&d| d == 1.0));

        let config = ReplayBufferConfig::default()
            .capacity(4)
            .handle_timeout_termination(false);
        let mut buffer = build(&config)?;
        buffer.push(transition(0.0, false, true))?;
        assert!(buffer.batch(10)?.done.iter().all(|&d| d == 1.0));
        Ok(())
    }

    #[test]
    fn test_vectorized_rows() -> Result<()> {
        let obs_space = Space::discrete(100)?;
        let act_space = Space::discrete(2)?;
        let config = ReplayBufferConfig::default().capacity(8);
        let mut buffer = ReplayBuffer::build(&config, &obs_space, &act_space, 3)?;
        let obs = [Value::Discrete(10), Value::Discrete(20), Value::Discrete(30)];
        let next_obs = [Value::Discrete(11), Value::Discrete(21), Value::Discrete(31)];
        let acts = [Value::Discrete(0), Value::Discrete(1), Value::Discrete(0)];
        buffer.push(TransitionBatch {
            obs: ArrayBatch::pack(&obs_space, &obs)?,
            act: ArrayBatch::pack(&act_space, &acts)?,
            next_obs: ArrayBatch::pack(&obs_space, &next_obs)?,
            reward: vec![1.0, 2.0, 3.0],
            is_terminated: vec![0, 0, 1],
            is_truncated: vec![0, 0, 0],
        })?;
        assert_eq!(buffer.len(), 1);

        let batch = buffer.batch(50)?;
        for (k, ix) in batch.ix_sample.iter().enumerate() {
            let o = batch.obs.row(k)[0];
            assert_eq!(o, 10.0 * (*ix as f32 + 1.0));
            assert_eq!(batch.next_obs.row(k)[0], o + 1.0);
            assert_eq!(batch.reward[k], *ix as f32 + 1.0);
            assert_eq!(batch.done[k], (*ix == 2) as i32 as f32);
        }

        let mut wrong = transition(0.0, false, false);
        wrong.reward = vec![0.0; 3];
        assert!(buffer.push(wrong).is_err());
        Ok(())
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let config = ReplayBufferConfig::default()
            .capacity(16)
            .optimize_memory_usage(true)
            .handle_timeout_termination(false);
        let mut buffer = build(&config)?;
        for i in 0..9 {
            buffer.push(transition(i as f32, i % 4 == 3, false))?;
        }
        let dir = TempDir::new("replay_buffer")?;
        buffer.save(dir.path())?;

        let mut loaded = build(&config)?;
        loaded.load(dir.path())?;
        assert_eq!(loaded.len(), buffer.len());
        assert_eq!(loaded.position(), buffer.position());
        assert_eq!(loaded.is_full(), buffer.is_full());

        let b1 = buffer.sample(32, &mut StdRng::seed_from_u64(5))?;
        let b2 = loaded.sample(32, &mut StdRng::seed_from_u64(5))?;
        assert_eq!(b1, b2);

        let mut other = build(&config.clone().capacity(32))?;
        assert!(other.load(dir.path()).is_err());

        let empty = TempDir::new("replay_buffer_empty")?;
        assert!(matches!(
            loaded.load(empty.path()).unwrap_err().downcast_ref::<PaddockError>(),
            Some(PaddockError::MissingArtifact(_))
        ));
        Ok(())
    }
}
