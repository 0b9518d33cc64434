//! Hooks into the training loop.
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Hooks called by [`Trainer::learn`](super::Trainer::learn).
///
/// All methods have empty default implementations.
pub trait Callback {
    /// Called once before the first step.
    fn on_training_start(&mut self, _num_timesteps: usize) {}

    /// Called after every vectorized step. Returning `false` stops training.
    fn on_step(&mut self, _num_timesteps: usize) -> bool {
        true
    }

    /// Called when the episode of slot `slot` ends.
    fn on_episode_end(&mut self, _slot: usize, _episode_return: f32, _episode_length: usize) {}

    /// Called once when training ends, whether it finished or was stopped.
    fn on_training_end(&mut self, _num_timesteps: usize) {}
}

/// Cooperative stop flag of a training loop, shareable across threads.
///
/// The loop checks the flag before every step. The flag is cleared when
/// [`Trainer::learn`](super::Trainer::learn) starts.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Requests the training loop to stop.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` if a stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Stops training once a number of episodes has finished.
pub struct StopAfterEpisodes {
    max_episodes: usize,
    episodes: usize,
}

impl StopAfterEpisodes {
    /// Stops after `max_episodes` episodes, summed over slots.
    pub fn new(max_episodes: usize) -> Self {
        Self {
            max_episodes,
            episodes: 0,
        }
    }
}

impl Callback for StopAfterEpisodes {
    fn on_training_start(&mut self, _num_timesteps: usize) {
        self.episodes = 0;
    }

    fn on_step(&mut self, _num_timesteps: usize) -> bool {
        self.episodes < self.max_episodes
    }

    fn on_episode_end(&mut self, _slot: usize, _episode_return: f32, _episode_length: usize) {
        self.episodes += 1;
    }
}
