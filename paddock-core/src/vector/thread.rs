use super::{slot_seed, sync::check_spaces, AutoresetMode, EnvSlot, SlotStep, VecEnv, VecStep};
use crate::{
    env::Env,
    error::PaddockError,
    record::Record,
    space::{Space, Value},
};
use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info, warn};
use std::{
    any::Any,
    panic::{catch_unwind, AssertUnwindSafe},
    thread::JoinHandle,
};

/// Commands sent to a worker.
enum Command {
    Reset {
        seed: Option<u64>,
        options: Option<Record>,
    },
    Step(Value),
    Close,
}

/// Responses sent back by a worker.
enum Response {
    Ready { obs_space: Space, act_space: Space },
    Reset(Value, Record),
    Step(SlotStep),
    Closed,
}

type Message = (usize, Result<Response>);

struct Worker {
    commands: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

/// Runs each slot in its own worker thread.
///
/// Environments are built inside the workers from `Send` factories, so the
/// environments themselves never cross threads. Commands are sent to each worker over
/// its own channel and responses come back over one shared channel tagged with the
/// slot index. Panics inside an environment are caught and reported as
/// [`PaddockError::WorkerFailed`].
///
/// ```
/// use paddock_core::{dummy::DummyEnv, vector::{ThreadVecEnv, VecEnv}, Value};
///
/// let env_fns = (0..4).map(|_| || DummyEnv::new(Some(3))).collect();
/// let mut venv = ThreadVecEnv::new(env_fns).unwrap();
/// let (obs, _) = venv.reset(Some(42), None).unwrap();
/// assert_eq!(obs.len(), 4);
/// let step = venv.step(&vec![Value::Discrete(1); 4]).unwrap();
/// assert_eq!(step.reward, vec![1.0; 4]);
/// venv.close().unwrap();
/// ```
pub struct ThreadVecEnv {
    workers: Vec<Worker>,
    results: Receiver<Message>,
    observation_space: Space,
    action_space: Space,
    mode: AutoresetMode,
    closed: bool,
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

/// Runs `f`, turning a panic into [`PaddockError::WorkerFailed`].
fn guarded<T>(index: usize, f: impl FnOnce() -> Result<T>) -> Result<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(r) => r,
        Err(payload) => Err(PaddockError::WorkerFailed {
            index,
            reason: panic_message(payload),
        }
        .into()),
    }
}

fn run_worker<F, E>(
    index: usize,
    env_fn: F,
    mode: AutoresetMode,
    commands: Receiver<Command>,
    results: Sender<Message>,
) where
    F: FnOnce() -> Result<E>,
    E: Env,
{
    let env = match guarded(index, env_fn) {
        Ok(env) => env,
        Err(e) => {
            let _ = results.send((index, Err(e)));
            return;
        }
    };
    let ready = Response::Ready {
        obs_space: env.observation_space().clone(),
        act_space: env.action_space().clone(),
    };
    if results.send((index, Ok(ready))).is_err() {
        return;
    }

    let mut slot = EnvSlot::new(env, mode);
    for command in commands.iter() {
        let (response, stop) = match command {
            Command::Reset { seed, options } => (
                guarded(index, || {
                    let (obs, info) = slot.reset(seed, options.as_ref())?;
                    Ok(Response::Reset(obs, info))
                }),
                false,
            ),
            Command::Step(act) => (
                guarded(index, || Ok(Response::Step(slot.step(&act)?))),
                false,
            ),
            Command::Close => (
                guarded(index, || {
                    slot.close()?;
                    Ok(Response::Closed)
                }),
                true,
            ),
        };
        if results.send((index, response)).is_err() || stop {
            break;
        }
    }
    debug!("Worker {} exits", index);
}

impl ThreadVecEnv {
    /// Spawns one worker per factory, builds the environments and waits until all of
    /// them are ready.
    ///
    /// Fails if `env_fns` is empty, a factory fails or the spaces of the slots differ.
    pub fn new<F, E>(env_fns: Vec<F>) -> Result<Self>
    where
        F: FnOnce() -> Result<E> + Send + 'static,
        E: Env + 'static,
    {
        Self::with_autoreset_mode(env_fns, AutoresetMode::default())
    }

    /// Like [`new`](Self::new) with the given autoreset mode.
    pub fn with_autoreset_mode<F, E>(env_fns: Vec<F>, mode: AutoresetMode) -> Result<Self>
    where
        F: FnOnce() -> Result<E> + Send + 'static,
        E: Env + 'static,
    {
        if env_fns.is_empty() {
            return Err(PaddockError::InvalidConfig("no environment factories given".into()).into());
        }
        let (results_sender, results) = unbounded();
        let workers = env_fns
            .into_iter()
            .enumerate()
            .map(|(index, env_fn)| {
                let (commands, commands_receiver) = unbounded();
                let results_sender = results_sender.clone();
                let handle = std::thread::spawn(move || {
                    run_worker(index, env_fn, mode, commands_receiver, results_sender);
                });
                Worker {
                    commands,
                    handle: Some(handle),
                }
            })
            .collect::<Vec<_>>();
        drop(results_sender);
        info!("Spawned {} environment workers", workers.len());

        // Spaces are filled in once all workers report ready.
        let mut venv = Self {
            workers,
            results,
            observation_space: Space::Tuple(vec![]),
            action_space: Space::Tuple(vec![]),
            mode,
            closed: false,
        };
        let n = venv.workers.len();
        let ready = venv.collect(n).and_then(|responses| {
            let spaces = responses
                .into_iter()
                .map(|r| match r {
                    Response::Ready {
                        obs_space,
                        act_space,
                    } => Ok((obs_space, act_space)),
                    _ => Err(unexpected()),
                })
                .collect::<Result<Vec<_>>>()?;
            let (obs_space, act_space) = spaces[0].clone();
            check_spaces(spaces.iter().map(|(o, a)| (o, a)), &obs_space, &act_space)?;
            Ok((obs_space, act_space))
        });
        match ready {
            Ok((obs_space, act_space)) => {
                venv.observation_space = obs_space;
                venv.action_space = act_space;
                Ok(venv)
            }
            Err(e) => {
                // Workers whose environment could not be built have already exited.
                let _ = venv.close();
                Err(e)
            }
        }
    }

    /// Receives one response from each of `n` workers and returns them in slot order.
    ///
    /// All responses are drained before an error is returned, so the channel carries no
    /// stale messages into the next call.
    fn collect(&self, n: usize) -> Result<Vec<Response>> {
        let mut responses: Vec<Option<Result<Response>>> =
            (0..self.workers.len()).map(|_| None).collect();
        for _ in 0..n {
            let (index, response) =
                self.results
                    .recv()
                    .map_err(|_| PaddockError::WorkerFailed {
                        index: usize::MAX,
                        reason: "all workers exited".into(),
                    })?;
            responses[index] = Some(response);
        }
        responses.into_iter().flatten().collect()
    }

    /// Sends a command to every worker and gathers the responses in slot order.
    fn broadcast(&self, mut command: impl FnMut(usize) -> Command) -> Result<Vec<Response>> {
        let mut sent = 0;
        let mut error = None;
        for (i, worker) in self.workers.iter().enumerate() {
            if worker.commands.send(command(i)).is_ok() {
                sent += 1;
            } else if error.is_none() {
                error = Some(PaddockError::WorkerFailed {
                    index: i,
                    reason: "worker has exited".into(),
                });
            }
        }
        let responses = self.collect(sent)?;
        match error {
            Some(e) => Err(e.into()),
            None => Ok(responses),
        }
    }
}

fn unexpected() -> anyhow::Error {
    PaddockError::WorkerFailed {
        index: usize::MAX,
        reason: "unexpected response".into(),
    }
    .into()
}

impl VecEnv for ThreadVecEnv {
    fn num_envs(&self) -> usize {
        self.workers.len()
    }

    fn single_observation_space(&self) -> &Space {
        &self.observation_space
    }

    fn single_action_space(&self) -> &Space {
        &self.action_space
    }

    fn autoreset_mode(&self) -> AutoresetMode {
        self.mode
    }

    fn reset(
        &mut self,
        seed: Option<u64>,
        options: Option<&Record>,
    ) -> Result<(Vec<Value>, Vec<Record>)> {
        if self.closed {
            return Err(PaddockError::VecEnvClosed.into());
        }
        let responses = self.broadcast(|i| Command::Reset {
            seed: slot_seed(seed, i),
            options: options.cloned(),
        })?;
        let mut obs = Vec::with_capacity(responses.len());
        let mut infos = Vec::with_capacity(responses.len());
        for response in responses {
            match response {
                Response::Reset(o, info) => {
                    obs.push(o);
                    infos.push(info);
                }
                _ => return Err(unexpected()),
            }
        }
        Ok((obs, infos))
    }

    fn step(&mut self, acts: &[Value]) -> Result<VecStep> {
        if self.closed {
            return Err(PaddockError::VecEnvClosed.into());
        }
        if acts.len() != self.workers.len() {
            return Err(PaddockError::InvalidAction(format!(
                "{} actions given to {} environments",
                acts.len(),
                self.workers.len()
            ))
            .into());
        }
        let steps = self
            .broadcast(|i| Command::Step(acts[i].clone()))?
            .into_iter()
            .map(|response| match response {
                Response::Step(step) => Ok(step),
                _ => Err(unexpected()),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(VecStep::from_slots(steps))
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let result = self.broadcast(|_| Command::Close);
        for (i, worker) in self.workers.iter_mut().enumerate() {
            if let Some(handle) = worker.handle.take() {
                if handle.join().is_err() {
                    warn!("Worker {} panicked while exiting", i);
                }
            }
        }
        info!("Closed {} environment workers", self.workers.len());
        result.map(|_| ())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for ThreadVecEnv {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close ThreadVecEnv: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dummy::DummyEnv, env::Info, env::Step};

    struct Exploding {
        inner: DummyEnv,
    }

    impl Env for Exploding {
        fn observation_space(&self) -> &Space {
            self.inner.observation_space()
        }

        fn action_space(&self) -> &Space {
            self.inner.action_space()
        }

        fn reset(&mut self, seed: Option<u64>, options: Option<&Record>) -> Result<(Value, Info)> {
            self.inner.reset(seed, options)
        }

        fn step(&mut self, act: &Value) -> Result<Step> {
            if act == &Value::Discrete(1) {
                panic!("boom");
            }
            self.inner.step(act)
        }
    }

    #[test]
    fn test_panic_is_reported() -> Result<()> {
        let env_fns = (0..2)
            .map(|_| {
                || -> Result<Exploding> {
                    Ok(Exploding {
                        inner: DummyEnv::new(None)?,
                    })
                }
            })
            .collect();
        let mut venv = ThreadVecEnv::new(env_fns)?;
        venv.reset(None, None)?;
        let err = venv
            .step(&[Value::Discrete(0), Value::Discrete(1)])
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<PaddockError>(),
            Some(&PaddockError::WorkerFailed {
                index: 1,
                reason: "boom".into()
            })
        );

        // The worker survives and the other slot is intact.
        let step = venv.step(&[Value::Discrete(0), Value::Discrete(0)])?;
        assert_eq!(step.obs[0], Value::Discrete(2));
        venv.close()?;
        Ok(())
    }

    #[test]
    fn test_factory_error() {
        let env_fns: Vec<Box<dyn FnOnce() -> Result<DummyEnv> + Send>> = vec![
            Box::new(|| DummyEnv::new(None)),
            Box::new(|| Err(PaddockError::InvalidConfig("bad".into()).into())),
        ];
        let err = ThreadVecEnv::new(env_fns).err().unwrap();
        assert_eq!(
            err.downcast_ref::<PaddockError>(),
            Some(&PaddockError::InvalidConfig("bad".into()))
        );
    }
}
