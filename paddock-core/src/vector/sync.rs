use super::{slot_seed, AutoresetMode, EnvSlot, VecEnv, VecStep};
use crate::{
    env::Env,
    error::PaddockError,
    record::Record,
    space::{Space, Value},
};
use anyhow::Result;
use log::debug;

/// Steps its slots serially, in index order, on the calling thread.
pub struct SyncVecEnv<E: Env = Box<dyn Env>> {
    slots: Vec<EnvSlot<E>>,
    observation_space: Space,
    action_space: Space,
    mode: AutoresetMode,
    closed: bool,
}

impl<E: Env> SyncVecEnv<E> {
    /// Takes ownership of `envs`, which must be non-empty and share their spaces.
    pub fn new(envs: Vec<E>) -> Result<Self> {
        let first = envs
            .first()
            .ok_or_else(|| PaddockError::InvalidConfig("no environments given".into()))?;
        let observation_space = first.observation_space().clone();
        let action_space = first.action_space().clone();
        check_spaces(
            envs.iter()
                .map(|env| (env.observation_space(), env.action_space())),
            &observation_space,
            &action_space,
        )?;
        debug!("Built SyncVecEnv with {} slots", envs.len());

        let mode = AutoresetMode::default();
        Ok(Self {
            slots: envs.into_iter().map(|env| EnvSlot::new(env, mode)).collect(),
            observation_space,
            action_space,
            mode,
            closed: false,
        })
    }

    /// Sets the autoreset mode.
    pub fn with_autoreset_mode(self, mode: AutoresetMode) -> Self {
        Self {
            slots: self
                .slots
                .into_iter()
                .map(|slot| EnvSlot::new(slot.into_env(), mode))
                .collect(),
            mode,
            ..self
        }
    }

    /// The environment of slot `i`.
    pub fn env(&self, i: usize) -> Option<&E> {
        self.slots.get(i).map(|slot| slot.env())
    }
}

pub(super) fn check_spaces<'a>(
    spaces: impl Iterator<Item = (&'a Space, &'a Space)>,
    observation_space: &Space,
    action_space: &Space,
) -> Result<()> {
    for (i, (obs_space, act_space)) in spaces.enumerate() {
        if obs_space != observation_space || act_space != action_space {
            return Err(PaddockError::InvalidConfig(format!(
                "spaces of slot {} differ from those of slot 0",
                i
            ))
            .into());
        }
    }
    Ok(())
}

impl<E: Env> VecEnv for SyncVecEnv<E> {
    fn num_envs(&self) -> usize {
        self.slots.len()
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
        let mut obs = Vec::with_capacity(self.slots.len());
        let mut infos = Vec::with_capacity(self.slots.len());
        for (i, slot) in self.slots.iter_mut().enumerate() {
            let (o, info) = slot.reset(slot_seed(seed, i), options)?;
            obs.push(o);
            infos.push(info);
        }
        Ok((obs, infos))
    }

    fn step(&mut self, acts: &[Value]) -> Result<VecStep> {
        if self.closed {
            return Err(PaddockError::VecEnvClosed.into());
        }
        if acts.len() != self.slots.len() {
            return Err(PaddockError::InvalidAction(format!(
                "{} actions given to {} environments",
                acts.len(),
                self.slots.len()
            ))
            .into());
        }
        let steps = self
            .slots
            .iter_mut()
            .zip(acts.iter())
            .map(|(slot, act)| slot.step(act))
            .collect::<Result<Vec<_>>>()?;
        Ok(VecStep::from_slots(steps))
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        for slot in self.slots.iter_mut() {
            slot.close()?;
        }
        debug!("Closed SyncVecEnv");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dummy::DummyEnv, wrapper::TransformObservation};

    #[test]
    fn test_mismatched_spaces() -> Result<()> {
        let a: Box<dyn Env> = Box::new(DummyEnv::new(Some(2))?);
        let b: Box<dyn Env> = Box::new(DummyEnv::new(Some(3))?);
        assert!(SyncVecEnv::new(vec![a, b]).is_err());
        assert!(SyncVecEnv::<DummyEnv>::new(vec![]).is_err());

        let c = TransformObservation::new(DummyEnv::new(Some(2))?, |obs| obs);
        assert!(SyncVecEnv::new(vec![c]).is_ok());
        Ok(())
    }
}
