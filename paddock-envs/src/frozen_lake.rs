//! FrozenLake.
use anyhow::Result;
use paddock_core::{
    error::PaddockError,
    record::{Record, RecordValue},
    seeded_rng, Env, Info, RenderFrame, Space, Step, Value,
};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};

const MAP_4X4: [&str; 4] = ["SFFF", "FHFH", "FFFH", "HFFG"];

const MAP_8X8: [&str; 8] = [
    "SFFFFFFF", "FFFFFFFF", "FFFHFFFF", "FFFFFHFF", "FFFHFFFF", "FHHFFFHF", "FHFFHFHF",
    "FFFHFFFG",
];

const ACTION_NAMES: [&str; 4] = ["Left", "Down", "Right", "Up"];

/// Predefined maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapName {
    /// 4 x 4 lake with 4 holes.
    #[serde(rename = "4x4")]
    Map4x4,

    /// 8 x 8 lake with 10 holes.
    #[serde(rename = "8x8")]
    Map8x8,
}

/// Configuration of [`FrozenLake`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrozenLakeConfig {
    /// Predefined map, ignored when `desc` is given.
    pub map_name: MapName,

    /// Custom map, one string per row made of `S` (start), `F` (frozen), `H` (hole)
    /// and `G` (goal).
    pub desc: Option<Vec<String>>,

    /// With probability 2/3 the agent slips to one of the perpendicular directions.
    pub is_slippery: bool,
}

impl Default for FrozenLakeConfig {
    fn default() -> Self {
        Self {
            map_name: MapName::Map4x4,
            desc: None,
            is_slippery: true,
        }
    }
}

impl FrozenLakeConfig {
    /// Sets the predefined map.
    pub fn map_name(mut self, v: MapName) -> Self {
        self.map_name = v;
        self
    }

    /// Sets a custom map.
    pub fn desc(mut self, rows: &[&str]) -> Self {
        self.desc = Some(rows.iter().map(|r| r.to_string()).collect());
        self
    }

    /// Sets slipperiness.
    pub fn is_slippery(mut self, v: bool) -> Self {
        self.is_slippery = v;
        self
    }

    fn rows(&self) -> Vec<String> {
        match &self.desc {
            Some(desc) => desc.clone(),
            None => match self.map_name {
                MapName::Map4x4 => MAP_4X4.iter().map(|r| r.to_string()).collect(),
                MapName::Map8x8 => MAP_8X8.iter().map(|r| r.to_string()).collect(),
            },
        }
    }
}

/// Cross a frozen lake from the start `S` to the goal `G` without falling into a hole
/// `H`.
///
/// The observation is the index `row * ncol + col` of the agent's cell. Actions are `0`
/// (left), `1` (down), `2` (right) and `3` (up); moving into the border leaves the agent
/// in place. Reaching the goal yields reward `1` and terminates the episode, falling
/// into a hole terminates it with reward `0`.
///
/// On a slippery lake the agent moves in the intended direction or in one of the two
/// perpendicular directions, each with probability 1/3. The info of every step holds
/// the probability of the transition under `"prob"`.
///
/// [`render`](Env::render) returns the map as ANSI text with the agent's cell
/// highlighted, preceded by the last action.
pub struct FrozenLake {
    desc: Vec<Vec<u8>>,
    nrow: usize,
    ncol: usize,
    start: usize,
    is_slippery: bool,
    obs_space: Space,
    act_space: Space,
    s: Option<usize>,
    last_action: Option<usize>,
    rng: StdRng,
}

impl FrozenLake {
    /// Constructs the environment.
    pub fn build(config: FrozenLakeConfig) -> Result<Self> {
        let desc = config
            .rows()
            .into_iter()
            .map(String::into_bytes)
            .collect::<Vec<_>>();
        let nrow = desc.len();
        let ncol = desc.first().map_or(0, |r| r.len());
        if nrow == 0 || ncol == 0 || desc.iter().any(|r| r.len() != ncol) {
            return Err(PaddockError::InvalidConfig("map must be a non-empty rectangle".into()).into());
        }
        let cells = desc.iter().flatten().copied().collect::<Vec<_>>();
        if let Some(c) = cells.iter().find(|&&c| !b"SFHG".contains(&c)) {
            return Err(PaddockError::InvalidConfig(format!("unknown map cell `{}`", *c as char)).into());
        }
        let start = match cells.iter().filter(|&&c| c == b'S').count() {
            1 => cells.iter().position(|&c| c == b'S').unwrap_or_default(),
            _ => {
                return Err(PaddockError::InvalidConfig("map needs exactly one start".into()).into())
            }
        };
        if !cells.contains(&b'G') {
            return Err(PaddockError::InvalidConfig("map needs a goal".into()).into());
        }

        Ok(Self {
            obs_space: Space::discrete(nrow * ncol)?,
            act_space: Space::discrete(4)?,
            desc,
            nrow,
            ncol,
            start,
            is_slippery: config.is_slippery,
            s: None,
            last_action: None,
            rng: seeded_rng(None),
        })
    }

    /// Number of rows and columns.
    pub fn shape(&self) -> (usize, usize) {
        (self.nrow, self.ncol)
    }

    fn cell(&self, s: usize) -> u8 {
        self.desc[s / self.ncol][s % self.ncol]
    }

    fn moved(&self, s: usize, a: usize) -> usize {
        let (row, col) = (s / self.ncol, s % self.ncol);
        let (row, col) = match a {
            0 => (row, col.saturating_sub(1)),
            1 => ((row + 1).min(self.nrow - 1), col),
            2 => (row, (col + 1).min(self.ncol - 1)),
            _ => (row.saturating_sub(1), col),
        };
        row * self.ncol + col
    }
}

impl Env for FrozenLake {
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
        self.s = Some(self.start);
        self.last_action = None;
        Ok((
            Value::Discrete(self.start as i64),
            Record::from_scalar("prob", 1.0),
        ))
    }

    fn step(&mut self, act: &Value) -> Result<Step> {
        let s = self.s.ok_or_else(|| PaddockError::ResetNeeded("step".into()))?;
        let a = match act.as_discrete() {
            Some(a @ 0..=3) => a as usize,
            _ => return Err(PaddockError::InvalidAction(format!("{:?}", act)).into()),
        };

        let (s_next, prob) = if matches!(self.cell(s), b'H' | b'G') {
            (s, 1.0)
        } else if self.is_slippery {
            let b = (a + 3 + self.rng.gen_range(0..3)) % 4;
            (self.moved(s, b), 1.0 / 3.0)
        } else {
            (self.moved(s, a), 1.0)
        };
        let terminated = matches!(self.cell(s_next), b'H' | b'G');
        let reward = match self.cell(s_next) == b'G' && s_next != s {
            true => 1.0,
            false => 0.0,
        };
        self.s = Some(s_next);
        self.last_action = Some(a);

        let mut info = Record::empty();
        info.insert("prob", RecordValue::Scalar(prob));
        Ok(Step::new(
            Value::Discrete(s_next as i64),
            reward,
            terminated,
            false,
            info,
        ))
    }

    fn render(&mut self) -> Result<Option<RenderFrame>> {
        let s = self.s.ok_or_else(|| PaddockError::ResetNeeded("render".into()))?;
        let mut out = String::new();
        if let Some(a) = self.last_action {
            out.push_str(&format!("  ({})\n", ACTION_NAMES[a]));
        }
        for (row, cells) in self.desc.iter().enumerate() {
            for (col, &c) in cells.iter().enumerate() {
                if row * self.ncol + col == s {
                    out.push_str(&format!("\x1b[41m{}\x1b[0m", c as char));
                } else {
                    out.push(c as char);
                }
            }
            out.push('\n');
        }
        Ok(Some(RenderFrame::Ansi(out)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deterministic() -> Result<FrozenLake> {
        FrozenLake::build(FrozenLakeConfig::default().is_slippery(false))
    }

    #[test]
    fn test_shortest_path() -> Result<()> {
        let mut env = deterministic()?;
        let (obs, _) = env.reset(Some(0), None)?;
        assert_eq!(obs, Value::Discrete(0));
        // Down, down, right, right, down, right.
        let path = [1, 1, 2, 2, 1, 2];
        for (i, &a) in path.iter().enumerate() {
            let step = env.step(&Value::Discrete(a))?;
            let last = i == path.len() - 1;
            assert_eq!(step.is_terminated, last);
            assert_eq!(step.reward, if last { 1.0 } else { 0.0 });
        }
        Ok(())
    }

    #[test]
    fn test_hole_and_border() -> Result<()> {
        let mut env = deterministic()?;
        env.reset(None, None)?;
        let step = env.step(&Value::Discrete(0))?;
        assert_eq!(step.obs, Value::Discrete(0));
        let step = env.step(&Value::Discrete(2))?;
        let step2 = env.step(&Value::Discrete(1))?;
        assert_eq!(step.obs, Value::Discrete(1));
        assert_eq!(step2.obs, Value::Discrete(5));
        assert!(step2.is_terminated);
        assert_eq!(step2.reward, 0.0);
        Ok(())
    }

    #[test]
    fn test_slippery_moves() -> Result<()> {
        let mut env = FrozenLake::build(FrozenLakeConfig::default())?;
        for seed in 0..20 {
            env.reset(Some(seed), None)?;
            let step = env.step(&Value::Discrete(2))?;
            // Right slips to up (stays) or down.
            assert!([Value::Discrete(0), Value::Discrete(1), Value::Discrete(4)].contains(&step.obs));
            assert!((step.info.get_scalar("prob")? - 1.0 / 3.0).abs() < 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_render() -> Result<()> {
        let mut env = deterministic()?;
        assert!(env.render().is_err());
        env.reset(None, None)?;
        env.step(&Value::Discrete(1))?;
        let frame = env.render()?;
        let expected = "  (Down)\nSFFF\n\x1b[41mF\x1b[0mHFH\nFFFH\nHFFG\n";
        assert_eq!(frame, Some(RenderFrame::Ansi(expected.into())));
        Ok(())
    }

    #[test]
    fn test_custom_map() -> Result<()> {
        let env = FrozenLake::build(FrozenLakeConfig::default().desc(&["SFG"]))?;
        assert_eq!(env.shape(), (1, 3));
        assert!(FrozenLake::build(FrozenLakeConfig::default().desc(&["SF", "G"])).is_err());
        assert!(FrozenLake::build(FrozenLakeConfig::default().desc(&["SFX"])).is_err());
        assert!(FrozenLake::build(FrozenLakeConfig::default().desc(&["FFG"])).is_err());
        let env = FrozenLake::build(FrozenLakeConfig::default().map_name(MapName::Map8x8))?;
        assert_eq!(env.observation_space(), &Space::discrete(64)?);
        Ok(())
    }
}
