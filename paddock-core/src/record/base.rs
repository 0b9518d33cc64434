//! Key-value records.
//!
//! [`Record`] carries training metrics to a [`Recorder`](super::Recorder) and is also the
//! `info` map of [`Env::reset`](crate::Env::reset) and [`Env::step`](crate::Env::step).
use crate::error::PaddockError;
use chrono::prelude::{DateTime, Local};
use std::collections::{
    hash_map::{Iter, Keys},
    HashMap,
};

/// A value in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// Metric or flag.
    Scalar(f32),

    /// Timestamp.
    DateTime(DateTime<Local>),

    /// Flat array, e.g. an observation.
    Array1(Vec<f32>),

    /// Row-major matrix and its shape, written as a grayscale image by tensorboard.
    Array2(Vec<f32>, [usize; 2]),

    /// Row-major tensor and its shape.
    Array3(Vec<f32>, [usize; 3]),

    /// Text.
    String(String),
}

impl RecordValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "Scalar",
            Self::DateTime(_) => "DateTime",
            Self::Array1(_) => "Array1",
            Self::Array2(..) => "Array2",
            Self::Array3(..) => "Array3",
            Self::String(_) => "String",
        }
    }
}

/// Named [`RecordValue`]s.
///
/// ```rust
/// use paddock_core::record::{Record, RecordValue};
///
/// let mut record = Record::from_scalar("loss", 0.5);
/// record.insert("episode_length", RecordValue::Scalar(200.0));
/// assert_eq!(record.get_scalar("loss").unwrap(), 0.5);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// A record without entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A record holding the single scalar `name`.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// A record holding the given pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        s.iter().map(|(k, v)| (k.clone().into(), v.clone())).collect()
    }

    /// Names of the entries.
    pub fn keys(&self) -> Keys<String, RecordValue> {
        self.0.keys()
    }

    /// Inserts `v` under `k`, replacing any previous value.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Iterates over the entries in arbitrary order.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// The value of `k`, if any.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Returns `true` if the record holds `k`.
    pub fn contains_key(&self, k: &str) -> bool {
        self.0.contains_key(k)
    }

    /// Moves the entries of `record` into `self`; values of `record` win on conflicts.
    pub fn merge_inplace(&mut self, record: Record) {
        self.0.extend(record.0);
    }

    fn typed<T>(
        &self,
        k: &str,
        expected: &'static str,
        f: impl FnOnce(&RecordValue) -> Option<T>,
    ) -> Result<T, PaddockError> {
        let v = self
            .0
            .get(k)
            .ok_or_else(|| PaddockError::RecordKeyError(k.to_string()))?;
        f(v).ok_or_else(|| {
            PaddockError::RecordValueTypeError(format!("{} (found {})", expected, v.type_name()))
        })
    }

    /// The scalar stored under `k`.
    ///
    /// Fails with [`PaddockError::RecordKeyError`] when `k` is absent and with
    /// [`PaddockError::RecordValueTypeError`] when it holds another variant.
    pub fn get_scalar(&self, k: &str) -> Result<f32, PaddockError> {
        self.typed(k, "Scalar", |v| match v {
            RecordValue::Scalar(x) => Some(*x),
            _ => None,
        })
    }

    /// The flat array stored under `k`.
    pub fn get_array1(&self, k: &str) -> Result<Vec<f32>, PaddockError> {
        self.typed(k, "Array1", |v| match v {
            RecordValue::Array1(x) => Some(x.clone()),
            _ => None,
        })
    }

    /// The text stored under `k`.
    pub fn get_string(&self, k: &str) -> Result<String, PaddockError> {
        self.typed(k, "String", |v| match v {
            RecordValue::String(s) => Some(s.clone()),
            _ => None,
        })
    }

    /// Returns `true` if the record has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(String, RecordValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, RecordValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, RecordValue);
    type IntoIter = std::collections::hash_map::IntoIter<String, RecordValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let mut record = Record::from_scalar("loss", 1.5);
        record.insert("name", RecordValue::String("dqn".into()));
        record.insert("obs", RecordValue::Array1(vec![0.0, 1.0]));

        assert_eq!(record.get_scalar("loss"), Ok(1.5));
        assert_eq!(record.get_array1("obs"), Ok(vec![0.0, 1.0]));
        assert_eq!(record.get_string("name"), Ok("dqn".to_string()));
        assert_eq!(
            record.get_scalar("name"),
            Err(PaddockError::RecordValueTypeError(
                "Scalar (found String)".into()
            ))
        );
        assert_eq!(
            record.get_scalar("missing"),
            Err(PaddockError::RecordKeyError("missing".into()))
        );
    }

    #[test]
    fn test_merge_overwrites() {
        let mut a = Record::from_slice(&[
            ("x", RecordValue::Scalar(1.0)),
            ("y", RecordValue::Scalar(2.0)),
        ]);
        a.merge_inplace(Record::from_scalar("y", 3.0));
        assert_eq!(a.get_scalar("y"), Ok(3.0));
        assert_eq!(a.len(), 2);

        let keys = a.into_iter().map(|(k, _)| k).collect::<std::collections::BTreeSet<_>>();
        assert_eq!(keys.into_iter().collect::<Vec<_>>(), vec!["x", "y"]);
    }
}
