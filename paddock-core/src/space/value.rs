//! Values of observations and actions.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A point of a [`Space`](super::Space).
///
/// The variants mirror the variants of [`Space`](super::Space): a value is a member of a
/// space only if both have the same variant, see [`Space::contains`](super::Space::contains).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// An element of a [`Discrete`](super::Discrete) space.
    Discrete(i64),

    /// An element of a [`BoxSpace`](super::BoxSpace), flattened in row-major order.
    Box(Vec<f32>),

    /// An element of a [`MultiDiscrete`](super::MultiDiscrete) space.
    MultiDiscrete(Vec<i64>),

    /// An element of a tuple space.
    Tuple(Vec<Value>),

    /// An element of a dict space.
    Dict(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the integer of a discrete value.
    pub fn as_discrete(&self) -> Option<i64> {
        match self {
            Self::Discrete(x) => Some(*x),
            _ => None,
        }
    }

    /// Returns the elements of a box value.
    pub fn as_box(&self) -> Option<&[f32]> {
        match self {
            Self::Box(x) => Some(x.as_slice()),
            _ => None,
        }
    }

    /// Returns the elements of a multi-discrete value.
    pub fn as_multi_discrete(&self) -> Option<&[i64]> {
        match self {
            Self::MultiDiscrete(x) => Some(x.as_slice()),
            _ => None,
        }
    }

    /// Returns the name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Discrete(_) => "Discrete",
            Self::Box(_) => "Box",
            Self::MultiDiscrete(_) => "MultiDiscrete",
            Self::Tuple(_) => "Tuple",
            Self::Dict(_) => "Dict",
        }
    }
}

impl From<i64> for Value {
    fn from(x: i64) -> Self {
        Self::Discrete(x)
    }
}

impl From<Vec<f32>> for Value {
    fn from(x: Vec<f32>) -> Self {
        Self::Box(x)
    }
}

impl From<Vec<i64>> for Value {
    fn from(x: Vec<i64>) -> Self {
        Self::MultiDiscrete(x)
    }
}
