//! Raw parameter values and paramsets mirrored from the coordinator.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the paramset carrying live values.
pub const PARAMSET_VALUES: &str = "VALUES";
/// Name of the paramset carrying configuration.
pub const PARAMSET_MASTER: &str = "MASTER";
/// Parameter reporting loss of communication with a device or channel.
pub const PARAM_UNREACH: &str = "UNREACH";
/// Device-level signal strength attribute.
pub const PARAM_RSSI_DEVICE: &str = "RSSI_DEVICE";

/// A paramset: parameter name to last known value.
pub type Paramset = HashMap<String, ParamValue>;

/// A single parameter value, passed through without interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ParamValue {
    /// Loose truth value: `false`, `0`, `0.0` and `""` are false.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !s.is_empty(),
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Short name of the variant, as used in parameter descriptions.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "BOOL",
            Self::Int(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::String(_) => "STRING",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => b.fmt(f),
            Self::Int(i) => i.fmt(f),
            Self::Float(v) => v.fmt(f),
            Self::String(s) => s.fmt(f),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}
