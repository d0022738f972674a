//! Communication state of a device or channel.

use serde::{Deserialize, Serialize};

use crate::value::ParamValue;

/// Tri-state reachability as last reported by the coordinator.
///
/// Starts out [`Unknown`](Self::Unknown) and only changes when an `UNREACH`
/// event arrives or the `VALUES` paramset is refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reachability {
    #[default]
    Unknown,
    Reachable,
    Unreachable,
}

impl Reachability {
    /// Interpret an `UNREACH` parameter value.
    #[must_use]
    pub fn from_unreach(value: &ParamValue) -> Self {
        if value.is_truthy() {
            Self::Unreachable
        } else {
            Self::Reachable
        }
    }

    /// Only a positive report counts; [`Unknown`](Self::Unknown) is not unreachable.
    #[must_use]
    pub fn is_unreachable(self) -> bool {
        matches!(self, Self::Unreachable)
    }
}

impl std::fmt::Display for Reachability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::Reachable => f.write_str("reachable"),
            Self::Unreachable => f.write_str("unreachable"),
        }
    }
}
