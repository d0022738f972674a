//! Parameter descriptions as reported by `getParamsetDescription`.
//!
//! Descriptions are advisory. Nothing in the entity model requires them to
//! be present; they only tell a consumer what a parameter supports.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::value::ParamValue;

pub const OPERATION_READ: u8 = 1;
pub const OPERATION_WRITE: u8 = 2;
pub const OPERATION_EVENT: u8 = 4;

/// Description of every parameter in one paramset.
pub type ParamsetDescription = HashMap<String, ParameterDescription>;

/// Description of a single parameter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct ParameterDescription {
    #[serde(rename = "TYPE")]
    pub kind: String,
    pub operations: u8,
    pub flags: u32,
    pub default: Option<ParamValue>,
    pub min: Option<ParamValue>,
    pub max: Option<ParamValue>,
    pub unit: Option<String>,
    pub tab_order: Option<i32>,
}

impl ParameterDescription {
    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.operations & OPERATION_READ != 0
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.operations & OPERATION_WRITE != 0
    }

    #[must_use]
    pub fn emits_events(&self) -> bool {
        self.operations & OPERATION_EVENT != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_decode_operation_bits() {
        let desc = ParameterDescription {
            operations: OPERATION_READ | OPERATION_EVENT,
            ..ParameterDescription::default()
        };
        assert!(desc.is_readable());
        assert!(!desc.is_writable());
        assert!(desc.emits_events());
    }

    #[test]
    fn should_deserialize_coordinator_keys() {
        let json = r#"{
            "TYPE": "FLOAT",
            "OPERATIONS": 5,
            "FLAGS": 1,
            "MIN": -40.0,
            "MAX": 80.0,
            "UNIT": "°C"
        }"#;
        let desc: ParameterDescription = serde_json::from_str(json).unwrap();
        assert_eq!(desc.kind, "FLOAT");
        assert!(desc.is_readable());
        assert_eq!(desc.min, Some(ParamValue::Float(-40.0)));
        assert_eq!(desc.unit.as_deref(), Some("°C"));
        assert!(desc.default.is_none());
    }
}
