use std::fmt;

use serde::{Deserialize, Serialize};

use crate::zigbee::Cluster;

/// Platform-facing controls exposed by one dimmer channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    OnOff,
    Dim,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::OnOff => "onoff",
            Capability::Dim => "dim",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapabilityValue {
    Bool(bool),
    Number(f64),
}

impl CapabilityValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CapabilityValue::Bool(value) => Some(*value),
            CapabilityValue::Number(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CapabilityValue::Number(value) => Some(*value),
            CapabilityValue::Bool(_) => None,
        }
    }
}

impl From<bool> for CapabilityValue {
    fn from(value: bool) -> Self {
        CapabilityValue::Bool(value)
    }
}

impl From<f64> for CapabilityValue {
    fn from(value: f64) -> Self {
        CapabilityValue::Number(value)
    }
}

/// When the host should read the bound attribute by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetOpts {
    pub get_on_start: bool,
    /// Mains-powered dimmers announce themselves after a power cut, which is
    /// a good moment to pick up the state they came back with.
    pub get_on_online: bool,
}

/// Binding of a capability to the cluster and endpoint that back it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDefinition {
    pub capability: Capability,
    pub cluster: Cluster,
    pub endpoint: u8,
    pub get_opts: GetOpts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert_eq!(CapabilityValue::from(true).as_bool(), Some(true));
        assert_eq!(CapabilityValue::from(true).as_f64(), None);
        assert_eq!(CapabilityValue::from(0.25).as_f64(), Some(0.25));
        assert_eq!(CapabilityValue::from(0.25).as_bool(), None);
    }

    #[test]
    fn test_value_json() {
        let value: CapabilityValue = serde_json::from_str("0.5").unwrap();
        assert_eq!(value, CapabilityValue::Number(0.5));
        let value: CapabilityValue = serde_json::from_str("false").unwrap();
        assert_eq!(value, CapabilityValue::Bool(false));
        assert_eq!(serde_json::to_string(&Capability::OnOff).unwrap(), "\"onoff\"");
    }
}
