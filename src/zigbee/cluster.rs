use std::fmt;

use serde::{Deserialize, Serialize};

/// Highest value of the LevelControl `currentLevel` attribute.
pub const MAX_DIM: u8 = 254;

/// ZCL clusters the dimmer exposes on each of its output endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cluster {
    OnOff,
    LevelControl,
}

impl Cluster {
    pub fn id(&self) -> u16 {
        match self {
            Cluster::OnOff => 0x0006,
            Cluster::LevelControl => 0x0008,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Cluster::OnOff => "onOff",
            Cluster::LevelControl => "levelControl",
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of the LevelControl `moveToLevelWithOnOff` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveToLevelWithOnOff {
    pub level: u8,
    /// Tenths of a second.
    pub transition_time: u16,
}

/// Attribute value pushed by the device without being asked for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeReport {
    OnOff { endpoint: u8, on: bool },
    CurrentLevel { endpoint: u8, level: u8 },
}

impl AttributeReport {
    pub fn endpoint(&self) -> u8 {
        match self {
            AttributeReport::OnOff { endpoint, .. }
            | AttributeReport::CurrentLevel { endpoint, .. } => *endpoint,
        }
    }
}

/// Converts a `dim` capability value (0..=1) to a native level (0..=254).
pub fn dim_to_level(dim: f64) -> u8 {
    (dim.clamp(0.0, 1.0) * f64::from(MAX_DIM)).round() as u8
}

/// Converts a native level to a `dim` capability value. Levels above 254 are
/// treated as full brightness.
pub fn level_to_dim(level: u8) -> f64 {
    f64::from(level.min(MAX_DIM)) / f64::from(MAX_DIM)
}
