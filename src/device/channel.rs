use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output of the dual-gang dimmer a device instance drives.
///
/// The primary device is the left gang and sits on endpoint 2; the sub device
/// created at pairing is the right gang on endpoint 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Left,
    Right,
}

impl Channel {
    pub fn from_sub_device(is_sub_device: bool) -> Self {
        if is_sub_device {
            Channel::Right
        } else {
            Channel::Left
        }
    }

    pub fn is_sub_device(&self) -> bool {
        *self == Channel::Right
    }

    pub fn endpoint(&self) -> u8 {
        match self {
            Channel::Left => 2,
            Channel::Right => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Channel::Left => "Left",
            Channel::Right => "Right",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "left" | "l" | "primary" => Ok(Channel::Left),
            "right" | "r" | "secondary" => Ok(Channel::Right),
            _ => Err(format!(
                "Invalid channel '{}'. Valid options: left, right",
                s
            )),
        }
    }
}
