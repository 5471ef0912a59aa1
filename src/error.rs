use thiserror::Error;

use crate::capabilities::RegistryError;
use crate::zigbee::{Cluster, ZigbeeError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    #[error("Missing {cluster} cluster on endpoint {endpoint}")]
    MissingCluster { cluster: Cluster, endpoint: u8 },
    #[error("Device command failed: {0}")]
    Command(#[from] ZigbeeError),
    #[error("Capability registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Invalid dim value: {0}")]
    InvalidDim(f64),
}

pub type Result<T> = std::result::Result<T, DriverError>;
