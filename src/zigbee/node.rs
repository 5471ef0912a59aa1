use async_trait::async_trait;
use thiserror::Error;

use super::cluster::{Cluster, MoveToLevelWithOnOff};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZigbeeError {
    #[error("Request to endpoint {0} timed out")]
    Timeout(u8),
    #[error("Device rejected the command: {0}")]
    Rejected(String),
    #[error("Endpoint {0} not found on node")]
    UnknownEndpoint(u8),
    #[error("Transport failure: {0}")]
    Transport(String),
}

/// Native command channel to a paired Zigbee node.
///
/// Every call addresses a single endpoint. Delivery, retries and request
/// timeouts belong to the implementation; callers only see the outcome.
#[async_trait]
pub trait ZigbeeNode: Send + Sync {
    fn has_cluster(&self, endpoint: u8, cluster: Cluster) -> bool;

    async fn set_on(&self, endpoint: u8) -> Result<(), ZigbeeError>;

    async fn set_off(&self, endpoint: u8) -> Result<(), ZigbeeError>;

    async fn move_to_level_with_on_off(
        &self,
        endpoint: u8,
        command: MoveToLevelWithOnOff,
    ) -> Result<(), ZigbeeError>;

    async fn read_on_off(&self, endpoint: u8) -> Result<bool, ZigbeeError>;

    async fn read_current_level(&self, endpoint: u8) -> Result<u8, ZigbeeError>;
}
