use async_trait::async_trait;
use thiserror::Error;

use super::capability::{Capability, CapabilityDefinition, CapabilityValue};
use super::change::{BatchOpts, PendingChange, Resolution};
use crate::error::DriverError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Capability {0} is not exposed by this device")]
    UnknownCapability(Capability),
    #[error("Invalid value for capability {capability}: {reason}")]
    InvalidValue {
        capability: Capability,
        reason: String,
    },
    #[error("Registry request failed: {0}")]
    Generic(String),
}

/// Host-side store of the values a device shows on the platform.
#[async_trait]
pub trait CapabilityRegistry: Send + Sync {
    fn has_capability(&self, capability: Capability) -> bool;

    fn capability_value(&self, capability: Capability) -> Option<CapabilityValue>;

    async fn set_capability_value(
        &self,
        capability: Capability,
        value: CapabilityValue,
    ) -> Result<(), RegistryError>;

    async fn set_available(&self) -> Result<(), RegistryError>;

    async fn set_unavailable(&self, reason: &str) -> Result<(), RegistryError>;

    /// Binds capabilities to clusters. Edits to any of them are debounced by
    /// the host and delivered together to the device's [`CapabilityListener`].
    fn register_multiple_capabilities(
        &self,
        definitions: &[CapabilityDefinition],
    ) -> Result<(), RegistryError>;
}

/// Receiver of debounced capability batches.
#[async_trait]
pub trait CapabilityListener: Send + Sync {
    async fn on_capabilities_changed(
        &self,
        change: PendingChange,
        opts: BatchOpts,
    ) -> Result<Option<Resolution>, DriverError>;
}
