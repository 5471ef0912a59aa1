mod capability;
mod change;
mod registry;

pub use capability::{Capability, CapabilityDefinition, CapabilityValue, GetOpts};
pub use change::{BatchOpts, ChangeOpts, PendingChange, Resolution};
pub use registry::{CapabilityListener, CapabilityRegistry, RegistryError};
