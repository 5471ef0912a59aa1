//! In-memory stand-ins for the platform around the driver: a capability
//! registry, the debouncer that batches user edits and a simulated node.

mod debouncer;
mod memory_registry;
mod simulated_node;

pub use debouncer::{BatchOutcome, CapabilityDebouncer, DebouncerError};
pub use memory_registry::{CapabilitySnapshot, MemoryRegistry};
pub use simulated_node::{
    NodeOperation, SimulatedNode, SimulatedNodeOptions, SimulatedNodeOptionsBuilder,
};
