mod channel;
mod dimmer;

#[cfg(test)]
pub(crate) mod testing;

pub use channel::Channel;
pub use dimmer::{DimmerConfig, EcoDimDevice, MIN_DIM_WHILE_ON, PAIRING_REASON};
