pub mod capabilities;
pub mod device;
pub mod error;
pub mod host;
pub mod logging;
pub mod settings;
pub mod zigbee;
