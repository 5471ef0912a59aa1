mod cluster;
mod node;
mod transition;

pub use cluster::{
    AttributeReport, Cluster, MAX_DIM, MoveToLevelWithOnOff, dim_to_level, level_to_dim,
};
pub use node::{ZigbeeError, ZigbeeNode};
pub use transition::calculate_level_control_transition_time;
