use std::time::Duration;

// 0xFFFF asks the device to use its own OnOffTransitionTime attribute.
const MAX_TRANSITION_TIME: u16 = 0xFFFE;

/// Converts a requested transition duration to LevelControl transition time
/// (tenths of a second). No duration means an immediate change.
pub fn calculate_level_control_transition_time(duration: Option<Duration>) -> u16 {
    let Some(duration) = duration else {
        return 0;
    };
    let tenths = (duration.as_millis() as f64 / 100.0).round();
    tenths.min(f64::from(MAX_TRANSITION_TIME)) as u16
}
