//! HandBrake preset selection.

/// HandBrake preset for a resolution label, e.g. `"Apple 1080p60 Surround"`
pub fn preset_name(label: &str) -> String {
    format!("Apple {} Surround", label)
}
