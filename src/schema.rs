/// The numeric channels reported by the sensor cluster, in persisted column
/// order. Fixed at build time.
pub const CHANNELS: [&str; 15] = [
    "co2",
    "temperature",
    "humidity",
    "eco2",
    "tvoc",
    "pm_2_5",
    "pm_10_0",
    "pm_0_5",
    "pm_1_0",
    "pm_4_0",
    "pm_1_0_nc",
    "pm_2_5_nc",
    "pm_4_0_nc",
    "pm_10_0_nc",
    "typical_particle_size",
];

/// Every persisted field: each channel followed by its unit-label field.
pub const FIELDS: [&str; 30] = [
    "co2",
    "co2_unit",
    "temperature",
    "temperature_unit",
    "humidity",
    "humidity_unit",
    "eco2",
    "eco2_unit",
    "tvoc",
    "tvoc_unit",
    "pm_2_5",
    "pm_2_5_unit",
    "pm_10_0",
    "pm_10_0_unit",
    "pm_0_5",
    "pm_0_5_unit",
    "pm_1_0",
    "pm_1_0_unit",
    "pm_4_0",
    "pm_4_0_unit",
    "pm_1_0_nc",
    "pm_1_0_nc_unit",
    "pm_2_5_nc",
    "pm_2_5_nc_unit",
    "pm_4_0_nc",
    "pm_4_0_nc_unit",
    "pm_10_0_nc",
    "pm_10_0_nc_unit",
    "typical_particle_size",
    "typical_particle_size_unit",
];

pub fn is_channel(name: &str) -> bool {
    CHANNELS.contains(&name)
}

/// Whether a field holds a numeric measurement (as opposed to a unit label).
pub fn is_numeric_field(field: &str) -> bool {
    !field.ends_with("_unit")
}

pub fn unit_field(channel: &str) -> String {
    format!("{channel}_unit")
}
