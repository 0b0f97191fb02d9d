//! Parameter ids and default ranges of the granular/delay instrument.

use crate::parameter::ParameterDescriptor;

pub const BLEND_X: &str = "blendX";
pub const BLEND_Y: &str = "blendY";
pub const PLAYBACK_SPEED: &str = "playbackSpeed";
pub const GRAIN_LENGTH: &str = "grainLength";
pub const GRAIN_DENSITY: &str = "grainDensity";
pub const FREEZE: &str = "freeze";
pub const DELAY_TIME: &str = "delayTime";
pub const FEEDBACK: &str = "feedback";
pub const MIX: &str = "mix";

/// Shortest grain, in samples.
pub const MIN_GRAIN_LENGTH: u32 = 256;

/// Longest grain, in samples.
pub const MAX_GRAIN_LENGTH: u32 = 8192;

/// The instrument's parameter set, in UI order.
pub fn default_parameters() -> Vec<ParameterDescriptor> {
    vec![
        ParameterDescriptor::new(BLEND_X, "Blend X", 0.0, 1.0).with_default(0.5),
        ParameterDescriptor::new(BLEND_Y, "Blend Y", 0.0, 1.0).with_default(0.5),
        ParameterDescriptor::new(PLAYBACK_SPEED, "Speed", 0.25, 4.0)
            .with_label("x")
            .with_interval(0.01)
            .with_skew(0.5)
            .with_default(1.0),
        ParameterDescriptor::new(
            GRAIN_LENGTH,
            "Grain Length",
            MIN_GRAIN_LENGTH as f64,
            MAX_GRAIN_LENGTH as f64,
        )
        .with_label("smp")
        .with_interval(1.0)
        .with_default(2048.0),
        ParameterDescriptor::new(GRAIN_DENSITY, "Density", 0.0, 1.0),
        ParameterDescriptor::toggle(FREEZE, "Freeze"),
        ParameterDescriptor::new(DELAY_TIME, "Delay Time", 1.0, 2000.0)
            .with_label("ms")
            .with_interval(1.0)
            .with_default(250.0),
        ParameterDescriptor::new(FEEDBACK, "Feedback", 0.0, 100.0)
            .with_label("%")
            .with_default(30.0),
        ParameterDescriptor::new(MIX, "Mix", 0.0, 100.0)
            .with_label("%")
            .with_default(50.0),
    ]
}

/// Name of the module export that sets `id` (`grainLength` → `set_grain_length`).
pub fn setter_export_name(id: &str) -> String {
    let mut name = String::with_capacity(id.len() + 8);
    name.push_str("set_");
    for c in id.chars() {
        if c.is_ascii_uppercase() {
            name.push('_');
            name.push(c.to_ascii_lowercase());
        } else {
            name.push(c);
        }
    }
    name
}
