//! The capability set both backends implement.
//!
//! UI widgets and control producers hold a `&dyn RuntimeAdapter` (or the
//! facade's `Runtime`) and never learn which backend is behind it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};
use crate::instrument;
use crate::parameter::{ParameterHandle, ParameterStore};
use crate::sample::SampleBuffer;
use crate::slot_table::SlotTable;

/// Environment variable that selects the backend at startup.
pub const RUNTIME_ENV: &str = "SUNA_RUNTIME";

/// Which backend drives the DSP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuntimeKind {
    /// Module hosted in-process in a wasm sandbox; control travels as messages.
    Sandboxed,
    /// A native plugin host owns the DSP; control is forwarded by function call.
    Embedded,
}

impl RuntimeKind {
    /// Read [`RUNTIME_ENV`]. `None` when unset or empty.
    pub fn from_env() -> BridgeResult<Option<Self>> {
        match std::env::var(RUNTIME_ENV) {
            Ok(value) if !value.trim().is_empty() => value.parse().map(Some),
            _ => Ok(None),
        }
    }

    /// [`from_env`](Self::from_env), falling back to `default`.
    pub fn resolve(default: Self) -> BridgeResult<Self> {
        Ok(Self::from_env()?.unwrap_or(default))
    }
}

impl FromStr for RuntimeKind {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "web" | "wasm" | "sandboxed" => Ok(Self::Sandboxed),
            "native" | "embedded" | "juce" => Ok(Self::Embedded),
            other => Err(BridgeError::Config(format!("unknown runtime '{other}'"))),
        }
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sandboxed => "sandboxed",
            Self::Embedded => "embedded",
        })
    }
}

/// Uniform control surface over the two backends.
///
/// Instrument setters write through the parameter store when the instrument
/// declares that parameter, so bound widgets follow controller input. When
/// the parameter is not declared the write goes straight to the backend.
pub trait RuntimeAdapter {
    /// Backend behind this adapter.
    fn kind(&self) -> RuntimeKind;

    /// Cached parameter values.
    fn parameters(&self) -> &ParameterStore;

    /// Loaded slots as seen from the control side.
    fn slots(&self) -> &SlotTable;

    /// Whether `play_all` was called more recently than `stop_all`.
    fn is_playing(&self) -> bool;

    /// Deliver a parameter write to the backend without touching the cache.
    fn forward(&self, id: &str, scaled: f64);

    /// Load mono PCM into `slot`. Returns the stored length after truncation.
    fn load_sample(&mut self, slot: usize, sample: SampleBuffer) -> BridgeResult<usize>;

    fn clear_slot(&mut self, slot: usize);

    fn play_all(&mut self);

    fn stop_all(&mut self);

    fn get_parameter(&self, id: &str) -> Option<ParameterHandle<'_>> {
        self.parameters().get(id)
    }

    /// Write a scaled value. Returns `false` for an unknown id.
    fn set_parameter(&self, id: &str, scaled: f64) -> bool {
        self.parameters().set_scaled(id, scaled)
    }

    fn set_blend_x(&self, value: f32) {
        write_through(self, instrument::BLEND_X, value as f64);
    }

    fn set_blend_y(&self, value: f32) {
        write_through(self, instrument::BLEND_Y, value as f64);
    }

    fn set_playback_speed(&self, speed: f32) {
        write_through(self, instrument::PLAYBACK_SPEED, speed as f64);
    }

    fn set_grain_length(&self, length: u32) {
        write_through(self, instrument::GRAIN_LENGTH, length as f64);
    }

    fn set_grain_density(&self, density: f32) {
        write_through(self, instrument::GRAIN_DENSITY, density as f64);
    }

    fn set_freeze(&self, freeze: bool) {
        write_through(self, instrument::FREEZE, if freeze { 1.0 } else { 0.0 });
    }

    /// Allocate a slot and load into it. Returns the slot index.
    fn load_next(&mut self, sample: SampleBuffer) -> BridgeResult<usize> {
        let slot = self.slots().allocate();
        self.load_sample(slot, sample)?;
        Ok(slot)
    }
}

fn write_through<R: RuntimeAdapter + ?Sized>(runtime: &R, id: &str, value: f64) {
    if !runtime.parameters().contains(id) {
        runtime.forward(id, value);
        return;
    }
    runtime.parameters().set_scaled(id, value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("web".parse::<RuntimeKind>().unwrap(), RuntimeKind::Sandboxed);
        assert_eq!(" JUCE ".parse::<RuntimeKind>().unwrap(), RuntimeKind::Embedded);
        assert_eq!("native".parse::<RuntimeKind>().unwrap(), RuntimeKind::Embedded);
        assert!("vst".parse::<RuntimeKind>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for kind in [RuntimeKind::Sandboxed, RuntimeKind::Embedded] {
            assert_eq!(kind.to_string().parse::<RuntimeKind>().unwrap(), kind);
        }
    }
}
