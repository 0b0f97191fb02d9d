//! Messages between the control side and the render side.
//!
//! [`ControlMessage`] travels control → render and [`BridgeEvent`] travels
//! back. Both serialize with a `type` tag so the same shapes work over a JSON
//! channel:
//!
//! ```json
//! {"type": "setGrainLength", "length": 1024}
//! {"type": "sampleLoaded", "slot": 0, "length": 480000}
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::instrument;

/// One control-side request. Processed in arrival order, one at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlMessage {
    /// Bring up a DSP module from its binary. `generation` comes back in the
    /// matching `Ready`/`InitFailed`.
    #[serde(rename_all = "camelCase")]
    Init {
        module: Arc<[u8]>,
        sample_rate: f32,
        #[serde(default)]
        generation: u64,
    },
    /// Drop the module instance. Later calls are no-ops until the next `Init`.
    Shutdown,
    /// Mono PCM for one slot. The buffer is shared, never copied in transit.
    #[serde(rename_all = "camelCase")]
    LoadSample {
        slot: usize,
        pcm: Arc<[f32]>,
        sample_rate: f32,
    },
    ClearSlot {
        slot: usize,
    },
    PlayAll,
    StopAll,
    /// Generic parameter write, resolved by name on the render side.
    SetParam {
        name: String,
        value: f32,
    },
    SetBlendX {
        value: f32,
    },
    SetBlendY {
        value: f32,
    },
    SetPlaybackSpeed {
        value: f32,
    },
    SetGrainLength {
        length: u32,
    },
    SetGrainDensity {
        density: f32,
    },
    SetFreeze {
        freeze: bool,
    },
}

impl ControlMessage {
    /// The message for a parameter write. Instrument parameters with a
    /// dedicated variant use it; everything else becomes `SetParam`.
    pub fn for_parameter(id: &str, value: f64) -> Self {
        let v = value as f32;
        match id {
            instrument::BLEND_X => Self::SetBlendX { value: v },
            instrument::BLEND_Y => Self::SetBlendY { value: v },
            instrument::PLAYBACK_SPEED => Self::SetPlaybackSpeed { value: v },
            instrument::GRAIN_LENGTH => Self::SetGrainLength {
                length: value.round().max(0.0) as u32,
            },
            instrument::GRAIN_DENSITY => Self::SetGrainDensity { density: v },
            instrument::FREEZE => Self::SetFreeze {
                freeze: value >= 0.5,
            },
            _ => Self::SetParam {
                name: id.to_string(),
                value: v,
            },
        }
    }

    /// The `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Shutdown => "shutdown",
            Self::LoadSample { .. } => "loadSample",
            Self::ClearSlot { .. } => "clearSlot",
            Self::PlayAll => "playAll",
            Self::StopAll => "stopAll",
            Self::SetParam { .. } => "setParam",
            Self::SetBlendX { .. } => "setBlendX",
            Self::SetBlendY { .. } => "setBlendY",
            Self::SetPlaybackSpeed { .. } => "setPlaybackSpeed",
            Self::SetGrainLength { .. } => "setGrainLength",
            Self::SetGrainDensity { .. } => "setGrainDensity",
            Self::SetFreeze { .. } => "setFreeze",
        }
    }
}

/// Render-side acknowledgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BridgeEvent {
    Ready { generation: u64 },
    InitFailed { generation: u64, message: String },
    SampleLoaded { slot: usize, length: usize },
    /// The module never stored the sample: it trapped, or nothing was
    /// initialized when the load arrived.
    LoadFailed { slot: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let msg = ControlMessage::SetGrainLength { length: 1024 };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "setGrainLength", "length": 1024})
        );

        let parsed: ControlMessage =
            serde_json::from_value(json!({"type": "loadSample", "slot": 2, "pcm": [0.5, -0.5], "sampleRate": 48000.0}))
                .unwrap();
        match parsed {
            ControlMessage::LoadSample { slot, pcm, sample_rate } => {
                assert_eq!(slot, 2);
                assert_eq!(&pcm[..], &[0.5, -0.5]);
                assert_eq!(sample_rate, 48_000.0);
            }
            other => panic!("unexpected {other:?}"),
        }

        let parsed: ControlMessage = serde_json::from_value(json!({"type": "playAll"})).unwrap();
        assert_eq!(parsed, ControlMessage::PlayAll);
        assert_eq!(parsed.kind(), "playAll");
    }

    #[test]
    fn test_for_parameter() {
        assert_eq!(
            ControlMessage::for_parameter(instrument::GRAIN_LENGTH, 1023.6),
            ControlMessage::SetGrainLength { length: 1024 }
        );
        assert_eq!(
            ControlMessage::for_parameter(instrument::FREEZE, 1.0),
            ControlMessage::SetFreeze { freeze: true }
        );
        assert_eq!(
            ControlMessage::for_parameter(instrument::MIX, 40.0),
            ControlMessage::SetParam {
                name: "mix".into(),
                value: 40.0
            }
        );
    }

    #[test]
    fn test_event_shape() {
        let event = BridgeEvent::SampleLoaded { slot: 1, length: 10 };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "sampleLoaded", "slot": 1, "length": 10})
        );
        assert_eq!(
            serde_json::to_value(BridgeEvent::Ready { generation: 3 }).unwrap(),
            json!({"type": "ready", "generation": 3})
        );
    }

    #[test]
    fn test_init_generation_defaults_to_zero() {
        let parsed: ControlMessage =
            serde_json::from_value(json!({"type": "init", "module": [0, 97, 115, 109], "sampleRate": 44100.0}))
                .unwrap();
        match parsed {
            ControlMessage::Init { generation, sample_rate, .. } => {
                assert_eq!(generation, 0);
                assert_eq!(sample_rate, 44_100.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(ControlMessage::Shutdown.kind(), "shutdown");
    }
}
