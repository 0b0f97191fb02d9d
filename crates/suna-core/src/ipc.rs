//! JSON entry points for a UI channel.
//!
//! [`dispatch_json`] takes the same `{ "type": ... }` shapes as
//! [`ControlMessage`] and routes them through a [`RuntimeAdapter`].
//! [`invoke`] answers request/response queries.

use serde_json::{json, Value};

use crate::error::{BridgeError, BridgeResult};
use crate::message::ControlMessage;
use crate::runtime::RuntimeAdapter;
use crate::sample::SampleBuffer;

/// Parse one JSON control message and apply it.
pub fn dispatch_json(runtime: &mut dyn RuntimeAdapter, json: &str) -> BridgeResult<()> {
    let message: ControlMessage = serde_json::from_str(json).map_err(|e| {
        log::warn!("invalid control message: {e}");
        BridgeError::Config(format!("invalid control message: {e}"))
    })?;
    apply(runtime, message)
}

/// Route a parsed message through the adapter.
pub fn apply(runtime: &mut dyn RuntimeAdapter, message: ControlMessage) -> BridgeResult<()> {
    match message {
        ControlMessage::Init { .. } | ControlMessage::Shutdown => {
            return Err(BridgeError::Config(format!(
                "{} is issued by the runtime owner, not the control channel",
                message.kind()
            )))
        }
        ControlMessage::LoadSample {
            slot,
            pcm,
            sample_rate,
        } => {
            let sample = SampleBuffer::from_shared(format!("slot {slot}"), pcm, sample_rate)?;
            runtime.load_sample(slot, sample)?;
        }
        ControlMessage::ClearSlot { slot } => runtime.clear_slot(slot),
        ControlMessage::PlayAll => runtime.play_all(),
        ControlMessage::StopAll => runtime.stop_all(),
        ControlMessage::SetParam { name, value } => {
            if runtime.parameters().contains(&name) {
                runtime.set_parameter(&name, value as f64);
            } else {
                runtime.forward(&name, value as f64);
            }
        }
        ControlMessage::SetBlendX { value } => runtime.set_blend_x(value),
        ControlMessage::SetBlendY { value } => runtime.set_blend_y(value),
        ControlMessage::SetPlaybackSpeed { value } => runtime.set_playback_speed(value),
        ControlMessage::SetGrainLength { length } => runtime.set_grain_length(length),
        ControlMessage::SetGrainDensity { density } => runtime.set_grain_density(density),
        ControlMessage::SetFreeze { freeze } => runtime.set_freeze(freeze),
    }
    Ok(())
}

/// Answer a query from the UI. `Err` carries a message for the caller.
pub fn invoke(runtime: &dyn RuntimeAdapter, method: &str, args: &[Value]) -> Result<Value, String> {
    match method {
        "parameters" => Ok(runtime.parameters().to_init_json()),
        "slots" => {
            let slots: Vec<Value> = runtime
                .slots()
                .iter()
                .map(|s| {
                    json!({
                        "slot": s.index,
                        "name": s.name(),
                        "length": s.len(),
                        "sampleRate": s.sample_rate(),
                        "duration": s.duration(),
                    })
                })
                .collect();
            Ok(Value::Array(slots))
        }
        "nextSlot" => Ok(json!(runtime.slots().allocate())),
        "isPlaying" => Ok(json!(runtime.is_playing())),
        "runtime" => Ok(json!(runtime.kind())),
        "getParameter" => {
            let id = args
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| "getParameter expects a parameter id".to_string())?;
            let handle = runtime
                .get_parameter(id)
                .ok_or_else(|| format!("unknown parameter '{id}'"))?;
            Ok(json!({
                "id": id,
                "value": handle.get_scaled_value(),
                "normalised": handle.get_normalised_value(),
            }))
        }
        other => Err(format!("unknown method '{other}'")),
    }
}
