//! [`RuntimeAdapter`] that forwards every call to a [`NativeHost`].

use std::sync::Arc;

use serde_json::Value;
use suna_core::{
    BridgeConfig, BridgeError, BridgeResult, ParameterSink, ParameterStore, RuntimeAdapter,
    RuntimeKind, SampleBuffer, SlotTable,
};

use crate::host::NativeHost;
use crate::payload::encode_pcm;

// ============================================================================
// Parameter sink
// ============================================================================

/// Forwards store writes to the native host.
struct HostSink {
    host: Arc<dyn NativeHost>,
}

impl ParameterSink for HostSink {
    fn forward(&self, id: &str, scaled: f64) {
        if let Err(e) = self.host.set_parameter(id, scaled) {
            log::warn!("native host rejected {id} = {scaled}: {e}");
        }
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// Control surface for a DSP that lives inside a native plugin host.
///
/// Calls are synchronous. Sample PCM is base64-encoded before it crosses the
/// bridge. The parameter store passes values through unclamped by default;
/// the native host owns range policy and reports its value back through
/// [`host_parameter_changed`](Self::host_parameter_changed).
pub struct EmbeddedAdapter {
    host: Arc<dyn NativeHost>,
    sink: HostSink,
    store: ParameterStore,
    slots: SlotTable,
    sample_rate: f32,
    playing: bool,
}

impl EmbeddedAdapter {
    pub fn new(config: &BridgeConfig, host: Arc<dyn NativeHost>) -> BridgeResult<Self> {
        config.validate()?;
        let store = ParameterStore::new(
            config.parameters.iter().cloned(),
            config.clamp_policy_for(RuntimeKind::Embedded),
            Arc::new(HostSink {
                host: Arc::clone(&host),
            }),
        )?;
        log::info!(
            "embedded runtime with {} parameters at {} Hz",
            store.len(),
            config.sample_rate
        );
        Ok(Self {
            sink: HostSink {
                host: Arc::clone(&host),
            },
            host,
            store,
            slots: SlotTable::new(config.layout.max_slots, config.layout.max_samples_per_slot),
            sample_rate: config.sample_rate,
            playing: false,
        })
    }

    pub fn host(&self) -> &Arc<dyn NativeHost> {
        &self.host
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// The native host changed a parameter (automation, preset recall).
    ///
    /// Updates the cache and notifies subscribers without echoing the value
    /// back. Returns `false` for an unknown id.
    pub fn host_parameter_changed(&self, id: &str, scaled: f64) -> bool {
        self.store.update_from_host(id, scaled)
    }

    /// Call a native function, logging failures.
    fn call(&self, function: &str, args: &[Value]) -> Option<Value> {
        match self.host.invoke(function, args) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("native {function} failed: {e}");
                None
            }
        }
    }
}

impl RuntimeAdapter for EmbeddedAdapter {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Embedded
    }

    fn parameters(&self) -> &ParameterStore {
        &self.store
    }

    fn slots(&self) -> &SlotTable {
        &self.slots
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn forward(&self, id: &str, scaled: f64) {
        self.sink.forward(id, scaled);
    }

    fn load_sample(&mut self, slot: usize, sample: SampleBuffer) -> BridgeResult<usize> {
        if let Err(e) = self.slots.check_index(slot) {
            log::warn!("{e}");
            return Err(e);
        }
        let sample = sample.truncated(self.slots.max_samples_per_slot());
        let args = [
            Value::from(slot),
            Value::from(encode_pcm(sample.pcm())),
            Value::from(sample.sample_rate()),
        ];
        self.host.invoke("loadSample", &args).map_err(|e| {
            log::warn!("native loadSample into slot {slot} failed: {e}");
            BridgeError::Host(e)
        })?;

        let length = sample.len();
        self.slots.load(slot, sample)?;
        log::debug!("slot {slot} loaded, {length} samples");
        Ok(length)
    }

    fn clear_slot(&mut self, slot: usize) {
        if let Err(e) = self.slots.check_index(slot) {
            log::warn!("{e}");
            return;
        }
        self.slots.clear(slot);
        self.call("clearSlot", &[Value::from(slot)]);
    }

    fn play_all(&mut self) {
        self.playing = true;
        self.call("playAll", &[]);
    }

    fn stop_all(&mut self) {
        self.playing = false;
        self.call("stopAll", &[]);
    }
}

impl std::fmt::Debug for EmbeddedAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedAdapter")
            .field("sample_rate", &self.sample_rate)
            .field("playing", &self.playing)
            .field("loaded_slots", &self.slots.loaded_count())
            .finish()
    }
}
