//! Control-side adapter for the sandboxed backend.
//!
//! Every call becomes a [`ControlMessage`] on the SPSC queue; the
//! [`BridgeHost`] applies it at the start of its next render quantum.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use suna_core::{
    BridgeConfig, BridgeError, BridgeEvent, BridgeResult, ControlMessage, InitError,
    ParameterSink, ParameterStore, RuntimeAdapter, RuntimeKind, SampleBuffer, SlotTable,
};

use crate::host::BridgeHost;
use crate::queue::{self, ControlEnd, ControlSender};
use crate::stats::BridgeStats;

const INIT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// [`RuntimeAdapter`] backed by a [`BridgeHost`] on another thread.
pub struct SandboxedRuntime {
    control: ControlEnd,
    sender: ControlSender,
    store: ParameterStore,
    slots: SlotTable,
    /// Slots with a load the render side has not acknowledged yet.
    pending_loads: Vec<bool>,
    sample_rate: f32,
    init_timeout: Duration,
    initialized: bool,
    /// Tag of the latest `Init`. Acknowledgments carrying another tag are stale.
    generation: u64,
    playing: bool,
    stats: Arc<BridgeStats>,
}

impl SandboxedRuntime {
    /// Build the runtime and the host it drives. Move the host to the audio
    /// thread and call [`BridgeHost::process`] from there.
    pub fn new(config: &BridgeConfig) -> BridgeResult<(Self, BridgeHost)> {
        config.validate()?;
        let (control, render) = queue::channel(config.queue_capacity);
        let host = BridgeHost::from_config(config, render)?;
        let sender = control.sender().clone();

        let store = ParameterStore::new(
            config.parameters.iter().cloned(),
            config.clamp_policy_for(RuntimeKind::Sandboxed),
            Arc::new(sender.clone()),
        )?;

        let runtime = Self {
            control,
            sender,
            store,
            slots: SlotTable::new(config.layout.max_slots, config.layout.max_samples_per_slot),
            pending_loads: vec![false; config.layout.max_slots],
            sample_rate: config.sample_rate,
            init_timeout: config.init_timeout,
            initialized: false,
            generation: 0,
            playing: false,
            stats: host.stats(),
        };
        Ok((runtime, host))
    }

    /// Send `init` and wait for the host to acknowledge it.
    ///
    /// The host only reads its queue while rendering, so the audio thread
    /// must already be calling `process`. Fails with
    /// [`InitError::Timeout`] when no answer arrives within the configured
    /// timeout, and with [`InitError::Rejected`] when the host reports a
    /// failure. Either way the runtime stays uninitialized. On timeout a
    /// `Shutdown` follows the `Init`, so a late render start ends up
    /// uninitialized too.
    ///
    /// Slot contents, pending loads and the playing flag start over; cached
    /// parameter values are kept and resent once the host is ready.
    pub fn initialize(&mut self, module: impl Into<Arc<[u8]>>) -> BridgeResult<()> {
        self.initialized = false;
        self.playing = false;
        self.slots.clear_all();
        self.pending_loads.fill(false);
        self.generation += 1;
        let generation = self.generation;
        self.sender.send(ControlMessage::Init {
            module: module.into(),
            sample_rate: self.sample_rate,
            generation,
        })?;

        let deadline = Instant::now() + self.init_timeout;
        loop {
            while let Some(event) = self.control.pop_event() {
                match event {
                    BridgeEvent::Ready { generation: acked } if acked == generation => {
                        self.initialized = true;
                        log::info!("sandboxed runtime ready at {} Hz", self.sample_rate);
                        self.resync_parameters();
                        return Ok(());
                    }
                    BridgeEvent::InitFailed {
                        generation: acked,
                        message,
                    } if acked == generation => {
                        log::error!("DSP module failed to initialize: {message}");
                        return Err(InitError::Rejected(message).into());
                    }
                    other => self.apply_event(other),
                }
            }
            if Instant::now() >= deadline {
                let ms = self.init_timeout.as_millis() as u64;
                log::error!("no ready acknowledgment within {ms} ms");
                if self.sender.send(ControlMessage::Shutdown).is_err() {
                    log::error!("could not queue shutdown after init timeout");
                }
                return Err(InitError::Timeout(ms).into());
            }
            thread::sleep(INIT_POLL_INTERVAL);
        }
    }

    /// Push every cached parameter value to the module.
    fn resync_parameters(&self) {
        for descriptor in self.store.descriptors() {
            if let Some(value) = self.store.scaled(&descriptor.id) {
                self.sender.send(ControlMessage::for_parameter(&descriptor.id, value)).ok();
            }
        }
    }

    /// Process acknowledgments and free recycled messages. Returns the number
    /// of events handled.
    pub fn poll_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.control.pop_event() {
            self.apply_event(event);
            handled += 1;
        }
        self.control.collect_garbage();
        handled
    }

    /// Init acknowledgments only count inside [`initialize`](Self::initialize);
    /// any that reach here belong to an attempt that already gave up.
    fn apply_event(&mut self, event: BridgeEvent) {
        match event {
            BridgeEvent::Ready { generation } => {
                log::debug!("ignoring stale ready (init #{generation})");
            }
            BridgeEvent::InitFailed {
                generation,
                message,
            } => {
                log::debug!("ignoring stale init failure (init #{generation}): {message}");
            }
            BridgeEvent::SampleLoaded { slot, length } => {
                if let Some(pending) = self.pending_loads.get_mut(slot) {
                    *pending = false;
                }
                log::debug!("slot {slot} loaded, {length} samples");
            }
            BridgeEvent::LoadFailed { slot } => {
                if let Some(pending) = self.pending_loads.get_mut(slot) {
                    *pending = false;
                }
                self.slots.clear(slot);
                log::warn!("DSP module rejected the sample for slot {slot}");
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether `slot` has an unacknowledged load.
    pub fn is_load_pending(&self, slot: usize) -> bool {
        self.pending_loads.get(slot).copied().unwrap_or(false)
    }

    /// Render-side counters.
    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    pub fn sender(&self) -> &ControlSender {
        &self.sender
    }
}

impl RuntimeAdapter for SandboxedRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Sandboxed
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
        self.sender.forward(id, scaled);
    }

    fn load_sample(&mut self, slot: usize, sample: SampleBuffer) -> BridgeResult<usize> {
        if let Err(e) = self.slots.check_index(slot) {
            log::warn!("{e}");
            return Err(e);
        }
        self.poll_events();
        if !self.initialized {
            return Err(BridgeError::NotInitialized);
        }
        if self.is_load_pending(slot) {
            return Err(BridgeError::SlotBusy(slot));
        }

        let sample = sample.truncated(self.slots.max_samples_per_slot());
        self.sender.send(ControlMessage::LoadSample {
            slot,
            pcm: sample.shared_pcm(),
            sample_rate: sample.sample_rate(),
        })?;
        let length = sample.len();
        self.slots.load(slot, sample)?;
        self.pending_loads[slot] = true;
        Ok(length)
    }

    fn clear_slot(&mut self, slot: usize) {
        if let Err(e) = self.slots.check_index(slot) {
            log::warn!("{e}");
            return;
        }
        self.slots.clear(slot);
        self.sender.send(ControlMessage::ClearSlot { slot }).ok();
    }

    fn play_all(&mut self) {
        if !self.initialized {
            log::debug!("play ignored, runtime not initialized");
            return;
        }
        self.playing = true;
        self.sender.send(ControlMessage::PlayAll).ok();
    }

    fn stop_all(&mut self) {
        self.playing = false;
        self.sender.send(ControlMessage::StopAll).ok();
    }
}

impl std::fmt::Debug for SandboxedRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxedRuntime")
            .field("initialized", &self.initialized)
            .field("playing", &self.playing)
            .field("loaded_slots", &self.slots.loaded_count())
            .finish()
    }
}
