//! The render-side owner of the DSP module.
//!
//! A [`BridgeHost`] lives on the audio thread. Once per call to
//! [`process`](BridgeHost::process) it drains pending control messages, then
//! renders the host buffer in 128-frame quanta through the module's
//! `process_block` export.
//!
//! Steady-state rendering neither locks nor allocates. Init is the exception:
//! compiling a module allocates, so `init` messages should arrive before the
//! stream starts.

use std::sync::Arc;

use suna_core::{
    BridgeConfig, BridgeError, BridgeEvent, BridgeResult, ControlMessage, InitError, MemoryLayout,
    BLOCK_SIZE,
};
use wasmtime::{Config, Engine};

use crate::module::{Call, DspInstance};
use crate::queue::RenderEnd;
use crate::stats::{BridgeStats, StatsSnapshot};

/// Owns the wasm engine, the module instance, and its arena.
pub struct BridgeHost {
    engine: Engine,
    layout: MemoryLayout,
    sample_rate: f32,
    dsp: Option<DspInstance>,
    render: Option<RenderEnd>,
    stats: Arc<BridgeStats>,
    scratch_left: [f32; BLOCK_SIZE],
    scratch_right: [f32; BLOCK_SIZE],
}

impl BridgeHost {
    /// Create an uninitialized host driven by direct calls.
    pub fn new(layout: MemoryLayout, sample_rate: f32) -> BridgeResult<Self> {
        layout.validate()?;
        if layout.block_size != BLOCK_SIZE {
            return Err(BridgeError::Layout(format!(
                "block size {} unsupported, expected {BLOCK_SIZE}",
                layout.block_size
            )));
        }
        let engine = Engine::new(&Config::new())
            .map_err(|e| BridgeError::Config(format!("wasm engine: {e:#}")))?;
        Ok(Self {
            engine,
            layout,
            sample_rate,
            dsp: None,
            render: None,
            stats: Arc::new(BridgeStats::default()),
            scratch_left: [0.0; BLOCK_SIZE],
            scratch_right: [0.0; BLOCK_SIZE],
        })
    }

    /// Create a host fed by the render end of a control queue.
    pub fn from_config(config: &BridgeConfig, render: RenderEnd) -> BridgeResult<Self> {
        let mut host = Self::new(config.layout, config.sample_rate)?;
        host.render = Some(render);
        Ok(host)
    }

    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn is_initialized(&self) -> bool {
        self.dsp.is_some()
    }

    /// Shared counters.
    pub fn stats(&self) -> Arc<BridgeStats> {
        Arc::clone(&self.stats)
    }

    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Compile and instantiate `module`, size the arena, and call
    /// `init_sampler` with the host sample rate.
    ///
    /// Any previous instance is dropped first. On failure the host is left
    /// uninitialized.
    pub fn initialize(&mut self, module: &[u8]) -> Result<(), InitError> {
        self.dsp = None;
        let dsp = DspInstance::instantiate(&self.engine, module, self.layout, self.sample_rate)?;
        self.dsp = Some(dsp);
        Ok(())
    }

    /// Drop the module instance. Control calls become no-ops again.
    pub fn shutdown(&mut self) {
        self.dsp = None;
    }

    // ========================================================================
    // Control
    // ========================================================================

    /// Copy `pcm` into `slot`'s region, truncating to the slot capacity, and
    /// call the module's `load_sample`. Returns the stored length.
    pub fn load_sample(&mut self, slot: usize, pcm: &[f32]) -> BridgeResult<usize> {
        let offset = self.layout.slot_offset(slot).ok_or(BridgeError::SlotOutOfRange {
            slot,
            max_slots: self.layout.max_slots,
        })?;
        let Some(dsp) = self.dsp.as_mut() else {
            return Err(BridgeError::NotInitialized);
        };
        let len = pcm.len().min(self.layout.max_samples_per_slot);
        match dsp.load_sample(slot, offset, &pcm[..len]) {
            Call::Done(()) => Ok(len),
            Call::Missing => Err(BridgeError::Host("load_sample export missing".into())),
            Call::Trapped => {
                self.stats.trap();
                Err(BridgeError::Host(format!("module trapped loading slot {slot}")))
            }
        }
    }

    pub fn clear_slot(&mut self, slot: usize) {
        if slot >= self.layout.max_slots {
            self.stats.ignored();
            return;
        }
        self.call(|dsp| dsp.clear_slot(slot));
    }

    pub fn play_all(&mut self) {
        self.call(DspInstance::play_all);
    }

    pub fn stop_all(&mut self) {
        self.call(DspInstance::stop_all);
    }

    /// Call `set_<name>` for a parameter id or export name.
    pub fn set_param(&mut self, name: &str, value: f32) {
        self.call(|dsp| dsp.set(name, value));
    }

    pub fn set_blend_x(&mut self, value: f32) {
        self.set_param("set_blend_x", value);
    }

    pub fn set_blend_y(&mut self, value: f32) {
        self.set_param("set_blend_y", value);
    }

    pub fn set_playback_speed(&mut self, value: f32) {
        self.set_param("set_playback_speed", value);
    }

    pub fn set_grain_length(&mut self, length: u32) {
        self.set_param("set_grain_length", length as f32);
    }

    pub fn set_grain_density(&mut self, density: f32) {
        self.set_param("set_grain_density", density);
    }

    pub fn set_freeze(&mut self, freeze: bool) {
        self.set_param("set_freeze", if freeze { 1.0 } else { 0.0 });
    }

    /// Length the module reports for `slot`. `None` when uninitialized or the
    /// module has no `get_slot_length`.
    pub fn slot_length(&mut self, slot: usize) -> Option<usize> {
        if slot >= self.layout.max_slots {
            return None;
        }
        match self.dsp.as_mut()?.slot_length(slot) {
            Call::Done(len) => Some(len),
            Call::Missing => None,
            Call::Trapped => {
                self.stats.trap();
                None
            }
        }
    }

    fn call(&mut self, f: impl FnOnce(&mut DspInstance) -> Call<()>) {
        let Some(dsp) = self.dsp.as_mut() else {
            self.stats.ignored();
            return;
        };
        match f(dsp) {
            Call::Done(()) => {}
            Call::Missing => self.stats.ignored(),
            Call::Trapped => self.stats.trap(),
        }
    }

    // ========================================================================
    // Messages
    // ========================================================================

    /// Apply one control message.
    pub fn handle(&mut self, message: &ControlMessage) {
        self.stats.message();
        match message {
            ControlMessage::Init {
                module,
                sample_rate,
                generation,
            } => {
                self.sample_rate = *sample_rate;
                let event = match self.initialize(module) {
                    Ok(()) => BridgeEvent::Ready {
                        generation: *generation,
                    },
                    Err(e) => BridgeEvent::InitFailed {
                        generation: *generation,
                        message: e.to_string(),
                    },
                };
                self.emit(event);
            }
            ControlMessage::Shutdown => self.shutdown(),
            ControlMessage::LoadSample { slot, pcm, .. } => {
                let event = match self.load_sample(*slot, pcm) {
                    Ok(length) => BridgeEvent::SampleLoaded {
                        slot: *slot,
                        length,
                    },
                    Err(_) => BridgeEvent::LoadFailed { slot: *slot },
                };
                self.emit(event);
            }
            ControlMessage::ClearSlot { slot } => self.clear_slot(*slot),
            ControlMessage::PlayAll => self.play_all(),
            ControlMessage::StopAll => self.stop_all(),
            ControlMessage::SetParam { name, value } => self.set_param(name, *value),
            ControlMessage::SetBlendX { value } => self.set_blend_x(*value),
            ControlMessage::SetBlendY { value } => self.set_blend_y(*value),
            ControlMessage::SetPlaybackSpeed { value } => self.set_playback_speed(*value),
            ControlMessage::SetGrainLength { length } => self.set_grain_length(*length),
            ControlMessage::SetGrainDensity { density } => self.set_grain_density(*density),
            ControlMessage::SetFreeze { freeze } => self.set_freeze(*freeze),
        }
    }

    /// Apply every queued message in arrival order. Returns how many.
    pub fn drain_messages(&mut self) -> usize {
        let mut applied = 0;
        while let Some(message) = self.render.as_mut().and_then(RenderEnd::pop) {
            self.handle(&message);
            applied += 1;
            if let Some(render) = self.render.as_mut() {
                if !render.recycle(message) {
                    self.stats.dropped_recycle();
                }
            }
        }
        applied
    }

    fn emit(&mut self, event: BridgeEvent) {
        if let Some(render) = self.render.as_mut() {
            if !render.emit(event) {
                self.stats.dropped_event();
            }
        }
    }

    // ========================================================================
    // Audio
    // ========================================================================

    /// Render one host buffer.
    ///
    /// The shortest of the first two output channels sets the frame count;
    /// samples past it are silenced. A missing input channel reads as
    /// silence and a single input channel feeds both sides. With one output
    /// channel it receives the average of left and right; channels past the
    /// second are silenced. Output is silence until the module is
    /// initialized, and for any quantum in which the module traps.
    pub fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        self.drain_messages();

        let Some(frames) = outputs.iter().take(2).map(|o| o.len()).min() else {
            return;
        };
        for out in outputs.iter_mut().skip(2) {
            out.fill(0.0);
        }
        for out in outputs.iter_mut().take(2) {
            out[frames..].fill(0.0);
        }
        let Some(dsp) = self.dsp.as_mut() else {
            for out in outputs.iter_mut() {
                out.fill(0.0);
            }
            return;
        };

        let left_in: &[f32] = inputs.first().copied().unwrap_or(&[]);
        let right_in: &[f32] = inputs.get(1).copied().unwrap_or(left_in);

        let mut start = 0;
        while start < frames {
            let n = (frames - start).min(BLOCK_SIZE);
            let l_in = window(left_in, start, n);
            let r_in = window(right_in, start, n);

            let (left, right) = (&mut self.scratch_left[..n], &mut self.scratch_right[..n]);
            let ok = match dsp.render(n, l_in, r_in, left, right) {
                Call::Done(()) => true,
                _ => {
                    self.stats.trap();
                    false
                }
            };
            self.stats.block();

            match &mut *outputs {
                [mono] => {
                    let out = &mut mono[start..start + n];
                    if ok {
                        for ((o, l), r) in out.iter_mut().zip(left.iter()).zip(right.iter()) {
                            *o = 0.5 * (l + r);
                        }
                    } else {
                        out.fill(0.0);
                    }
                }
                [out_l, out_r, ..] => {
                    let (out_l, out_r) = (&mut out_l[start..start + n], &mut out_r[start..start + n]);
                    if ok {
                        out_l.copy_from_slice(left);
                        out_r.copy_from_slice(right);
                    } else {
                        out_l.fill(0.0);
                        out_r.fill(0.0);
                    }
                }
                [] => {}
            }
            start += n;
        }
    }
}

/// `samples[start..start + n]`, clipped to what exists.
#[inline]
fn window(samples: &[f32], start: usize, n: usize) -> &[f32] {
    let end = (start + n).min(samples.len());
    samples.get(start..end).unwrap_or(&[])
}

impl std::fmt::Debug for BridgeHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeHost")
            .field("layout", &self.layout)
            .field("sample_rate", &self.sample_rate)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
