//! One instantiated DSP module and its arena.
//!
//! Export contract:
//!
//! | export | signature | required |
//! |--------|-----------|----------|
//! | `memory` | linear memory | yes |
//! | `init_sampler` | `(f32)` | yes |
//! | `process_block` | `(i32 ×6) -> i32?` | yes |
//! | `load_sample` | `(i32 slot, i32 offset, i32 len)` | yes |
//! | `clear_slot` | `(i32)` | no |
//! | `play_all`, `stop_all` | `()` | no |
//! | `get_slot_length` | `(i32) -> i32` | no |
//! | `set_<name>` | `(f32)` or `(i32)` | no |
//!
//! The only import offered is `spectest.print_char(i32)`.

use std::collections::HashMap;

use suna_core::{InitError, MemoryLayout, WASM_PAGE_SIZE};
use wasmtime::{Caller, Engine, ExternType, Instance, Linker, Memory, Module, Store, TypedFunc};

/// Log target for module console output.
pub const DSP_LOG_TARGET: &str = "suna::dsp";

const CONSOLE_LINE_CAPACITY: usize = 256;

// ============================================================================
// STORE DATA
// ============================================================================

/// Per-instance host state.
pub(crate) struct HostState {
    console: Vec<u8>,
}

impl HostState {
    fn new() -> Self {
        Self {
            console: Vec::with_capacity(CONSOLE_LINE_CAPACITY),
        }
    }

    fn print_char(&mut self, code: i32) {
        if code == i32::from(b'\n') {
            log::info!(target: DSP_LOG_TARGET, "{}", String::from_utf8_lossy(&self.console));
            self.console.clear();
        } else {
            self.console.push(code as u8);
        }
    }
}

// ============================================================================
// EXPORTS
// ============================================================================

type BlockArgs = (i32, i32, i32, i32, i32, i32);

enum ProcessBlock {
    Status(TypedFunc<BlockArgs, i32>),
    Unit(TypedFunc<BlockArgs, ()>),
}

#[derive(Clone)]
enum Setter {
    F32(TypedFunc<f32, ()>),
    I32(TypedFunc<i32, ()>),
}

struct Exports {
    process_block: ProcessBlock,
    load_sample: TypedFunc<(i32, i32, i32), ()>,
    clear_slot: Option<TypedFunc<i32, ()>>,
    play_all: Option<TypedFunc<(), ()>>,
    stop_all: Option<TypedFunc<(), ()>>,
    get_slot_length: Option<TypedFunc<i32, i32>>,
    /// Keyed by export name (`set_mix`) and by parameter id (`mix`).
    setters: HashMap<String, Setter>,
}

impl Exports {
    fn resolve(
        module: &Module,
        instance: &Instance,
        store: &mut Store<HostState>,
    ) -> Result<Self, InitError> {
        let process_block = if let Ok(f) = instance.get_typed_func::<BlockArgs, i32>(&mut *store, "process_block") {
            ProcessBlock::Status(f)
        } else if let Ok(f) = instance.get_typed_func::<BlockArgs, ()>(&mut *store, "process_block") {
            ProcessBlock::Unit(f)
        } else {
            return Err(InitError::MissingExport("process_block"));
        };

        let load_sample = instance
            .get_typed_func(&mut *store, "load_sample")
            .map_err(|_| InitError::MissingExport("load_sample"))?;

        let mut setters = HashMap::new();
        let names = module.exports().filter_map(|export| match export.ty() {
            ExternType::Func(_) if export.name().starts_with("set_") => Some(export.name().to_string()),
            _ => None,
        });
        for name in names.collect::<Vec<_>>() {
            let setter = if let Ok(f) = instance.get_typed_func::<f32, ()>(&mut *store, &name) {
                Setter::F32(f)
            } else if let Ok(f) = instance.get_typed_func::<i32, ()>(&mut *store, &name) {
                Setter::I32(f)
            } else {
                continue;
            };
            setters.insert(parameter_id(&name), setter.clone());
            setters.insert(name, setter);
        }

        Ok(Self {
            process_block,
            load_sample,
            clear_slot: instance.get_typed_func(&mut *store, "clear_slot").ok(),
            play_all: instance.get_typed_func(&mut *store, "play_all").ok(),
            stop_all: instance.get_typed_func(&mut *store, "stop_all").ok(),
            get_slot_length: instance.get_typed_func(&mut *store, "get_slot_length").ok(),
            setters,
        })
    }
}

/// `set_grain_length` → `grainLength`.
fn parameter_id(export: &str) -> String {
    let mut id = String::with_capacity(export.len());
    let mut upper = false;
    for c in export.trim_start_matches("set_").chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            id.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            id.push(c);
        }
    }
    id
}

// ============================================================================
// INSTANCE
// ============================================================================

/// Outcome of a call into the module.
pub(crate) enum Call<T> {
    Done(T),
    /// Export not present.
    Missing,
    /// The module trapped.
    Trapped,
}

pub(crate) struct DspInstance {
    store: Store<HostState>,
    memory: Memory,
    exports: Exports,
    layout: MemoryLayout,
}

impl DspInstance {
    /// Compile, link, size the arena, and call `init_sampler`.
    pub(crate) fn instantiate(
        engine: &Engine,
        bytes: &[u8],
        layout: MemoryLayout,
        sample_rate: f32,
    ) -> Result<Self, InitError> {
        let module = Module::new(engine, bytes).map_err(|e| InitError::Compile(format!("{e:#}")))?;

        let mut linker = Linker::new(engine);
        linker
            .func_wrap(
                "spectest",
                "print_char",
                |mut caller: Caller<'_, HostState>, code: i32| caller.data_mut().print_char(code),
            )
            .map_err(|e| InitError::Instantiate(format!("{e:#}")))?;

        let mut store = Store::new(engine, HostState::new());
        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| InitError::Instantiate(format!("{e:#}")))?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or(InitError::MissingExport("memory"))?;
        let current = memory.data_size(&store) as u64;
        let required = layout.required_bytes();
        if current < required {
            let pages = (required - current).div_ceil(WASM_PAGE_SIZE);
            memory.grow(&mut store, pages).map_err(|e| {
                InitError::Memory(format!("cannot grow arena to {required} bytes: {e:#}"))
            })?;
        }

        let exports = Exports::resolve(&module, &instance, &mut store)?;
        let init = instance
            .get_typed_func::<f32, ()>(&mut store, "init_sampler")
            .map_err(|_| InitError::MissingExport("init_sampler"))?;
        init.call(&mut store, sample_rate)
            .map_err(|e| InitError::InitCall(format!("{e:#}")))?;

        Ok(Self {
            store,
            memory,
            exports,
            layout,
        })
    }

    /// Copy mono PCM into a slot region and announce it. The caller has
    /// already truncated `pcm` and validated `slot`.
    pub(crate) fn load_sample(&mut self, slot: usize, offset: u32, pcm: &[f32]) -> Call<()> {
        let start = offset as usize;
        let end = start + pcm.len() * self.layout.bytes_per_sample;
        let Some(region) = self.memory.data_mut(&mut self.store).get_mut(start..end) else {
            return Call::Trapped;
        };
        for (bytes, sample) in region.chunks_exact_mut(4).zip(pcm) {
            bytes.copy_from_slice(&sample.to_le_bytes());
        }
        match self
            .exports
            .load_sample
            .call(&mut self.store, (slot as i32, offset as i32, pcm.len() as i32))
        {
            Ok(()) => Call::Done(()),
            Err(_) => Call::Trapped,
        }
    }

    pub(crate) fn clear_slot(&mut self, slot: usize) -> Call<()> {
        match &self.exports.clear_slot {
            Some(f) => unit(f.call(&mut self.store, slot as i32)),
            None => Call::Missing,
        }
    }

    pub(crate) fn play_all(&mut self) -> Call<()> {
        match &self.exports.play_all {
            Some(f) => unit(f.call(&mut self.store, ())),
            None => Call::Missing,
        }
    }

    pub(crate) fn stop_all(&mut self) -> Call<()> {
        match &self.exports.stop_all {
            Some(f) => unit(f.call(&mut self.store, ())),
            None => Call::Missing,
        }
    }

    pub(crate) fn slot_length(&mut self, slot: usize) -> Call<usize> {
        match &self.exports.get_slot_length {
            Some(f) => match f.call(&mut self.store, slot as i32) {
                Ok(len) => Call::Done(len.max(0) as usize),
                Err(_) => Call::Trapped,
            },
            None => Call::Missing,
        }
    }

    /// Call a setter by parameter id or export name. Integer setters get the
    /// value rounded.
    pub(crate) fn set(&mut self, key: &str, value: f32) -> Call<()> {
        match self.exports.setters.get(key) {
            Some(Setter::F32(f)) => unit(f.call(&mut self.store, value)),
            Some(Setter::I32(f)) => unit(f.call(&mut self.store, value.round() as i32)),
            None => Call::Missing,
        }
    }

    /// Render `frames` frames (at most one block). Inputs shorter than the
    /// frame count read as silence.
    pub(crate) fn render(
        &mut self,
        frames: usize,
        left_in: &[f32],
        right_in: &[f32],
        left_out: &mut [f32],
        right_out: &mut [f32],
    ) -> Call<()> {
        let layout = self.layout;
        let data = self.memory.data_mut(&mut self.store);
        write_block(data, layout.input_left, left_in, frames);
        write_block(data, layout.input_right, right_in, frames);

        let args = (
            0,
            layout.input_left as i32,
            layout.input_right as i32,
            layout.output_left as i32,
            layout.output_right as i32,
            frames as i32,
        );
        let result = match &self.exports.process_block {
            ProcessBlock::Status(f) => f.call(&mut self.store, args).map(|_| ()),
            ProcessBlock::Unit(f) => f.call(&mut self.store, args),
        };
        if result.is_err() {
            return Call::Trapped;
        }

        let data = self.memory.data(&self.store);
        read_block(data, layout.output_left, left_out, frames);
        read_block(data, layout.output_right, right_out, frames);
        Call::Done(())
    }
}

fn unit(result: wasmtime::Result<()>) -> Call<()> {
    match result {
        Ok(()) => Call::Done(()),
        Err(_) => Call::Trapped,
    }
}

#[inline]
fn write_block(data: &mut [u8], offset: u32, samples: &[f32], frames: usize) {
    let start = offset as usize;
    let Some(region) = data.get_mut(start..start + frames * 4) else {
        return;
    };
    for (i, bytes) in region.chunks_exact_mut(4).enumerate() {
        let sample = samples.get(i).copied().unwrap_or(0.0);
        bytes.copy_from_slice(&sample.to_le_bytes());
    }
}

#[inline]
fn read_block(data: &[u8], offset: u32, out: &mut [f32], frames: usize) {
    let start = offset as usize;
    let Some(region) = data.get(start..start + frames * 4) else {
        out[..frames].fill(0.0);
        return;
    };
    for (sample, bytes) in out[..frames].iter_mut().zip(region.chunks_exact(4)) {
        *sample = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }
}
