//! # suna-core
//!
//! Host-agnostic pieces of the Suna control/data bridge: the arena layout,
//! the slot table, parameter storage, control messages, and the
//! [`RuntimeAdapter`] capability set that both backends implement.
//!
//! ```text
//! UI / gamepad ──► RuntimeAdapter ──┬─► sandboxed: ControlMessage ──► BridgeHost (suna-wasm)
//!                                   └─► embedded:  NativeHost call    (suna-native)
//! ```
//!
//! Nothing here touches the audio thread directly. The render side lives in
//! `suna-wasm`.

pub mod binding;
pub mod config;
pub mod control;
pub mod error;
pub mod instrument;
pub mod ipc;
pub mod layout;
pub mod message;
pub mod parameter;
pub mod runtime;
pub mod sample;
pub mod slot_table;

pub use binding::ParameterBinding;
pub use config::{BridgeConfig, DEFAULT_INIT_TIMEOUT, DEFAULT_QUEUE_CAPACITY};
pub use control::{grain_length_from_axis, ControlMapper, GamepadSnapshot, MapperUpdate, TriggerState};
pub use error::{BridgeError, BridgeResult, InitError};
pub use layout::{
    MemoryLayout, BLOCK_SIZE, BUFFER_START, BYTES_PER_SAMPLE, COMPACT_MAX_SAMPLES_PER_SLOT,
    DEFAULT_MAX_SAMPLES_PER_SLOT, MAX_SLOTS, SAMPLE_DATA_START, WASM_PAGE_SIZE,
};
pub use message::{BridgeEvent, ControlMessage};
pub use parameter::{
    ClampPolicy, DetachedSink, ParameterDescriptor, ParameterHandle, ParameterSink,
    ParameterStore, Subscription, ValueCallback, ValueChange,
};
pub use runtime::{RuntimeAdapter, RuntimeKind, RUNTIME_ENV};
pub use sample::{downmix_to_mono, SampleBuffer};
pub use slot_table::{LoadStamp, SampleSlot, SlotTable};
