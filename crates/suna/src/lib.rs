//! # Suna
//!
//! Control/data bridge for the Suna granular/delay instrument.
//!
//! The UI and control producers drive one [`RuntimeAdapter`] surface. Behind
//! it the DSP either runs in-process as a sandboxed wasm module or inside a
//! native plugin host.
//!
//! ## Architecture
//!
//! ```text
//! UI widgets / gamepad
//!        ↓
//! ControlContext → Runtime (RuntimeAdapter)
//!        ↓                         ↓
//! SandboxedRuntime ── SPSC ──► BridgeHost (audio thread, wasmtime)
//! EmbeddedAdapter  ── call ──► NativeHost
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use suna::prelude::*;
//!
//! let config = BridgeConfig::new(48_000.0);
//! let Launch { runtime, render } = launch(&config, None)?;
//! // Move `render` to the audio thread and call `process` there, then:
//! let mut context = ControlContext::new(runtime);
//! context.runtime_mut().as_sandboxed_mut().unwrap().initialize(dsp_bytes)?;
//! context.runtime().set_parameter("mix", 40.0);
//! ```

pub mod context;
pub mod runtime;

// Re-export sub-crates
pub use suna_core as core;

#[cfg(feature = "sandboxed")]
pub use suna_wasm as wasm;

#[cfg(feature = "embedded")]
pub use suna_native as native;

pub use context::ControlContext;
pub use runtime::{launch, resolve_kind, Launch, Runtime, DEFAULT_RUNTIME};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use suna_core::{
        // Configuration
        BridgeConfig, MemoryLayout, RuntimeKind,
        // Errors
        BridgeError, BridgeResult, InitError,
        // Runtime surface
        RuntimeAdapter, SampleBuffer, SlotTable,
        // Parameters
        ClampPolicy, ParameterBinding, ParameterDescriptor, ParameterHandle, ParameterStore,
        Subscription, ValueChange,
        // Control producers
        ControlMapper, GamepadSnapshot, TriggerState,
        // Messages
        BridgeEvent, ControlMessage,
    };

    pub use crate::{launch, ControlContext, Launch, Runtime};

    #[cfg(feature = "sandboxed")]
    pub use suna_wasm::{BridgeHost, SandboxedRuntime};

    #[cfg(feature = "embedded")]
    pub use suna_native::{EmbeddedAdapter, NativeHost};
}
