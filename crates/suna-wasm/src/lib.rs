//! # suna-wasm
//!
//! Sandboxed backend for the Suna bridge.
//!
//! ```text
//! control thread                          audio thread
//! SandboxedRuntime ── ControlMessage ──►  BridgeHost::process()
//!        ▲                                   │ drain queue, then per 128 frames:
//!        └──────── BridgeEvent ───────────── │ copy in → process_block → copy out
//! ```
//!
//! The DSP module runs under wasmtime with its own store and arena, so any
//! number of hosts can coexist in one process.

pub mod host;
mod module;
pub mod queue;
pub mod runtime;
pub mod stats;

pub use host::BridgeHost;
pub use module::DSP_LOG_TARGET;
pub use queue::{ControlEnd, ControlSender, RenderEnd};
pub use runtime::SandboxedRuntime;
pub use stats::{BridgeStats, StatsSnapshot};
