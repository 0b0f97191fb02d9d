//! Error types for the bridge.
//!
//! Initialization failures are the only errors that carry a recovery story:
//! the engine stays uninitialized until the caller initializes again. Every
//! other variant describes a single rejected call and leaves state untouched.

use thiserror::Error;

/// Why a DSP module failed to come up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    #[error("module compilation failed: {0}")]
    Compile(String),

    #[error("module instantiation failed: {0}")]
    Instantiate(String),

    #[error("module is missing required export `{0}`")]
    MissingExport(&'static str),

    #[error("module init call failed: {0}")]
    InitCall(String),

    #[error("arena setup failed: {0}")]
    Memory(String),

    #[error("no ready acknowledgment within {0} ms")]
    Timeout(u64),

    #[error("bridge host rejected init: {0}")]
    Rejected(String),
}

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("initialization failed: {0}")]
    Init(#[from] InitError),

    #[error("slot {slot} out of range (0..{max_slots})")]
    SlotOutOfRange { slot: usize, max_slots: usize },

    #[error("slot {0} still has an unacknowledged load")]
    SlotBusy(usize),

    #[error("cannot decode sample: {0}")]
    Decode(String),

    #[error("runtime not initialized")]
    NotInitialized,

    #[error("control queue full")]
    QueueFull,

    #[error("native host error: {0}")]
    Host(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid memory layout: {0}")]
    Layout(String),
}

/// Result type alias
pub type BridgeResult<T> = Result<T, BridgeError>;
