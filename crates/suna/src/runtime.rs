//! Backend selection.
//!
//! [`launch`] picks the backend once at startup. Callers then hold a
//! [`Runtime`] and talk to it through [`RuntimeAdapter`] only.

#[cfg(feature = "embedded")]
use std::sync::Arc;

use suna_core::{
    BridgeConfig, BridgeResult, ParameterStore, RuntimeAdapter, RuntimeKind, SampleBuffer,
    SlotTable,
};
#[cfg(feature = "embedded")]
use suna_native::{EmbeddedAdapter, NativeHost};
#[cfg(feature = "sandboxed")]
use suna_wasm::{BridgeHost, SandboxedRuntime};

#[cfg(not(any(feature = "sandboxed", feature = "embedded")))]
compile_error!("enable at least one of the `sandboxed` or `embedded` features");

/// Backend used when neither the config nor the environment names one.
#[cfg(feature = "sandboxed")]
pub const DEFAULT_RUNTIME: RuntimeKind = RuntimeKind::Sandboxed;
#[cfg(not(feature = "sandboxed"))]
pub const DEFAULT_RUNTIME: RuntimeKind = RuntimeKind::Embedded;

/// One of the two backends.
#[derive(Debug)]
pub enum Runtime {
    #[cfg(feature = "sandboxed")]
    Sandboxed(SandboxedRuntime),
    #[cfg(feature = "embedded")]
    Embedded(EmbeddedAdapter),
}

macro_rules! dispatch {
    ($self:expr, $r:ident => $body:expr) => {
        match $self {
            #[cfg(feature = "sandboxed")]
            Runtime::Sandboxed($r) => $body,
            #[cfg(feature = "embedded")]
            Runtime::Embedded($r) => $body,
        }
    };
}

impl Runtime {
    #[cfg(feature = "sandboxed")]
    pub fn as_sandboxed(&self) -> Option<&SandboxedRuntime> {
        match self {
            Self::Sandboxed(r) => Some(r),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    #[cfg(feature = "sandboxed")]
    pub fn as_sandboxed_mut(&mut self) -> Option<&mut SandboxedRuntime> {
        match self {
            Self::Sandboxed(r) => Some(r),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    #[cfg(feature = "embedded")]
    pub fn as_embedded(&self) -> Option<&EmbeddedAdapter> {
        match self {
            Self::Embedded(r) => Some(r),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    /// Handle pending acknowledgments from the render side. Embedded calls
    /// are synchronous, so there is nothing to poll there.
    pub fn poll_events(&mut self) -> usize {
        match self {
            #[cfg(feature = "sandboxed")]
            Self::Sandboxed(r) => r.poll_events(),
            #[cfg(feature = "embedded")]
            Self::Embedded(_) => 0,
        }
    }
}

impl RuntimeAdapter for Runtime {
    fn kind(&self) -> RuntimeKind {
        dispatch!(self, r => r.kind())
    }

    fn parameters(&self) -> &ParameterStore {
        dispatch!(self, r => r.parameters())
    }

    fn slots(&self) -> &SlotTable {
        dispatch!(self, r => r.slots())
    }

    fn is_playing(&self) -> bool {
        dispatch!(self, r => r.is_playing())
    }

    fn forward(&self, id: &str, scaled: f64) {
        dispatch!(self, r => r.forward(id, scaled))
    }

    fn load_sample(&mut self, slot: usize, sample: SampleBuffer) -> BridgeResult<usize> {
        dispatch!(self, r => r.load_sample(slot, sample))
    }

    fn clear_slot(&mut self, slot: usize) {
        dispatch!(self, r => r.clear_slot(slot))
    }

    fn play_all(&mut self) {
        dispatch!(self, r => r.play_all())
    }

    fn stop_all(&mut self) {
        dispatch!(self, r => r.stop_all())
    }
}

#[cfg(feature = "sandboxed")]
impl From<SandboxedRuntime> for Runtime {
    fn from(runtime: SandboxedRuntime) -> Self {
        Self::Sandboxed(runtime)
    }
}

#[cfg(feature = "embedded")]
impl From<EmbeddedAdapter> for Runtime {
    fn from(adapter: EmbeddedAdapter) -> Self {
        Self::Embedded(adapter)
    }
}

// ============================================================================
// Launch
// ============================================================================

/// Result of [`launch`].
#[derive(Debug)]
pub struct Launch {
    pub runtime: Runtime,
    /// Render side of a sandboxed runtime. Move it to the audio thread and
    /// call [`BridgeHost::process`] there, then initialize the runtime.
    #[cfg(feature = "sandboxed")]
    pub render: Option<BridgeHost>,
}

/// Resolve the backend kind: the config first, then [`suna_core::RUNTIME_ENV`],
/// then [`DEFAULT_RUNTIME`].
pub fn resolve_kind(config: &BridgeConfig) -> BridgeResult<RuntimeKind> {
    match config.runtime {
        Some(kind) => Ok(kind),
        None => RuntimeKind::resolve(DEFAULT_RUNTIME),
    }
}

/// Build the runtime for `config`.
///
/// The embedded backend needs `native`; the sandboxed backend ignores it.
/// Fails with [`BridgeError::Config`](suna_core::BridgeError::Config) when
/// the resolved backend is not compiled in.
pub fn launch(
    config: &BridgeConfig,
    #[cfg(feature = "embedded")] native: Option<Arc<dyn NativeHost>>,
) -> BridgeResult<Launch> {
    let kind = resolve_kind(config)?;
    log::info!("launching {kind} runtime");

    match kind {
        #[cfg(feature = "sandboxed")]
        RuntimeKind::Sandboxed => {
            let (runtime, host) = SandboxedRuntime::new(config)?;
            Ok(Launch {
                runtime: runtime.into(),
                render: Some(host),
            })
        }
        #[cfg(feature = "embedded")]
        RuntimeKind::Embedded => {
            let native = native.ok_or_else(|| {
                suna_core::BridgeError::Config("embedded runtime needs a native host".into())
            })?;
            let adapter = EmbeddedAdapter::new(config, native)?;
            Ok(Launch {
                runtime: adapter.into(),
                #[cfg(feature = "sandboxed")]
                render: None,
            })
        }
        #[allow(unreachable_patterns)]
        other => Err(suna_core::BridgeError::Config(format!(
            "{other} runtime is not compiled in"
        ))),
    }
}
