//! Per-instrument control state.
//!
//! One [`ControlContext`] per instrument instance, owned by whoever composes
//! the UI. It holds the runtime, the gamepad edge detector and the last pad
//! reading.

use serde_json::Value;
use suna_core::{
    ipc, BridgeResult, ControlMapper, GamepadSnapshot, MapperUpdate, ParameterBinding,
    RuntimeAdapter, SampleBuffer, TriggerState,
};

use crate::runtime::Runtime;

#[derive(Debug)]
pub struct ControlContext {
    runtime: Runtime,
    mapper: ControlMapper,
    gamepad: GamepadSnapshot,
}

impl ControlContext {
    pub fn new(runtime: impl Into<Runtime>) -> Self {
        Self {
            runtime: runtime.into(),
            mapper: ControlMapper::new(),
            gamepad: GamepadSnapshot::DISCONNECTED,
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.runtime
    }

    pub fn into_runtime(self) -> Runtime {
        self.runtime
    }

    /// Last pad reading passed to [`update_gamepad`](Self::update_gamepad).
    pub fn gamepad(&self) -> GamepadSnapshot {
        self.gamepad
    }

    pub fn trigger_state(&self) -> TriggerState {
        self.mapper.state()
    }

    /// Feed one gamepad poll. Only changes reach the runtime.
    pub fn update_gamepad(&mut self, snapshot: GamepadSnapshot) -> MapperUpdate {
        if snapshot.connected != self.gamepad.connected {
            log::info!(
                "gamepad {}",
                if snapshot.connected { "connected" } else { "disconnected" }
            );
        }
        self.gamepad = snapshot;
        self.mapper.apply(&snapshot, &self.runtime)
    }

    /// Load into the next free (or oldest) slot.
    pub fn load(&mut self, sample: SampleBuffer) -> BridgeResult<usize> {
        self.runtime.poll_events();
        self.runtime.load_next(sample)
    }

    /// A widget binding already subscribed to `id`. `None` for an unknown id.
    pub fn bind(&self, id: &str) -> Option<ParameterBinding> {
        let mut binding = ParameterBinding::new(id);
        binding.bind(&self.runtime).then_some(binding)
    }

    /// Route a JSON control message from the UI.
    pub fn dispatch_json(&mut self, json: &str) -> BridgeResult<()> {
        ipc::dispatch_json(&mut self.runtime, json)
    }

    /// Answer a UI query.
    pub fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, String> {
        ipc::invoke(&self.runtime, method, args)
    }
}
