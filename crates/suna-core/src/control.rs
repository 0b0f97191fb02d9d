//! Controller input → instrument calls.
//!
//! Polling the device is someone else's job. This module takes one
//! [`GamepadSnapshot`] per poll and turns changes into runtime calls: the
//! right stick drives grain length, the two triggers drive a three-state
//! density/freeze machine. Nothing is sent while readings stay the same.

use serde::{Deserialize, Serialize};

use crate::instrument::{MAX_GRAIN_LENGTH, MIN_GRAIN_LENGTH};
use crate::runtime::RuntimeAdapter;

/// Trigger reading above which a trigger counts as pressed.
pub const TRIGGER_THRESHOLD: f32 = 0.5;

/// Grain-length samples per unit of axis travel.
const GRAIN_LENGTH_PER_AXIS_UNIT: f32 = ((MAX_GRAIN_LENGTH - MIN_GRAIN_LENGTH) / 2) as f32;

/// Density/freeze state derived from the triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerState {
    #[default]
    Off,
    On,
    Freeze,
}

impl TriggerState {
    /// Both pressed → freeze, exactly one → on, neither → off.
    pub fn from_triggers(left: f32, right: f32) -> Self {
        match (left > TRIGGER_THRESHOLD, right > TRIGGER_THRESHOLD) {
            (true, true) => Self::Freeze,
            (true, false) | (false, true) => Self::On,
            (false, false) => Self::Off,
        }
    }

    /// `(density, freeze)` this state asks for.
    pub const fn targets(self) -> (f32, bool) {
        match self {
            Self::Off => (0.0, false),
            Self::On => (1.0, false),
            Self::Freeze => (1.0, true),
        }
    }
}

/// Axis in [-1, 1] → grain length in [256, 8192]. Out-of-range input is clamped.
pub fn grain_length_from_axis(axis: f32) -> u32 {
    let axis = if axis.is_finite() { axis.clamp(-1.0, 1.0) } else { 0.0 };
    let length = MIN_GRAIN_LENGTH + ((axis + 1.0) * GRAIN_LENGTH_PER_AXIS_UNIT).floor() as u32;
    length.min(MAX_GRAIN_LENGTH)
}

/// One poll of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamepadSnapshot {
    pub connected: bool,
    /// Right stick X in [-1, 1].
    pub axis: f32,
    pub left_trigger: f32,
    pub right_trigger: f32,
}

impl GamepadSnapshot {
    pub const DISCONNECTED: Self = Self {
        connected: false,
        axis: 0.0,
        left_trigger: 0.0,
        right_trigger: 0.0,
    };

    pub fn connected(axis: f32, left_trigger: f32, right_trigger: f32) -> Self {
        Self {
            connected: true,
            axis,
            left_trigger,
            right_trigger,
        }
    }
}

/// What one [`ControlMapper::apply`] call sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MapperUpdate {
    /// New grain length, if it changed.
    pub grain_length: Option<u32>,
    /// New trigger state, if it changed.
    pub trigger_state: Option<TriggerState>,
}

impl MapperUpdate {
    pub fn is_empty(&self) -> bool {
        self.grain_length.is_none() && self.trigger_state.is_none()
    }
}

/// Edge detector between controller polls and the runtime.
#[derive(Debug, Clone, Default)]
pub struct ControlMapper {
    state: TriggerState,
    last_length: Option<u32>,
}

impl ControlMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn last_grain_length(&self) -> Option<u32> {
        self.last_length
    }

    /// Feed one poll. A disconnected pad reads as both triggers released and
    /// leaves grain length alone.
    pub fn apply(&mut self, snapshot: &GamepadSnapshot, runtime: &dyn RuntimeAdapter) -> MapperUpdate {
        let mut update = MapperUpdate::default();

        if snapshot.connected {
            let length = grain_length_from_axis(snapshot.axis);
            if self.last_length != Some(length) {
                self.last_length = Some(length);
                runtime.set_grain_length(length);
                update.grain_length = Some(length);
            }
        } else {
            self.last_length = None;
        }

        let state = if snapshot.connected {
            TriggerState::from_triggers(snapshot.left_trigger, snapshot.right_trigger)
        } else {
            TriggerState::Off
        };
        if state != self.state {
            log::debug!("trigger state {:?} -> {:?}", self.state, state);
            self.state = state;
            let (density, freeze) = state.targets();
            runtime.set_grain_density(density);
            runtime.set_freeze(freeze);
            update.trigger_state = Some(state);
        }

        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_endpoints() {
        assert_eq!(grain_length_from_axis(-1.0), 256);
        assert_eq!(grain_length_from_axis(0.0), 4224);
        assert_eq!(grain_length_from_axis(1.0), 8192);
        assert_eq!(grain_length_from_axis(-3.0), 256);
        assert_eq!(grain_length_from_axis(3.0), 8192);
        assert_eq!(grain_length_from_axis(f32::NAN), 4224);
    }

    #[test]
    fn test_axis_monotonic() {
        let mut prev = 0;
        for i in 0..=200 {
            let axis = -1.0 + i as f32 / 100.0;
            let length = grain_length_from_axis(axis);
            assert!(length >= prev);
            assert!((256..=8192).contains(&length));
            prev = length;
        }
    }

    #[test]
    fn test_trigger_table() {
        assert_eq!(TriggerState::from_triggers(0.0, 0.0), TriggerState::Off);
        assert_eq!(TriggerState::from_triggers(0.9, 0.0), TriggerState::On);
        assert_eq!(TriggerState::from_triggers(0.0, 0.9), TriggerState::On);
        assert_eq!(TriggerState::from_triggers(0.9, 0.9), TriggerState::Freeze);
        // Threshold is strict.
        assert_eq!(TriggerState::from_triggers(0.5, 0.5), TriggerState::Off);
    }

    #[test]
    fn test_targets() {
        assert_eq!(TriggerState::Off.targets(), (0.0, false));
        assert_eq!(TriggerState::On.targets(), (1.0, false));
        assert_eq!(TriggerState::Freeze.targets(), (1.0, true));
    }
}
