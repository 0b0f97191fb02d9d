//! The native side of the embedded bridge.

use serde_json::Value;
use suna_core::instrument::{FREEZE, GRAIN_LENGTH};

/// Functions a native plugin host exposes to the control surface.
///
/// Calls happen on the control thread. Arguments are JSON primitives;
/// anything larger (sample PCM) is encoded by [`crate::payload`] first.
pub trait NativeHost: Send + Sync {
    /// Call a native function by name.
    ///
    /// Return `Err(message)` when the function is unknown or fails.
    fn invoke(&self, function: &str, args: &[Value]) -> Result<Value, String>;

    /// Deliver a parameter write.
    ///
    /// The default calls the camel-case setter (`delayTime` becomes
    /// `setDelayTime`) with [`native_argument`]. Hosts that relay parameters
    /// through their own automation objects override this.
    fn set_parameter(&self, id: &str, scaled: f64) -> Result<(), String> {
        self.invoke(&native_setter_name(id), &[native_argument(id, scaled)])
            .map(|_| ())
    }
}

/// `blendX` → `setBlendX`.
pub fn native_setter_name(id: &str) -> String {
    let mut chars = id.chars();
    let mut name = String::with_capacity(id.len() + 3);
    name.push_str("set");
    if let Some(first) = chars.next() {
        name.extend(first.to_uppercase());
        name.extend(chars);
    }
    name
}

/// Argument for a native setter: grain length is an integer and freeze a
/// bool, everything else a float.
pub fn native_argument(id: &str, scaled: f64) -> Value {
    match id {
        GRAIN_LENGTH => Value::from(scaled.round().max(0.0) as u32),
        FREEZE => Value::Bool(scaled >= 0.5),
        _ => Value::from(scaled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_setter_name() {
        assert_eq!(native_setter_name("blendX"), "setBlendX");
        assert_eq!(native_setter_name("grainLength"), "setGrainLength");
        assert_eq!(native_setter_name("mix"), "setMix");
        assert_eq!(native_setter_name(""), "set");
    }

    #[test]
    fn test_native_argument() {
        assert_eq!(native_argument(GRAIN_LENGTH, 1023.6), Value::from(1024u32));
        assert_eq!(native_argument(FREEZE, 1.0), Value::Bool(true));
        assert_eq!(native_argument(FREEZE, 0.0), Value::Bool(false));
        assert_eq!(native_argument("mix", 42.5), Value::from(42.5));
    }
}
