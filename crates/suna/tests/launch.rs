use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};
use suna::prelude::*;
use suna::resolve_kind;
use suna_core::instrument::{FREEZE, GRAIN_DENSITY, GRAIN_LENGTH, MIX};

/// Passes input through and accepts every call.
const PASSTHROUGH_DSP: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "init_sampler") (param f32))
  (func (export "load_sample") (param i32 i32 i32))
  (func (export "process_block")
    (param $id i32) (param $inl i32) (param $inr i32)
    (param $outl i32) (param $outr i32) (param $n i32)
    (memory.copy (local.get $outl) (local.get $inl) (i32.mul (local.get $n) (i32.const 4)))
    (memory.copy (local.get $outr) (local.get $inr) (i32.mul (local.get $n) (i32.const 4)))))
"#;

#[derive(Default)]
struct RecordingHost {
    calls: Mutex<Vec<String>>,
}

impl NativeHost for RecordingHost {
    fn invoke(&self, function: &str, _args: &[Value]) -> Result<Value, String> {
        self.calls.lock().push(function.to_string());
        Ok(Value::Null)
    }
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Render on a background thread until the returned flag is set.
fn spawn_render(mut host: BridgeHost) -> (Arc<AtomicBool>, thread::JoinHandle<BridgeHost>) {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    let handle = thread::spawn(move || {
        let mut left = [0.0f32; 128];
        let mut right = [0.0f32; 128];
        while !flag.load(Ordering::Acquire) {
            host.process(&[], &mut [&mut left, &mut right]);
            thread::sleep(Duration::from_millis(1));
        }
        host
    });
    (stop, handle)
}

#[test]
fn test_explicit_config_wins() {
    let config = BridgeConfig::new(48_000.0).with_runtime(RuntimeKind::Embedded);
    assert_eq!(resolve_kind(&config).unwrap(), RuntimeKind::Embedded);
}

#[test]
fn test_launch_embedded() {
    init_logger();
    let host = Arc::new(RecordingHost::default());
    let config = BridgeConfig::new(48_000.0).with_runtime(RuntimeKind::Embedded);

    let launch = launch(&config, Some(host.clone() as Arc<dyn NativeHost>)).unwrap();
    assert!(launch.render.is_none());
    assert_eq!(launch.runtime.kind(), RuntimeKind::Embedded);
    assert!(launch.runtime.as_embedded().is_some());
    assert!(launch.runtime.as_sandboxed().is_none());

    let mut context = ControlContext::new(launch.runtime);
    context.runtime_mut().play_all();
    context.runtime().set_blend_y(0.75);
    assert_eq!(*host.calls.lock(), vec!["playAll", "setBlendY"]);
}

#[test]
fn test_launch_embedded_needs_native_host() {
    let config = BridgeConfig::new(48_000.0).with_runtime(RuntimeKind::Embedded);
    assert!(matches!(launch(&config, None), Err(BridgeError::Config(_))));
}

#[test]
fn test_sandboxed_session_through_context() {
    init_logger();
    let config = BridgeConfig::new(44_100.0)
        .with_runtime(RuntimeKind::Sandboxed)
        .with_layout(MemoryLayout::compact());
    let Launch { runtime, render } = launch(&config, None).unwrap();
    let (stop, handle) = spawn_render(render.unwrap());

    let mut context = ControlContext::new(runtime);
    context
        .runtime_mut()
        .as_sandboxed_mut()
        .unwrap()
        .initialize(PASSTHROUGH_DSP.as_bytes())
        .unwrap();
    assert_eq!(context.invoke("runtime", &[]), Ok(json!("sandboxed")));

    // Pad: stick centred, both triggers held.
    let update = context.update_gamepad(GamepadSnapshot::connected(0.0, 1.0, 1.0));
    assert_eq!(update.grain_length, Some(4224));
    assert_eq!(update.trigger_state, Some(TriggerState::Freeze));
    let parameters = context.runtime().parameters();
    assert_eq!(parameters.scaled(GRAIN_LENGTH), Some(4224.0));
    assert_eq!(parameters.scaled(GRAIN_DENSITY), Some(1.0));
    assert_eq!(parameters.scaled(FREEZE), Some(1.0));

    let update = context.update_gamepad(GamepadSnapshot::DISCONNECTED);
    assert_eq!(update.trigger_state, Some(TriggerState::Off));
    assert_eq!(context.trigger_state(), TriggerState::Off);
    assert!(!context.gamepad().connected);

    // UI messages go through the same runtime.
    let binding = context.bind(MIX).unwrap();
    context
        .dispatch_json(r#"{"type":"setParam","name":"mix","value":150}"#)
        .unwrap();
    assert_eq!(binding.scaled(), 100.0);
    context.dispatch_json(r#"{"type":"playAll"}"#).unwrap();
    assert_eq!(context.invoke("isPlaying", &[]), Ok(json!(true)));
    assert!(context.bind("nope").is_none());

    let sample = SampleBuffer::new("pad", vec![0.5; 256], 44_100.0).unwrap();
    assert_eq!(context.load(sample), Ok(0));
    assert!(context.runtime().slots().is_loaded(0));

    stop.store(true, Ordering::Release);
    let host = handle.join().unwrap();
    assert_eq!(host.stats_snapshot().traps, 0);
}
