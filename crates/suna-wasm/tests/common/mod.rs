#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use suna_wasm::BridgeHost;

/// Test DSP module.
///
/// - left out = left in * 0.5 + 0.125 while playing
/// - right out = right in * 0.25 + mix * 0.001
/// - slot lengths are kept in a table at address 0
pub const TEST_DSP: &str = r#"
(module
  (import "spectest" "print_char" (func $print_char (param i32)))
  (memory (export "memory") 16)
  (global $rate (mut f32) (f32.const 0))
  (global $mix (mut f32) (f32.const 0))
  (global $grain (mut i32) (i32.const 0))
  (global $playing (mut i32) (i32.const 0))

  (func (export "init_sampler") (param $sr f32)
    (global.set $rate (local.get $sr))
    (call $print_char (i32.const 111))
    (call $print_char (i32.const 107))
    (call $print_char (i32.const 10)))

  (func (export "load_sample") (param $slot i32) (param $offset i32) (param $len i32)
    (i32.store (i32.mul (local.get $slot) (i32.const 4)) (local.get $len)))

  (func (export "clear_slot") (param $slot i32)
    (i32.store (i32.mul (local.get $slot) (i32.const 4)) (i32.const 0)))

  (func (export "get_slot_length") (param $slot i32) (result i32)
    (i32.load (i32.mul (local.get $slot) (i32.const 4))))

  (func (export "play_all") (global.set $playing (i32.const 1)))
  (func (export "stop_all") (global.set $playing (i32.const 0)))
  (func (export "set_mix") (param f32) (global.set $mix (local.get 0)))
  (func (export "set_grain_length") (param i32) (global.set $grain (local.get 0)))

  (func (export "process_block")
    (param $id i32) (param $inl i32) (param $inr i32)
    (param $outl i32) (param $outr i32) (param $n i32)
    (result i32)
    (local $i i32) (local $off i32)
    (block $done
      (loop $next
        (br_if $done (i32.ge_u (local.get $i) (local.get $n)))
        (local.set $off (i32.mul (local.get $i) (i32.const 4)))
        (f32.store (i32.add (local.get $outl) (local.get $off))
          (f32.add
            (f32.mul (f32.load (i32.add (local.get $inl) (local.get $off))) (f32.const 0.5))
            (f32.mul (f32.convert_i32_u (global.get $playing)) (f32.const 0.125))))
        (f32.store (i32.add (local.get $outr) (local.get $off))
          (f32.add
            (f32.mul (f32.load (i32.add (local.get $inr) (local.get $off))) (f32.const 0.25))
            (f32.mul (global.get $mix) (f32.const 0.001))))
        (local.set $i (i32.add (local.get $i) (i32.const 1)))
        (br $next)))
    (i32.const 0)))
"#;

/// Module with no `init_sampler`.
pub const MISSING_INIT: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "load_sample") (param i32 i32 i32))
  (func (export "process_block") (param i32 i32 i32 i32 i32 i32)))
"#;

/// Module whose init traps.
pub const TRAPPING_INIT: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "init_sampler") (param f32) unreachable)
  (func (export "load_sample") (param i32 i32 i32))
  (func (export "process_block") (param i32 i32 i32 i32 i32 i32)))
"#;

/// Module whose block export traps.
pub const TRAPPING_BLOCK: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "init_sampler") (param f32))
  (func (export "load_sample") (param i32 i32 i32))
  (func (export "process_block") (param i32 i32 i32 i32 i32 i32) unreachable))
"#;

/// Module whose sample loader traps.
pub const TRAPPING_LOAD: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "init_sampler") (param f32))
  (func (export "load_sample") (param i32 i32 i32) unreachable)
  (func (export "process_block") (param i32 i32 i32 i32 i32 i32)))
"#;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A render thread that keeps calling `process` until stopped.
pub struct RenderThread {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<BridgeHost>>,
}

impl RenderThread {
    pub fn spawn(mut host: BridgeHost) -> Self {
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
        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stop rendering and take the host back.
    pub fn join(mut self) -> BridgeHost {
        self.stop.store(true, Ordering::Release);
        self.handle.take().unwrap().join().unwrap()
    }
}
