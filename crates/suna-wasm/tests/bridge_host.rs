mod common;

use approx::assert_relative_eq;
use common::{init_logger, MISSING_INIT, TEST_DSP, TRAPPING_BLOCK, TRAPPING_INIT};
use suna_core::{BridgeError, InitError, MemoryLayout};
use suna_wasm::BridgeHost;

fn ready_host(layout: MemoryLayout) -> BridgeHost {
    init_logger();
    let mut host = BridgeHost::new(layout, 44_100.0).unwrap();
    host.initialize(TEST_DSP.as_bytes()).unwrap();
    host
}

fn render(host: &mut BridgeHost, left: &[f32], right: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let mut out_l = vec![0.0; left.len()];
    let mut out_r = vec![0.0; left.len()];
    host.process(&[left, right], &mut [&mut out_l, &mut out_r]);
    (out_l, out_r)
}

#[test]
fn test_initialize_and_render() {
    let mut host = ready_host(MemoryLayout::compact());
    assert!(host.is_initialized());

    let input = [0.5f32; 128];
    let (left, right) = render(&mut host, &input, &input);
    for (l, r) in left.iter().zip(&right) {
        assert_relative_eq!(*l, 0.25);
        assert_relative_eq!(*r, 0.125);
    }
    assert_eq!(host.stats_snapshot().blocks, 1);
}

#[test]
fn test_process_is_deterministic() {
    let input: Vec<f32> = (0..128).map(|i| (i as f32 / 64.0).sin()).collect();
    let mut a = ready_host(MemoryLayout::compact());
    let mut b = ready_host(MemoryLayout::compact());
    a.set_param("mix", 30.0);
    b.set_param("mix", 30.0);

    let first = render(&mut a, &input, &input);
    let second = render(&mut b, &input, &input);
    let again = render(&mut a, &input, &input);
    assert_eq!(first, second);
    assert_eq!(first, again);
}

#[test]
fn test_long_buffers_are_split_into_quanta() {
    let mut host = ready_host(MemoryLayout::compact());
    let input = vec![1.0f32; 300];
    let (left, _) = render(&mut host, &input, &input);
    assert_eq!(left.len(), 300);
    assert!(left.iter().all(|s| *s == 0.5));
    assert_eq!(host.stats_snapshot().blocks, 3);
}

#[test]
fn test_mono_in_fans_out_and_mono_out_averages() {
    let mut host = ready_host(MemoryLayout::compact());
    let input = [1.0f32; 128];

    let mut left = [0.0f32; 128];
    let mut right = [0.0f32; 128];
    host.process(&[&input], &mut [&mut left, &mut right]);
    assert_relative_eq!(left[0], 0.5);
    assert_relative_eq!(right[0], 0.25);

    let mut mono = [0.0f32; 128];
    host.process(&[&input], &mut [&mut mono]);
    assert_relative_eq!(mono[0], 0.375);
}

#[test]
fn test_transport_and_setters_reach_module() {
    let mut host = ready_host(MemoryLayout::compact());
    let silence = [0.0f32; 128];

    host.play_all();
    host.set_param("mix", 100.0);
    let (left, right) = render(&mut host, &silence, &silence);
    assert_relative_eq!(left[0], 0.125);
    assert_relative_eq!(right[0], 0.1, epsilon = 1e-6);

    host.stop_all();
    host.set_param("set_mix", 0.0);
    let (left, right) = render(&mut host, &silence, &silence);
    assert_eq!(left[0], 0.0);
    assert_eq!(right[0], 0.0);

    // No `set_blend_x` export: ignored, not an error.
    host.set_blend_x(0.3);
    assert_eq!(host.stats_snapshot().ignored, 1);
}

#[test]
fn test_short_right_channel_limits_frames() {
    let mut host = ready_host(MemoryLayout::compact());
    let input = [0.5f32; 64];
    let mut out_l = [1.0f32; 64];
    let mut out_r = [1.0f32; 32];
    host.process(&[&input, &input], &mut [&mut out_l, &mut out_r]);

    for l in &out_l[..32] {
        assert_relative_eq!(*l, 0.25);
    }
    assert!(out_l[32..].iter().all(|&l| l == 0.0));
    for r in &out_r {
        assert_relative_eq!(*r, 0.125);
    }
}

#[test]
fn test_load_truncates_and_clear_resets() {
    let mut host = ready_host(MemoryLayout::DEFAULT);
    let pcm = vec![0.25f32; 2_000_000];

    let stored = host.load_sample(0, &pcm).unwrap();
    assert_eq!(stored, 1_440_000);
    assert_eq!(host.slot_length(0), Some(1_440_000));

    host.clear_slot(0);
    assert_eq!(host.slot_length(0), Some(0));

    assert_eq!(
        host.load_sample(8, &pcm[..10]),
        Err(BridgeError::SlotOutOfRange { slot: 8, max_slots: 8 })
    );
}

#[test]
fn test_init_failures() {
    init_logger();
    let mut host = BridgeHost::new(MemoryLayout::compact(), 48_000.0).unwrap();

    assert_eq!(
        host.initialize(MISSING_INIT.as_bytes()),
        Err(InitError::MissingExport("init_sampler"))
    );
    assert!(!host.is_initialized());

    assert!(matches!(
        host.initialize(TRAPPING_INIT.as_bytes()),
        Err(InitError::InitCall(_))
    ));
    assert!(!host.is_initialized());

    // A good module afterwards still works.
    host.initialize(TEST_DSP.as_bytes()).unwrap();
    assert!(host.is_initialized());
}

#[test]
fn test_trap_renders_silence() {
    let mut host = BridgeHost::new(MemoryLayout::compact(), 48_000.0).unwrap();
    host.initialize(TRAPPING_BLOCK.as_bytes()).unwrap();

    let input = [1.0f32; 128];
    let mut left = [9.0f32; 128];
    let mut right = [9.0f32; 128];
    host.process(&[&input, &input], &mut [&mut left, &mut right]);
    assert_eq!(left, [0.0; 128]);
    assert_eq!(right, [0.0; 128]);
    assert_eq!(host.stats_snapshot().traps, 1);
}

#[test]
fn test_shutdown_and_reinitialize() {
    let mut host = ready_host(MemoryLayout::compact());
    host.shutdown();
    assert!(!host.is_initialized());
    assert_eq!(host.load_sample(0, &[0.0; 4]), Err(BridgeError::NotInitialized));

    host.initialize(TEST_DSP.as_bytes()).unwrap();
    assert_eq!(host.load_sample(0, &[0.0; 4]), Ok(4));
}

#[test]
fn test_independent_instances() {
    let mut a = ready_host(MemoryLayout::compact());
    let mut b = ready_host(MemoryLayout::compact());
    a.load_sample(2, &[0.1; 32]).unwrap();
    assert_eq!(a.slot_length(2), Some(32));
    assert_eq!(b.slot_length(2), Some(0));
}
