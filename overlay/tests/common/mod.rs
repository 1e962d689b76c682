//! Shared helpers for overlay integration tests.

use glam::{DVec3, Vec3};
use redlilium_overlay::{DummyBackend, OverlayConfig, OverlayRenderer};

pub const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
pub const GREEN: [f32; 4] = [0.0, 1.0, 0.0, 1.0];

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// Renderer over a fresh [`DummyBackend`] with default config.
pub fn dummy_renderer() -> OverlayRenderer<DummyBackend> {
    init_logging();
    OverlayRenderer::new(DummyBackend::new(), OverlayConfig::default())
}

pub fn assert_vec3_near(actual: Vec3, expected: Vec3) {
    assert!(
        actual.abs_diff_eq(expected, 1e-4),
        "expected {expected:?}, got {actual:?}"
    );
}

/// `n` points along +X spaced one unit apart, starting at `origin`.
pub fn chain(origin: DVec3, n: usize) -> Vec<DVec3> {
    (0..n).map(|i| origin + DVec3::new(i as f64, 0.0, 0.0)).collect()
}
