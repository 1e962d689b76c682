//! Integration tests for the overlay renderer, run against the dummy backend.
//!
//! # Test Categories
//!
//! - **Deferred queue**: replay counts, ordering, re-entrant defers
//! - **Line batching**: contiguity-aware flushing through a frame session
//! - **Coordinates**: viewer-relative rebasing far from the origin
//! - **Pipeline cache**: identity, distinctness and width quantization
//! - **Failures**: a failed draw doesn't take its siblings down

mod common;

use std::sync::Arc;

use glam::{DVec3, Vec3};
use rstest::rstest;

use common::{assert_vec3_near, chain, dummy_renderer, GREEN, RED};
use redlilium_overlay::curve::{path_segments, tessellate_quadratic};
use redlilium_overlay::distance;
use redlilium_overlay::{
    Aabb, DeferredPrimitive, DepthMode, DummyBackend, FilledBox, FrameHandlers, FramePhase,
    LabelStyle, OverlayConfig, OverlayError, OverlayFrame, OverlayRenderer, PipelineKey, Placement,
    ViewerSnapshot, WaypointStyle, DEFERRED_FLUSH_PRIORITY,
};

// ============================================================================
// Deferred Queue Tests
// ============================================================================

#[rstest]
#[case::none(0)]
#[case::one(1)]
#[case::many(25)]
fn test_deferred_boxes_draw_once(#[case] count: usize) {
    let mut renderer = dummy_renderer();

    let mut frame = renderer.begin_frame(ViewerSnapshot::default());
    for i in 0..count {
        frame.draw_color(DVec3::new(i as f64, 0.0, 0.0), RED, Some(1.0), DepthMode::SeeThrough);
    }
    frame.flush_deferred();
    frame.flush_deferred();
    let stats = frame.end();

    assert_eq!(stats.deferred_replayed as usize, count);
    assert_eq!(renderer.backend().draws().len(), count);
    assert!(renderer.state().queue().is_empty());

    // Nothing carries over into the next frame.
    renderer.backend_mut().clear_records();
    let stats = renderer.begin_frame(ViewerSnapshot::default()).end();
    assert_eq!(stats.draw_calls, 0);
    assert!(renderer.backend().draws().is_empty());
}

#[test]
fn test_replay_order_is_see_through_first() {
    let mut renderer = dummy_renderer();

    let mut frame = renderer.begin_frame(ViewerSnapshot::default());
    frame.draw_color(DVec3::new(1.0, 0.0, 0.0), RED, Some(1.0), DepthMode::Occluded);
    frame.draw_color(DVec3::new(2.0, 0.0, 0.0), RED, Some(1.0), DepthMode::SeeThrough);
    frame.draw_color(DVec3::new(3.0, 0.0, 0.0), RED, Some(1.0), DepthMode::SeeThrough);
    frame.end();

    let origins: Vec<f32> = renderer
        .backend()
        .draws()
        .iter()
        .filter_map(|d| d.bounds())
        .map(|(min, _)| min.x)
        .collect();
    assert_eq!(origins, vec![2.0, 3.0, 1.0]);
}

#[test]
fn test_defers_after_flush_land_in_next_frame() {
    let mut renderer = dummy_renderer();
    let mut handlers = FrameHandlers::new();
    handlers.register(
        DEFERRED_FLUSH_PRIORITY + 1,
        |frame: &mut OverlayFrame<'_, DummyBackend>| {
            frame.defer(DeferredPrimitive::FilledBox(FilledBox {
                aabb: Aabb::block(DVec3::ZERO),
                placement: Placement::World,
                color: GREEN,
                alpha_multiplier: 1.0,
                depth: DepthMode::Occluded,
            }));
        },
    );

    let first = handlers.run_frame(&mut renderer, ViewerSnapshot::default());
    assert_eq!(first.deferred_replayed, 0);
    assert_eq!(renderer.state().queue().len(), 1);

    let second = handlers.run_frame(&mut renderer, ViewerSnapshot::default());
    assert_eq!(second.deferred_replayed, 1);
    assert_eq!(second.draw_calls, 1);
    // The handler deferred again during the second frame.
    assert_eq!(renderer.state().queue().len(), 1);
}

#[rstest]
#[case::configured_scale(None, 0.533_333_33 * 0.05)]
#[case::explicit_scale(Some(1.0), 0.05)]
fn test_deferred_label_is_replayed_rebased(#[case] scale: Option<f64>, #[case] world_scale: f64) {
    let mut renderer = dummy_renderer();
    let viewer = ViewerSnapshot::new(DVec3::new(1.0e6, 64.0, -1.0e6), 1.0);

    let mut frame = renderer.begin_frame(viewer);
    let style = LabelStyle {
        see_through: true,
        scale,
        y_offset: 2.0,
        shadow: true,
        ..Default::default()
    };
    frame.draw_label(DVec3::new(1.0e6 + 3.0, 70.0, -1.0e6), "Waypoint", &style);
    assert_eq!(frame.phase(), FramePhase::Deferring);
    assert_eq!(frame.deferred_len(), 1);
    frame.flush_deferred();
    let stats = frame.end();

    assert_eq!(stats.deferred_replayed, 1);
    let texts = renderer.backend().texts();
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0].text, "Waypoint");
    assert!(texts[0].shadow);
    assert!((texts[0].scale as f64 - world_scale).abs() < 1e-6);
    assert_vec3_near(texts[0].origin, Vec3::new(3.0, 6.0 + 2.0 * world_scale as f32, 0.0));
}

// ============================================================================
// Line Batching Tests
// ============================================================================

#[test]
fn test_contiguous_segments_share_one_draw() {
    let mut renderer = dummy_renderer();
    let points = chain(DVec3::ZERO, 5);

    let mut frame = renderer.begin_frame(ViewerSnapshot::default());
    frame.lines(2.0, DepthMode::Occluded, |lines| {
        for w in points.windows(2) {
            lines.add_segment(w[0], w[1], RED);
        }
        assert_eq!(lines.pending().len(), 4);
    });
    let stats = frame.end();

    let draws = renderer.backend().draws();
    assert_eq!(stats.line_batches, 1);
    assert_eq!(draws.len(), 1);
    let xs: Vec<f32> = draws[0].vertices.iter().map(|v| v.position[0]).collect();
    assert_eq!(xs, vec![0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0]);
}

#[rstest]
#[case::second(1)]
#[case::middle(3)]
#[case::last(5)]
fn test_contiguity_break_flushes(#[case] k: usize) {
    let mut renderer = dummy_renderer();
    let mut segments: Vec<(DVec3, DVec3)> = chain(DVec3::ZERO, 7)
        .windows(2)
        .map(|w| (w[0], w[1]))
        .collect();
    // Shift the tail so segment k no longer starts where k-1 ended.
    for seg in &mut segments[k..] {
        seg.0.y += 10.0;
        seg.1.y += 10.0;
    }

    let mut frame = renderer.begin_frame(ViewerSnapshot::default());
    frame.lines(2.0, DepthMode::Occluded, |lines| {
        for (i, (a, b)) in segments.iter().enumerate() {
            lines.add_segment(*a, *b, RED);
            let expected = if i < k { i + 1 } else { i - k + 1 };
            assert_eq!(lines.pending().len(), expected);
        }
    });
    frame.end();

    let draws = renderer.backend().draws();
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[0].vertices.len(), k * 2);
    assert_eq!(draws[1].vertices.len(), (segments.len() - k) * 2);
}

#[test]
fn test_bezier_endpoints_are_exact() {
    let p1 = DVec3::new(0.25, 3.0, -7.5);
    let p2 = DVec3::new(4.0, 9.0, 1.0);
    let p3 = DVec3::new(-2.0, 0.5, 6.0);

    let segments = tessellate_quadratic(p1, p2, p3, 30);

    assert_eq!(segments.len(), 30);
    assert_eq!(segments[0].0, p1);
    assert_eq!(segments[29].1, p3);
    for w in segments.windows(2) {
        assert_eq!(w[0].1, w[1].0);
    }
}

#[rstest]
#[case::empty(vec![])]
#[case::single(vec![DVec3::new(1.0, 2.0, 3.0)])]
fn test_degenerate_paths_draw_nothing(#[case] waypoints: Vec<DVec3>) {
    assert!(path_segments(&waypoints, 1.0, 30).is_empty());
    assert!(path_segments(&waypoints, -1.0, 30).is_empty());

    let mut renderer = dummy_renderer();
    let mut frame = renderer.begin_frame(ViewerSnapshot::default());
    frame.draw_path(&waypoints, RED, 3.0, DepthMode::Occluded, 1.0);
    let stats = frame.end();
    assert_eq!(stats.draw_calls, 0);
}

// ============================================================================
// Coordinate Tests
// ============================================================================

#[rstest]
#[case::world(
    Aabb::new(DVec3::new(100.0, 64.0, 100.0), DVec3::new(101.0, 65.0, 101.0)),
    Placement::World
)]
#[case::camera_relative(
    Aabb::new(DVec3::new(0.0, 64.0, 0.0), DVec3::new(1.0, 65.0, 1.0)),
    Placement::CameraRelative
)]
fn test_box_is_drawn_viewer_relative(#[case] aabb: Aabb, #[case] placement: Placement) {
    let mut renderer = dummy_renderer();
    let viewer = ViewerSnapshot::new(DVec3::new(100.0, 0.0, 100.0), 1.0);

    let mut frame = renderer.begin_frame(viewer);
    frame.draw_filled_box(aabb, RED, 1.0, placement, DepthMode::Occluded);
    frame.end();

    let draws = renderer.backend().draws();
    assert_eq!(draws.len(), 1);
    let (min, max) = draws[0].bounds().expect("box has vertices");
    assert_vec3_near(min, Vec3::new(0.0, 64.0, 0.0));
    assert_vec3_near(max, Vec3::new(1.0, 65.0, 1.0));
}

#[test]
fn test_lines_far_from_origin_keep_precision() {
    let mut renderer = dummy_renderer();
    let far = DVec3::new(30_000_000.0, 70.0, -30_000_000.0);
    let viewer = ViewerSnapshot::new(far, 1.0);

    let mut frame = renderer.begin_frame(viewer);
    frame.draw_line(
        far + DVec3::new(0.125, 0.0, 0.0),
        far + DVec3::new(0.25, 0.0, 0.0),
        RED,
        2.0,
        DepthMode::Occluded,
    );
    frame.end();

    let vertices = &renderer.backend().draws()[0].vertices;
    assert_eq!(vertices[0].position, [0.125, 0.0, 0.0]);
    assert_eq!(vertices[1].position, [0.25, 0.0, 0.0]);
}

#[test]
fn test_distance_scale_scenario() {
    let alpha = distance::scale(100.0, 0.0, f64::INFINITY, 0.2, 1.0, false);
    assert!((alpha - 0.6).abs() < 1e-6);
}

#[rstest]
#[case::fades_in(DVec3::new(10.0, 0.0, 0.0), WaypointStyle::default(), 0.6)]
#[case::inverse(
    DVec3::new(10.0, 0.0, 0.0),
    WaypointStyle { inverse_alpha: true, ..Default::default() },
    0.5
)]
#[case::inverse_floor(
    DVec3::new(100.0, 0.0, 0.0),
    WaypointStyle { inverse_alpha: true, minimum_alpha: Some(0.35), ..Default::default() },
    0.35
)]
#[case::near_floor(
    DVec3::new(1.0, 0.0, 0.0),
    WaypointStyle { minimum_alpha: Some(0.4), ..Default::default() },
    0.4
)]
fn test_waypoint_alpha_follows_distance(
    #[case] location: DVec3,
    #[case] style: WaypointStyle,
    #[case] expected: f32,
) {
    let mut renderer = dummy_renderer();
    let mut frame = renderer.begin_frame(ViewerSnapshot::default());
    frame.draw_waypoint_filled(location, GREEN, &style);
    frame.end();

    let draws = renderer.backend().draws();
    assert_eq!(draws.len(), 1);
    for vertex in &draws[0].vertices {
        assert!(
            (vertex.color[3] - expected).abs() < 1e-5,
            "alpha {} != {expected}",
            vertex.color[3]
        );
    }
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[rstest]
#[case::valid("valid", "enabled = false\nline_width = 4.5\n", true)]
#[case::invalid("invalid", "line_width = \"wide\"\n", false)]
fn test_config_file(#[case] name: &str, #[case] content: &str, #[case] parses: bool) {
    common::init_logging();
    let path = std::env::temp_dir().join(format!(
        "redlilium_overlay_{name}_{}.toml",
        std::process::id()
    ));
    std::fs::write(&path, content).unwrap();

    let loaded = OverlayConfig::load(&path);
    let mut renderer = OverlayRenderer::with_config_file(DummyBackend::new(), &path);
    std::fs::remove_file(&path).unwrap();

    if parses {
        let config = loaded.unwrap();
        assert!(!config.enabled);
        assert_eq!(config.line_width, 4.5);
        assert_eq!(renderer.config(), &config);
    } else {
        assert!(matches!(loaded, Err(OverlayError::ConfigParse { .. })));
        assert_eq!(renderer.config(), &OverlayConfig::default());
    }

    // A disabled overlay draws nothing; the default one does.
    let mut frame = renderer.begin_frame(ViewerSnapshot::default());
    frame.draw_line(DVec3::ZERO, DVec3::X, RED, 2.0, DepthMode::Occluded);
    frame.end();
    assert_eq!(renderer.backend().draws().len(), usize::from(!parses));
}

// ============================================================================
// Pipeline Cache Tests
// ============================================================================

#[test]
fn test_pipelines_built_once_across_frames() {
    let mut renderer = dummy_renderer();

    for _ in 0..3 {
        let mut frame = renderer.begin_frame(ViewerSnapshot::default());
        frame.draw_line(DVec3::ZERO, DVec3::X, RED, 2.0, DepthMode::Occluded);
        frame.draw_line(DVec3::ZERO, DVec3::Y, RED, 2.0, DepthMode::SeeThrough);
        frame.end();
    }

    assert_eq!(renderer.backend().pipelines_created(), 2);
    assert_eq!(renderer.pipelines().len(), 2);
}

#[rstest]
#[case::same_width(2.0, 2.0, true)]
#[case::below_quantum(2.0, 2.001, true)]
#[case::distinct(2.0, 2.5, false)]
#[case::neighbors(1.01, 1.02, false)]
fn test_width_keys(#[case] a: f32, #[case] b: f32, #[case] shared: bool) {
    let renderer = dummy_renderer();
    let first = renderer.pipeline(PipelineKey::lines(a, DepthMode::Occluded)).unwrap();
    let second = renderer.pipeline(PipelineKey::lines(b, DepthMode::Occluded)).unwrap();

    assert_eq!(Arc::ptr_eq(&first, &second), shared);
    assert_eq!(first.handle == second.handle, shared);
}

// ============================================================================
// Failure Tests
// ============================================================================

#[test]
fn test_failed_draw_does_not_suppress_siblings() {
    let mut renderer = dummy_renderer();
    renderer.backend_mut().fail_next_draws(1);

    let mut frame = renderer.begin_frame(ViewerSnapshot::default());
    for i in 0..3 {
        frame.draw_color(DVec3::new(i as f64, 0.0, 0.0), RED, Some(1.0), DepthMode::Occluded);
    }
    let stats = frame.end();

    assert_eq!(stats.deferred_replayed, 3);
    assert_eq!(stats.failed_draws, 1);
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(renderer.backend().draws().len(), 2);
}

#[test]
fn test_pipeline_failure_is_retried_next_frame() {
    let mut renderer = dummy_renderer();
    renderer.backend().set_fail_pipelines(true);

    let mut frame = renderer.begin_frame(ViewerSnapshot::default());
    frame.draw_line(DVec3::ZERO, DVec3::X, RED, 2.0, DepthMode::Occluded);
    let stats = frame.end();
    assert_eq!(stats.failed_draws, 1);
    assert!(renderer.pipelines().is_empty());

    renderer.backend().set_fail_pipelines(false);
    let mut frame = renderer.begin_frame(ViewerSnapshot::default());
    frame.draw_line(DVec3::ZERO, DVec3::X, RED, 2.0, DepthMode::Occluded);
    let stats = frame.end();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(renderer.pipelines().len(), 1);
}
