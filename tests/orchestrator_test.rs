use stage_ngin::{
    camera::Eye,
    orchestrator::{FAILED_CLEAR_COLOR, PhaseKind, SwitchRequest},
    resources::{Asset, AssetKind},
    settings::{Settings, SettingsChange},
    tween::Signal,
    viewport::{BufferSize, Rect},
};

use crate::common::test_utils::{Behaviour, Call, Harness, SCREEN};

mod common;

const TARGET_A: &str = "render target A";
const TARGET_B: &str = "render target B";
const COMPOSITE: &str = "render target C";

#[test]
fn first_scene_is_shown_without_crossfade() {
    let mut h = Harness::new(&["a"]);
    assert_eq!(h.request("a"), SwitchRequest::Started);
    assert_eq!(h.orchestrator.phase(), PhaseKind::Loading);
    assert!(h.orchestrator.current_id().is_none());

    let results = h.finish_setups();
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(h.backend.prewarmed(), vec!["a"]);
    assert_eq!(h.orchestrator.current_id(), Some("a"));
    assert_eq!(h.orchestrator.phase(), PhaseKind::AnimatingIn);

    h.frame(0.016);
    assert_eq!(h.orchestrator.phase(), PhaseKind::Idle);
    assert_eq!(
        h.journal.lifecycle(),
        vec!["a:setup", "a:animate_in"],
        "nothing to animate out or dispose for the first scene"
    );
    assert_eq!(
        h.backend.last_frame_draws(),
        vec![("a".to_string(), Eye::Main, COMPOSITE.to_string())]
    );
    assert!(h.backend.last_frame().contains(&Call::FinalPass {
        source: COMPOSITE.to_string(),
        viewport: Rect::from_size(BufferSize::new(800, 600)),
    }));
}

#[test]
fn nothing_is_drawn_before_the_first_scene() {
    let mut h = Harness::new(&["a"]);
    h.frame(0.016);
    assert!(h.backend.last_frame_draws().is_empty());
    assert!(h
        .backend
        .last_frame()
        .contains(&Call::ClearScreen(wgpu::Color::BLACK)));
}

#[test]
fn switch_runs_the_full_lifecycle_in_order() {
    let mut h = Harness::new(&["a", "b"]);
    h.switch_to("a");
    h.journal.clear();

    assert_eq!(h.request("b"), SwitchRequest::Started);
    h.finish_setups();
    assert_eq!(h.orchestrator.phase(), PhaseKind::AnimatingOut);
    // b is set up but a is still the one on screen.
    assert_eq!(h.orchestrator.current_id(), Some("a"));

    h.frame(0.0);
    assert_eq!(h.orchestrator.phase(), PhaseKind::Transitioning);

    h.frame(0.5);
    assert_eq!(h.orchestrator.phase(), PhaseKind::Transitioning);
    let blend = h
        .backend
        .last_frame()
        .iter()
        .find_map(|call| match call {
            Call::Blend { a, b, factor, out } => Some((a.clone(), b.clone(), *factor, out.clone())),
            _ => None,
        })
        .expect("a crossfade frame blends");
    assert_eq!(blend.0, TARGET_A);
    assert_eq!(blend.1, TARGET_B);
    assert_eq!(blend.3, COMPOSITE);
    assert!(blend.2 > 0.0 && blend.2 < 1.0);
    assert_eq!(
        h.backend.last_frame_draws(),
        vec![
            ("a".to_string(), Eye::Main, TARGET_A.to_string()),
            ("b".to_string(), Eye::Main, TARGET_B.to_string()),
        ]
    );

    h.frame(0.5);
    assert_eq!(h.orchestrator.phase(), PhaseKind::Idle);
    assert_eq!(h.orchestrator.current_id(), Some("b"));
    assert_eq!(
        h.journal.lifecycle(),
        vec!["b:setup", "a:animate_out", "b:animate_in", "a:dispose"]
    );
    assert_eq!(h.backend.drawn_scenes(), vec!["b"]);
}

#[test]
fn previous_scene_is_disposed_only_after_the_crossfade() {
    let mut h = Harness::new(&["a", "b"]);
    h.switch_to("a");
    h.request("b");
    h.finish_setups();
    h.frame(0.0);
    for _ in 0..3 {
        h.frame(0.25);
        assert!(!h.journal.contains("a:dispose"));
        assert!(h.backend.drawn_scenes().contains(&"a".to_string()));
    }
    h.frame(0.25);
    assert_eq!(h.journal.count("a:dispose"), 1);
    assert!(!h.backend.drawn_scenes().contains(&"a".to_string()));

    h.settle();
    assert_eq!(h.journal.count("a:dispose"), 1, "disposed exactly once");
}

#[test]
fn previous_scene_fade_out_gates_the_crossfade() {
    let mut h = Harness::new(&["a", "b"]);
    let fade_out = Signal::pending();
    h.script(
        "a",
        Behaviour {
            animate_out: Some(fade_out.clone()),
            ..Behaviour::default()
        },
    );
    h.switch_to("a");
    h.request("b");
    h.finish_setups();
    for _ in 0..5 {
        h.frame(0.25);
        assert_eq!(h.orchestrator.phase(), PhaseKind::AnimatingOut);
        assert_eq!(h.backend.drawn_scenes(), vec!["a"]);
    }
    assert!(!h.journal.contains("b:animate_in"));

    fade_out.resolve();
    h.frame(0.0);
    assert_eq!(h.orchestrator.phase(), PhaseKind::Transitioning);
    assert!(h.journal.contains("b:animate_in"));
}

#[test]
fn animate_in_gates_the_next_queued_switch() {
    let mut h = Harness::new(&["a", "b"]);
    let fade_in = Signal::pending();
    h.script(
        "a",
        Behaviour {
            animate_in: Some(fade_in.clone()),
            ..Behaviour::default()
        },
    );
    h.request("a");
    h.finish_setups();
    h.frame(0.1);
    assert_eq!(h.orchestrator.phase(), PhaseKind::AnimatingIn);

    assert_eq!(h.request("b"), SwitchRequest::Queued);
    h.frame(0.1);
    assert!(!h.journal.contains("b:setup"));

    fade_in.resolve();
    h.frame(0.1);
    assert_eq!(h.orchestrator.phase(), PhaseKind::Loading);
    h.settle();
    assert_eq!(h.orchestrator.current_id(), Some("b"));
}

#[test]
fn requesting_the_current_scene_is_a_no_op() {
    let mut h = Harness::new(&["a"]);
    h.switch_to("a");
    h.journal.clear();
    h.backend.clear();

    assert_eq!(h.request("a"), SwitchRequest::AlreadyCurrent);
    assert!(h.orchestrator.drain_setup_tasks().is_empty());
    h.frame(0.1);
    assert!(h.journal.lifecycle().is_empty());
    assert!(h.backend.prewarmed().is_empty());
}

#[test]
fn requesting_the_pending_scene_is_a_no_op() {
    let mut h = Harness::new(&["a", "b"]);
    h.switch_to("a");
    assert_eq!(h.request("b"), SwitchRequest::Started);
    assert_eq!(h.request("b"), SwitchRequest::AlreadyPending);
    assert_eq!(h.finish_setups().len(), 1);
    h.settle();
    assert_eq!(h.journal.count("b:setup"), 1);
}

#[test]
fn unknown_scene_is_rejected() {
    let mut h = Harness::new(&["a"]);
    let err = h.orchestrator.request_scene("nope").unwrap_err();
    assert!(err.to_string().contains("unknown scene"));
    assert_eq!(h.orchestrator.phase(), PhaseKind::Idle);
}

#[test]
fn only_the_latest_queued_request_survives() {
    let mut h = Harness::new(&["a", "b", "c", "d"]);
    h.switch_to("a");
    assert_eq!(h.request("b"), SwitchRequest::Started);
    assert_eq!(h.request("c"), SwitchRequest::Queued);
    assert_eq!(h.request("d"), SwitchRequest::Queued);
    assert_eq!(h.orchestrator.queued(), Some("d"));

    h.settle();
    assert_eq!(h.orchestrator.current_id(), Some("d"));
    assert!(h.journal.contains("b:setup"));
    assert!(!h.journal.contains("c:setup"));
    assert_eq!(h.journal.count("b:dispose"), 1);
}

#[test]
fn re_requesting_the_in_flight_target_drops_the_queue() {
    let mut h = Harness::new(&["a", "b", "c"]);
    h.switch_to("a");
    h.request("b");
    h.request("c");
    assert_eq!(h.request("b"), SwitchRequest::AlreadyPending);
    assert!(h.orchestrator.queued().is_none());
    h.settle();
    assert_eq!(h.orchestrator.current_id(), Some("b"));
    assert!(!h.journal.contains("c:setup"));
}

#[test]
fn failed_setup_keeps_the_current_scene() {
    let mut h = Harness::new(&["a", "b"]);
    h.script(
        "b",
        Behaviour {
            fail_setup: true,
            ..Behaviour::default()
        },
    );
    h.switch_to("a");

    assert_eq!(h.request("b"), SwitchRequest::Started);
    let results = h.finish_setups();
    let err = results[0].as_ref().unwrap_err();
    assert!(format!("{err:#}").contains("b failed to build"));

    assert_eq!(h.orchestrator.phase(), PhaseKind::Idle);
    assert_eq!(h.orchestrator.current_id(), Some("a"));
    assert!(h.journal.contains("b:dispose"));
    assert!(!h.journal.contains("a:animate_out"));
    assert!(!h.journal.contains("a:dispose"));

    h.frame(0.1);
    assert_eq!(h.backend.drawn_scenes(), vec!["a"]);
}

#[test]
fn failed_prewarm_counts_as_failed_setup() {
    let mut h = Harness::new(&["a", "b"]);
    h.switch_to("a");
    h.backend.fail_prewarm.insert("b".to_string());
    h.request("b");
    let results = h.finish_setups();
    assert!(results[0].is_err());
    assert_eq!(h.orchestrator.current_id(), Some("a"));
    assert!(h.journal.contains("b:dispose"));
}

#[test]
fn failing_first_scene_enters_failed_state() {
    let mut h = Harness::new(&["a", "b"]);
    h.script(
        "a",
        Behaviour {
            fail_setup: true,
            ..Behaviour::default()
        },
    );
    h.request("a");
    assert!(h.finish_setups()[0].is_err());
    assert_eq!(h.orchestrator.phase(), PhaseKind::Failed);
    assert!(h.orchestrator.failure().is_some_and(|m| m.contains("a failed to build")));

    h.frame(0.1);
    assert!(h
        .backend
        .last_frame()
        .contains(&Call::ClearScreen(FAILED_CLEAR_COLOR)));
    assert!(h.backend.last_frame_draws().is_empty());

    // Another request recovers.
    assert_eq!(h.request("b"), SwitchRequest::Started);
    h.settle();
    assert_eq!(h.orchestrator.current_id(), Some("b"));
    assert!(h.orchestrator.failure().is_none());
}

#[test]
fn queued_request_starts_after_a_failure() {
    let mut h = Harness::new(&["a", "b", "c"]);
    h.script(
        "b",
        Behaviour {
            fail_setup: true,
            ..Behaviour::default()
        },
    );
    h.switch_to("a");
    h.request("b");
    assert_eq!(h.request("c"), SwitchRequest::Queued);
    assert!(h.finish_setups()[0].is_err());
    assert_eq!(h.orchestrator.phase(), PhaseKind::Loading);
    h.settle();
    assert_eq!(h.orchestrator.current_id(), Some("c"));
}

#[test]
fn disposed_scene_assets_are_evicted() {
    let mut h = Harness::new(&["a", "b"]);
    h.fetcher.insert("data/a.json", r#"{"answer": 42}"#);
    h.script(
        "a",
        Behaviour {
            manifest: vec![Asset::new("config", "data/a.json", AssetKind::Json)],
            ..Behaviour::default()
        },
    );
    h.switch_to("a");
    let assets = h.orchestrator.assets();
    assert_eq!(
        assets.borrow().get("a", "config").and_then(|d| d.as_json().cloned()),
        Some(serde_json::json!({"answer": 42}))
    );

    h.switch_to("b");
    assert!(!assets.borrow().contains_group("a"));
}

#[test]
fn failed_scene_assets_are_evicted() {
    let mut h = Harness::new(&["a"]);
    h.fetcher.insert("data/a.json", "{}");
    h.script(
        "a",
        Behaviour {
            fail_setup: true,
            manifest: vec![Asset::new("config", "data/a.json", AssetKind::Json)],
            ..Behaviour::default()
        },
    );
    h.request("a");
    assert!(h.finish_setups()[0].is_err());
    assert!(!h.orchestrator.assets().borrow().contains_group("a"));
}

#[test]
fn missing_manifest_file_fails_the_switch() {
    let mut h = Harness::new(&["a", "b"]);
    h.script(
        "b",
        Behaviour {
            manifest: vec![Asset::new("model", "models/missing.gltf", AssetKind::Gltf)],
            ..Behaviour::default()
        },
    );
    h.switch_to("a");
    h.request("b");
    let results = h.finish_setups();
    let message = format!("{:#}", results[0].as_ref().unwrap_err());
    assert!(message.contains("models/missing.gltf"), "{message}");
    assert_eq!(h.orchestrator.current_id(), Some("a"));
}

#[test]
fn skip_transitions_switches_within_one_frame() {
    let settings = Settings {
        skip_transitions: true,
        ..Settings::default()
    };
    let mut h = Harness::with_settings(&["a", "b"], settings);
    h.switch_to("a");
    h.request("b");
    h.finish_setups();
    h.frame(0.0);
    assert_eq!(h.orchestrator.phase(), PhaseKind::Idle);
    assert_eq!(h.orchestrator.current_id(), Some("b"));
    assert!(h.journal.contains("a:dispose"));
    assert!(!h
        .backend
        .calls
        .iter()
        .any(|call| matches!(call, Call::Blend { .. })));
}

#[test]
fn dev_camera_renders_full_screen_and_post_processing_inset() {
    let settings = Settings {
        dev_camera: true,
        is_development: true,
        ..Settings::default()
    };
    let mut h = Harness::with_settings(&["a"], settings);
    assert_eq!(h.orchestrator.graph().target_size(), BufferSize::new(200, 150));
    h.switch_to("a");
    h.frame(0.1);

    let frame = h.backend.last_frame();
    let screen_draw = frame
        .iter()
        .position(|call| {
            *call
                == Call::Draw {
                    scene: "a".to_string(),
                    eye: Eye::Dev,
                    output: SCREEN.to_string(),
                }
        })
        .expect("dev camera draws to the screen");
    let final_pass = frame
        .iter()
        .position(|call| {
            *call
                == Call::FinalPass {
                    source: COMPOSITE.to_string(),
                    viewport: Rect {
                        x: 0,
                        y: 0,
                        width: 200,
                        height: 150,
                    },
                }
        })
        .expect("post processing goes to the inset");
    assert!(screen_draw < final_pass);
    assert!(h.journal.count("a:update") > 0);
}

#[test]
fn toggling_dev_camera_resizes_the_targets() {
    let mut h = Harness::new(&["a"]);
    h.switch_to("a");
    assert_eq!(h.orchestrator.graph().target_size(), BufferSize::new(800, 600));
    h.orchestrator
        .apply_settings(&mut h.backend, SettingsChange::DevCamera(true));
    assert!(h.orchestrator.settings().dev_camera);
    assert_eq!(h.orchestrator.graph().target_size(), BufferSize::new(200, 150));
    assert_eq!(
        h.orchestrator.current_scene().map(|s| s.kit().input_eye()),
        Some(Eye::Dev)
    );

    h.orchestrator
        .apply_settings(&mut h.backend, SettingsChange::Helpers(true));
    assert!(h
        .orchestrator
        .current_scene()
        .is_some_and(|s| s.kit().helpers_visible()));
}

#[test]
fn resize_reaches_surface_targets_and_scenes() {
    let mut h = Harness::new(&["a"]);
    h.switch_to("a");
    h.backend.clear();
    h.orchestrator.resize(&mut h.backend, 1920, 1080, 1.0);

    let buffer = BufferSize::new(1280, 720);
    assert_eq!(h.orchestrator.viewport().buffer, buffer);
    assert_eq!(h.orchestrator.viewport().window, BufferSize::new(1920, 1080));
    assert!(h
        .backend
        .calls
        .contains(&Call::ResizeSurface(BufferSize::new(1920, 1080))));
    assert!(h
        .backend
        .calls
        .contains(&Call::ResizeTarget(COMPOSITE.to_string(), buffer)));
    let aspect = h
        .orchestrator
        .current_scene()
        .map(|s| s.kit().main_camera.aspect)
        .unwrap();
    assert!((aspect - 1280.0 / 720.0).abs() < 1e-5);
}

#[test]
fn final_pass_covers_the_window_sized_surface() {
    let mut h = Harness::new(&["a"]);
    h.switch_to("a");
    h.orchestrator.resize(&mut h.backend, 1920, 1080, 1.0);
    assert_eq!(h.orchestrator.viewport().surface, BufferSize::new(1920, 1080));
    assert_eq!(h.orchestrator.graph().target_size(), BufferSize::new(1280, 720));

    h.frame(0.016);
    assert!(h.backend.last_frame().contains(&Call::FinalPass {
        source: COMPOSITE.to_string(),
        viewport: Rect::from_size(BufferSize::new(1920, 1080)),
    }));
}

#[test]
fn stopped_loop_renders_nothing() {
    let mut h = Harness::new(&["a"]);
    h.switch_to("a");
    let frames = h.backend.frames();
    let now = instant::Instant::now();

    h.orchestrator.set_rendering(false);
    h.orchestrator.tick(&mut h.backend, now).unwrap();
    assert_eq!(h.backend.frames(), frames);

    h.orchestrator.set_rendering(true);
    h.orchestrator.tick(&mut h.backend, now).unwrap();
    h.orchestrator
        .tick(&mut h.backend, now + std::time::Duration::from_millis(16))
        .unwrap();
    assert_eq!(h.backend.frames(), frames + 2);
}

#[test]
fn skipped_surface_frame_still_advances_the_switch() {
    let mut h = Harness::new(&["a"]);
    h.request("a");
    h.finish_setups();
    h.backend.surface_ready = false;
    h.frame(0.1);
    assert_eq!(h.orchestrator.phase(), PhaseKind::Idle);
    assert_eq!(h.backend.frames(), 0);
}

#[test]
fn stale_setup_after_shutdown_is_disposed() {
    let mut h = Harness::new(&["a"]);
    h.request("a");
    let tasks = h.orchestrator.drain_setup_tasks();
    h.orchestrator.shutdown();

    for task in tasks {
        let outcome = futures::executor::block_on(task);
        assert!(h.orchestrator.finish_setup(&mut h.backend, outcome).is_ok());
    }
    assert!(h.journal.contains("a:dispose"));
    assert!(h.orchestrator.current_id().is_none());
    assert!(h.backend.prewarmed().is_empty());
}

#[test]
fn shutdown_disposes_every_scene() {
    let mut h = Harness::new(&["a", "b"]);
    h.switch_to("a");
    h.request("b");
    h.finish_setups();
    h.frame(0.0);
    h.frame(0.25);
    assert_eq!(h.orchestrator.phase(), PhaseKind::Transitioning);

    h.orchestrator.shutdown();
    assert_eq!(h.journal.count("a:dispose"), 1);
    assert_eq!(h.journal.count("b:dispose"), 1);
    assert!(!h.orchestrator.is_rendering());
    assert!(h.orchestrator.current_id().is_none());
}

#[test]
fn scene_panel_folders_follow_the_scene_lifetime() {
    let mut h = Harness::new(&["a", "b"]);
    h.switch_to("a");
    assert!(h.panel.folders().contains(&"a".to_string()));
    h.switch_to("b");
    let folders = h.panel.folders();
    assert!(!folders.contains(&"a".to_string()));
    assert!(folders.contains(&"b".to_string()));
    assert!(folders.contains(&"post processing".to_string()));
}
