use std::time::Duration;

use stage_ngin::{
    app_state::AppState,
    graphics::QualityTier,
    settings::{Settings, SettingsChange, write_query},
};

#[test]
fn development_defaults_enable_gui_and_stats() {
    let settings = Settings::parse("", true);
    assert!(settings.gui);
    assert!(settings.stats);
    assert!(!settings.dev_camera);
    assert!(!settings.helpers);
    assert!(!settings.skip_transitions);
    assert_eq!(settings.graphics, None);
    assert_eq!(settings.scene_id, None);
    assert_eq!(settings.transition_duration, Duration::from_secs(1));
    assert_eq!(settings.viewport_preview_scale, 0.25);
}

#[test]
fn production_ignores_developer_toggles() {
    let settings = Settings::parse("?devCamera=true&helpers=true", false);
    assert!(!settings.gui);
    assert!(!settings.stats);
    assert!(!settings.dev_camera);
    assert!(!settings.helpers);
    assert!(!settings.is_development);
}

#[test]
fn query_parameters_are_read() {
    let settings = Settings::parse(
        "?graphics=high&devCamera=true&helpers=true&gui&stats&skipTransitions&sceneId=empty",
        true,
    );
    assert_eq!(settings.graphics, Some(QualityTier::High));
    assert!(settings.dev_camera);
    assert!(settings.helpers);
    assert!(!settings.gui, "present key suppresses the panel");
    assert!(!settings.stats);
    assert!(settings.skip_transitions);
    assert_eq!(settings.scene_id.as_deref(), Some("empty"));
}

#[test]
fn only_literal_true_enables_flags() {
    let settings = Settings::parse("devCamera=1&helpers", true);
    assert!(!settings.dev_camera);
    assert!(!settings.helpers);
}

#[test]
fn unknown_tier_is_ignored() {
    assert_eq!(Settings::parse("graphics=ultra", true).graphics, None);
}

#[test]
fn values_are_percent_decoded() {
    let settings = Settings::parse("?sceneId=%6Canding&graphics=hi%67h", true);
    assert_eq!(settings.scene_id.as_deref(), Some("landing"));
    assert_eq!(settings.graphics, Some(QualityTier::High));

    let settings = Settings::parse("sceneId=my+scene", true);
    assert_eq!(settings.scene_id.as_deref(), Some("my scene"));
}

#[test]
fn toggles_are_written_back_to_the_query() {
    let query = write_query("?sceneId=empty&devCamera=false&gui", SettingsChange::DevCamera(true));
    assert_eq!(query, "sceneId=empty&devCamera=true&gui");
    let reloaded = Settings::parse(&query, true);
    assert!(reloaded.dev_camera);
    assert!(!reloaded.gui);
    assert_eq!(reloaded.scene_id.as_deref(), Some("empty"));

    let query = write_query("", SettingsChange::Helpers(true));
    assert_eq!(query, "helpers=true");
    assert!(Settings::parse(&query, true).helpers);

    let query = write_query("sceneId=my+scene&helpers=true", SettingsChange::Helpers(false));
    assert_eq!(query, "sceneId=my+scene&helpers=false");
}

#[test]
fn changes_produce_new_values() {
    let settings = Settings::parse("", true);
    let next = settings.apply(SettingsChange::DevCamera(true));
    assert!(next.dev_camera);
    assert!(!settings.dev_camera);
    let next = next.apply(SettingsChange::Helpers(true));
    assert!(next.helpers && next.dev_camera);
}

#[test]
fn ready_edge_is_detected_once() {
    let idle = AppState::default();
    let ready = AppState::new(true);
    assert!(ready.became_ready(&idle));
    assert!(!ready.became_ready(&ready));
    assert!(!idle.became_ready(&ready));
}
