//! Immutable application settings.
//!
//! Settings are read once at startup from the page query string (or the
//! `STAGE_NGIN_QUERY` environment variable natively) and then passed by reference.
//! The only way to change them afterwards is a [`SettingsChange`], which produces a new
//! value that the orchestrator applies in one place.

use std::{collections::HashMap, time::Duration};

use crate::graphics::QualityTier;

/// Environment variable holding the query string on native targets.
pub const QUERY_ENV: &str = "STAGE_NGIN_QUERY";

/// Device class, used for the loader's parallelism budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
}

impl DeviceClass {
    pub fn detect() -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            let agent = web_sys::window()
                .and_then(|window| window.navigator().user_agent().ok())
                .unwrap_or_default();
            if agent.contains("Mobi") || agent.contains("Android") {
                return Self::Mobile;
            }
        }
        Self::Desktop
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Forced quality tier (`graphics=high|normal`). `None` lets the classifier decide.
    pub graphics: Option<QualityTier>,
    /// Render the dev camera full screen and the main camera in a small inset.
    pub dev_camera: bool,
    /// Show the grid/axes helpers in every scene.
    pub helpers: bool,
    /// Debug control panel enabled.
    pub gui: bool,
    /// Collapse every crossfade and scene fade to an instant flip.
    pub skip_transitions: bool,
    /// Requested initial content scene. Checked against the registry allow-list.
    pub scene_id: Option<String>,
    /// Render statistics overlay enabled.
    pub stats: bool,
    /// Size of the dev inset relative to the main viewport.
    pub viewport_preview_scale: f32,
    /// Ignore the tier's buffer budget and render at window resolution.
    pub render_buffer_fullscreen: bool,
    pub transition_duration: Duration,
    pub gui_precision: f32,
    pub is_development: bool,
    pub device_class: DeviceClass,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            graphics: None,
            dev_camera: false,
            helpers: false,
            gui: false,
            skip_transitions: false,
            scene_id: None,
            stats: false,
            viewport_preview_scale: 0.25,
            render_buffer_fullscreen: false,
            transition_duration: Duration::from_secs(1),
            gui_precision: 0.001,
            is_development: cfg!(debug_assertions),
            device_class: DeviceClass::Desktop,
        }
    }
}

impl Settings {
    /// Read settings from the current page (wasm) or the environment (native).
    pub fn from_env() -> Self {
        #[cfg(target_arch = "wasm32")]
        let query = web_sys::window()
            .and_then(|window| window.location().search().ok())
            .unwrap_or_default();
        #[cfg(not(target_arch = "wasm32"))]
        let query = std::env::var(QUERY_ENV).unwrap_or_default();

        let mut settings = Self::parse(&query, cfg!(debug_assertions));
        settings.device_class = DeviceClass::detect();
        settings
    }

    /// Parse a query string such as `?graphics=high&devCamera=true&skipTransitions`.
    ///
    /// The developer toggles (`devCamera`, `helpers`, `gui`, `stats`) only take effect
    /// in development builds.
    pub fn parse(query: &str, is_development: bool) -> Self {
        let params = parse_query(query);
        let flag = |key: &str| params.get(key).is_some_and(|v| v.as_deref() == Some("true"));
        let present = |key: &str| params.contains_key(key);

        Self {
            graphics: params
                .get("graphics")
                .and_then(|v| v.as_deref())
                .and_then(QualityTier::parse),
            dev_camera: flag("devCamera") && is_development,
            helpers: flag("helpers") && is_development,
            gui: !present("gui") && is_development,
            skip_transitions: present("skipTransitions"),
            scene_id: params.get("sceneId").cloned().flatten(),
            stats: !present("stats") && is_development,
            is_development,
            ..Self::default()
        }
    }

    /// Produce the settings that result from a runtime toggle.
    pub fn apply(&self, change: SettingsChange) -> Self {
        let mut next = self.clone();
        match change {
            SettingsChange::DevCamera(enabled) => next.dev_camera = enabled,
            SettingsChange::Helpers(visible) => next.helpers = visible,
        }
        next
    }
}

/// A runtime toggle coming from the debug panel or the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsChange {
    DevCamera(bool),
    Helpers(bool),
}

impl SettingsChange {
    /// Query parameter that carries this toggle across reloads.
    pub fn query_pair(self) -> (&'static str, &'static str) {
        let (key, enabled) = match self {
            SettingsChange::DevCamera(enabled) => ("devCamera", enabled),
            SettingsChange::Helpers(visible) => ("helpers", visible),
        };
        (key, if enabled { "true" } else { "false" })
    }
}

/// Rewrite `query` so it carries `change`, keeping every other parameter in place.
/// The result has no leading `?`.
pub fn write_query(query: &str, change: SettingsChange) -> String {
    let (key, value) = change.query_pair();
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut written = false;
    for (name, current) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
        if name == key {
            if !written {
                serializer.append_pair(key, value);
                written = true;
            }
        } else if current.is_empty() {
            serializer.append_key_only(&name);
        } else {
            serializer.append_pair(&name, &current);
        }
    }
    if !written {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Record a runtime toggle in the page URL so a reload keeps it.
#[cfg(target_arch = "wasm32")]
pub fn persist(change: SettingsChange) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let location = window.location();
    let (Ok(search), Ok(path)) = (location.search(), location.pathname()) else {
        return;
    };
    let url = format!("{path}?{}", write_query(&search, change));
    let pushed = window.history().and_then(|history| {
        history.push_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(&url))
    });
    if let Err(e) = pushed {
        log::warn!("could not update the page query: {e:?}");
    }
}

/// Natively the query comes from the environment, so toggles only last for this run.
#[cfg(not(target_arch = "wasm32"))]
pub fn persist(change: SettingsChange) {
    let (key, value) = change.query_pair();
    log::debug!("{key}={value} is not persisted outside the browser");
}

/// Decoded query parameters. Keys without a value map to `None`.
fn parse_query(query: &str) -> HashMap<String, Option<String>> {
    form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .map(|(key, value)| {
            let value = (!value.is_empty()).then(|| value.into_owned());
            (key.into_owned(), value)
        })
        .collect()
}
