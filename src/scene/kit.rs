use std::time::Duration;

use winit::event::WindowEvent;

use crate::{
    camera::{DEFAULT_DISTANCE, Eye, OrbitControls, PerspectiveCamera},
    data_structures::{
        geometry::Geometry,
        scene_graph::{Material, Mesh, Node},
    },
    gui::SharedPanel,
    light::{Light, hex_to_color},
    resources::Asset,
    scene::SetupContext,
    viewport::BufferSize,
};

pub const HELPERS_NODE: &str = "helpers";
const GRID_SIZE: f32 = 10.0;
const AXES_SIZE: f32 = 5.0;
const DEFAULT_CLEAR_COLOR: u32 = 0x000000;
const FADE_DURATION: Duration = Duration::from_millis(500);

/// Shared scene boilerplate: cameras, lights, the root node, debug helpers and the
/// scene's debug panel folder.
pub struct SceneKit {
    id: String,
    pub clear_color: wgpu::Color,
    pub lights: Vec<Light>,
    /// Assets loaded before `create_objects` runs.
    pub manifest: Vec<Asset>,
    pub root: Node,
    pub main_camera: PerspectiveCamera,
    pub dev_camera: PerspectiveCamera,
    pub controls: Option<OrbitControls>,
    /// The camera receiving input. Follows the `devCamera` setting.
    eye: Eye,
    fade: Duration,
    panel: SharedPanel,
    disposed: bool,
}

impl SceneKit {
    pub fn new(id: impl Into<String>, ctx: &SetupContext) -> Self {
        let id = id.into();
        ctx.panel.add_folder(&id);
        let mut dev_camera = PerspectiveCamera::default();
        dev_camera.reset(DEFAULT_DISTANCE * 2.0);
        Self {
            root: Node::new(id.clone()),
            id,
            clear_color: hex_to_color(DEFAULT_CLEAR_COLOR),
            lights: Vec::new(),
            manifest: Vec::new(),
            main_camera: PerspectiveCamera::default(),
            dev_camera,
            controls: None,
            eye: if ctx.settings.dev_camera { Eye::Dev } else { Eye::Main },
            fade: if ctx.settings.skip_transitions {
                Duration::ZERO
            } else {
                FADE_DURATION
            },
            panel: ctx.panel.clone(),
            disposed: false,
        }
    }

    pub fn with_clear_color(mut self, hex: u32) -> Self {
        self.clear_color = hex_to_color(hex);
        self
    }

    pub fn with_lights(mut self, lights: Vec<Light>) -> Self {
        self.lights = lights;
        self
    }

    pub fn with_manifest(mut self, manifest: Vec<Asset>) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn with_controls(mut self) -> Self {
        self.controls = Some(OrbitControls::default());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Duration of the scene's own fade in/out. Zero when transitions are skipped.
    pub fn fade_duration(&self) -> Duration {
        self.fade
    }

    pub fn panel(&self) -> &SharedPanel {
        &self.panel
    }

    pub fn camera(&self, eye: Eye) -> &PerspectiveCamera {
        match eye {
            Eye::Main => &self.main_camera,
            Eye::Dev => &self.dev_camera,
        }
    }

    /// Debug grid and axes, grouped under one node so they toggle together.
    pub fn create_helpers(&mut self, visible: bool) {
        if self.root.find(HELPERS_NODE).is_some() {
            return;
        }
        let mut helpers = Node::new(HELPERS_NODE);
        helpers.visible = visible;
        helpers.add_child(Node::with_mesh(
            "grid",
            Mesh::new(Geometry::grid(GRID_SIZE, 10), Material::default()),
        ));
        helpers.add_child(Node::with_mesh(
            "axes",
            Mesh::new(Geometry::axes(AXES_SIZE), Material::default()),
        ));
        self.root.add_child(helpers);
    }

    pub fn set_helpers_visible(&mut self, visible: bool) {
        if let Some(helpers) = self.root.find_mut(HELPERS_NODE) {
            helpers.visible = visible;
        }
    }

    pub fn helpers_visible(&self) -> bool {
        self.root.find(HELPERS_NODE).is_some_and(|helpers| helpers.visible)
    }

    pub fn set_dev_camera(&mut self, enabled: bool) {
        self.eye = if enabled { Eye::Dev } else { Eye::Main };
    }

    pub fn input_eye(&self) -> Eye {
        self.eye
    }

    pub fn resize(&mut self, size: BufferSize) {
        self.main_camera.set_aspect(size.width, size.height);
        self.dev_camera.set_aspect(size.width, size.height);
    }

    pub fn handle_input(&mut self, event: &WindowEvent) -> bool {
        let Some(controls) = self.controls.as_mut() else {
            return false;
        };
        let camera = match self.eye {
            Eye::Main => &mut self.main_camera,
            Eye::Dev => &mut self.dev_camera,
        };
        controls.handle_window_event(event, camera)
    }

    /// Release every mesh of the tree and drop the panel folder. Safe to call twice.
    pub fn dispose(&mut self) -> usize {
        if self.disposed {
            return 0;
        }
        self.disposed = true;
        if let Some(controls) = self.controls.as_mut() {
            controls.enabled = false;
        }
        self.panel.remove_folder(&self.id);
        let released = self.root.dispose();
        log::debug!("disposed {}: {released} meshes", self.id);
        released
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
