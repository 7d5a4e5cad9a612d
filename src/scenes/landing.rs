use anyhow::Context;
use cgmath::{Quaternion, Rad, Rotation3, Vector3};

use crate::{
    data_structures::{
        geometry::Geometry,
        scene_graph::{Material, Mesh, Node},
    },
    light::{Light, hex_to_color, hex_to_rgb},
    resources::{Asset, AssetKind, AssetManager},
    scene::{Scene, SceneKit, SetupContext},
};

pub const SPHERE: &str = "sphere";
pub const CRYSTAL: &str = "crystal";
pub const PEDESTAL: &str = "pedestal";

const CONFIG: &str = "config";
const DEFAULT_ROTATION_SPEED: f32 = 0.2;

/// Lit sphere flanked by two loaded models, with orbit controls.
pub struct LandingScene {
    kit: SceneKit,
    rotation_speed: f32,
}

impl LandingScene {
    pub fn new(ctx: &SetupContext) -> Self {
        let kit = SceneKit::new(super::LANDING, ctx)
            .with_clear_color(0x0b0d17)
            .with_lights(vec![Light::ambient(), Light::directional()])
            .with_manifest(manifest())
            .with_controls();
        Self {
            kit,
            rotation_speed: DEFAULT_ROTATION_SPEED,
        }
    }
}

pub fn manifest() -> Vec<Asset> {
    vec![
        Asset::new(CONFIG, "data/landing.json", AssetKind::Json),
        Asset::new(CRYSTAL, "models/crystal.gltf", AssetKind::Gltf),
        Asset::new(PEDESTAL, "models/pedestal.obj", AssetKind::Obj),
    ]
}

/// `"#rrggbb"` to a packed colour.
fn parse_hex(value: &str) -> Option<u32> {
    u32::from_str_radix(value.trim_start_matches('#'), 16).ok()
}

impl Scene for LandingScene {
    fn kit(&self) -> &SceneKit {
        &self.kit
    }

    fn kit_mut(&mut self) -> &mut SceneKit {
        &mut self.kit
    }

    fn create_objects(&mut self, ctx: &SetupContext) -> anyhow::Result<()> {
        let assets = ctx.assets.borrow();
        let group = self.kit.id().to_string();
        let lookup = |id: &str| {
            assets
                .get(&group, id)
                .with_context(|| format!("{group}: asset `{id}` is not loaded"))
        };
        let config = lookup(CONFIG)?
            .as_json()
            .context("landing config is not json")?;

        if let Some(clear) = config["clearColor"].as_str().and_then(parse_hex) {
            self.kit.clear_color = hex_to_color(clear);
        }
        if let Some(speed) = config["rotationSpeed"].as_f64() {
            self.rotation_speed = speed as f32;
        }
        let sphere = &config["sphere"];
        let radius = sphere["radius"].as_f64().unwrap_or(1.0) as f32;
        let color = sphere["color"]
            .as_str()
            .and_then(parse_hex)
            .map_or([1.0; 3], hex_to_rgb);
        let segments = |key: &str, default: u32| sphere[key].as_u64().map_or(default, |v| v as u32);
        let geometry = Geometry::sphere(
            radius,
            segments("widthSegments", 32),
            segments("heightSegments", 16),
            color,
        );
        self.kit
            .root
            .add_child(Node::with_mesh(SPHERE, Mesh::new(geometry, Material::default())));

        self.kit.root.add_child(model_node(&assets, &group, CRYSTAL, 2.5)?);
        self.kit.root.add_child(model_node(&assets, &group, PEDESTAL, -2.5)?);
        Ok(())
    }

    fn update(&mut self, dt: f32) {
        if let Some(sphere) = self.kit.root.find_mut(SPHERE) {
            sphere.transform.rotation =
                sphere.transform.rotation * Quaternion::from_angle_y(Rad(dt * self.rotation_speed));
        }
    }
}

fn model_node(assets: &AssetManager, group: &str, id: &str, x: f32) -> anyhow::Result<Node> {
    let data = assets
        .get(group, id)
        .with_context(|| format!("{group}: asset `{id}` is not loaded"))?;
    let material = Material::default();
    let mut node = if let Some(model) = data.as_gltf() {
        model.to_node(id, &material)
    } else if let Some(model) = data.as_obj() {
        model.to_node(id, &material)
    } else {
        anyhow::bail!("{group}: asset `{id}` is not a model");
    };
    node.transform.position = Vector3::new(x, 0.0, 0.0);
    Ok(node)
}
