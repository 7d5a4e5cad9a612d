use cgmath::{Point3, Quaternion, Rad, Rotation3};

use crate::{
    camera::DEFAULT_DISTANCE,
    data_structures::{
        geometry::Geometry,
        scene_graph::{Material, Mesh, Node},
    },
    light::hex_to_rgb,
    scene::{Scene, SceneKit, SetupContext},
    tween::{Animated, Easing, Signal},
};

pub const SPINNER: &str = "spinner";
const SPIN_SPEED: f32 = 2.0;

/// Shown while the first content scene loads: a spinning ring that fades in and out.
pub struct PreloaderScene {
    kit: SceneKit,
    opacity: Animated,
}

impl PreloaderScene {
    pub fn new(ctx: &SetupContext) -> Self {
        let mut kit = SceneKit::new(super::PRELOADER, ctx).with_clear_color(0x111111);
        kit.main_camera.position = Point3::new(0.0, 0.0, DEFAULT_DISTANCE);
        Self {
            kit,
            opacity: Animated::new(0.0),
        }
    }

    pub fn opacity(&self) -> f32 {
        self.opacity.get()
    }
}

impl Scene for PreloaderScene {
    fn kit(&self) -> &SceneKit {
        &self.kit
    }

    fn kit_mut(&mut self) -> &mut SceneKit {
        &mut self.kit
    }

    fn create_objects(&mut self, _ctx: &SetupContext) -> anyhow::Result<()> {
        let material = Material {
            color: hex_to_rgb(0xffffff),
            opacity: self.opacity.get(),
            transparent: true,
        };
        let mut spinner = Node::with_mesh(
            SPINNER,
            Mesh::new(Geometry::ring(0.8, 1.0, 64, [1.0, 1.0, 1.0]), material),
        );
        spinner.frustum_culled = false;
        self.kit.root.add_child(spinner);
        Ok(())
    }

    fn animate_in(&mut self) -> anyhow::Result<Signal> {
        let duration = self.kit.fade_duration();
        Ok(self.opacity.animate_to(1.0, duration, Easing::QuadOut))
    }

    fn animate_out(&mut self) -> anyhow::Result<Signal> {
        let duration = self.kit.fade_duration();
        Ok(self.opacity.animate_to(0.0, duration, Easing::QuadOut))
    }

    fn update(&mut self, dt: f32) {
        self.opacity.advance(dt);
        let opacity = self.opacity.get();
        if let Some(spinner) = self.kit.root.find_mut(SPINNER) {
            spinner.transform.rotation =
                spinner.transform.rotation * Quaternion::from_angle_z(Rad(-dt * SPIN_SPEED));
            if let Some(mesh) = spinner.mesh.as_mut() {
                mesh.material.opacity = opacity;
            }
        }
    }
}
