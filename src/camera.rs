//! Cameras, orbit controls and the camera uniform.
//!
//! Every scene owns a main camera and a dev camera. The dev camera is only looked through
//! when the `devCamera` setting is on, in which case the main camera is shown in the
//! small debug inset.

use cgmath::{EuclideanSpace, InnerSpace, Matrix, Matrix4, Point3, SquareMatrix, Vector3, Vector4};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

/// cgmath produces OpenGL clip space (z in -1..1), wgpu expects 0..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

pub const DEFAULT_FOV: f32 = 65.0;
pub const DEFAULT_NEAR: f32 = 0.1;
pub const DEFAULT_FAR: f32 = 1000.0;
pub const DEFAULT_DISTANCE: f32 = 5.0;

/// Which of a scene's two cameras to look through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Eye {
    #[default]
    Main,
    Dev,
}

#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl PerspectiveCamera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            position: Point3::new(0.0, 0.0, 0.0),
            target: Point3::origin(),
            up: Vector3::unit_y(),
            fov,
            aspect,
            near,
            far,
        };
        camera.reset(DEFAULT_DISTANCE);
        camera
    }

    /// Place the camera at (d, d, d) looking at the origin.
    pub fn reset(&mut self, distance: f32) {
        self.position = Point3::new(distance, distance, distance);
        self.target = Point3::origin();
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn view(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX
            * cgmath::perspective(cgmath::Deg(self.fov), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection() * self.view()
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection())
    }
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self::new(DEFAULT_FOV, 1.0, DEFAULT_NEAR, DEFAULT_FAR)
    }
}

/// Six clip planes extracted from a view-projection matrix.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    planes: [Vector4<f32>; 6],
}

impl Frustum {
    pub fn from_view_projection(m: &Matrix4<f32>) -> Self {
        let m = m.transpose();
        let (r0, r1, r2, r3) = (m.x, m.y, m.z, m.w);
        let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2].map(|p| {
            let length = p.truncate().magnitude();
            if length > 0.0 { p / length } else { p }
        });
        Self { planes }
    }

    pub fn intersects_sphere(&self, center: Point3<f32>, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|p| p.truncate().dot(center.to_vec()) + p.w >= -radius)
    }
}

/// Orbit style mouse controls: drag with the left button rotates around the target,
/// the wheel zooms.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub enabled: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    dragging: bool,
    cursor: Option<(f64, f64)>,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            enabled: true,
            rotate_speed: 0.005,
            zoom_speed: 0.1,
            min_distance: 0.5,
            max_distance: 500.0,
            dragging: false,
            cursor: None,
        }
    }
}

impl OrbitControls {
    /// Feed a window event. Returns whether the camera moved.
    pub fn handle_window_event(&mut self, event: &WindowEvent, camera: &mut PerspectiveCamera) -> bool {
        if !self.enabled {
            return false;
        }
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = *state == ElementState::Pressed;
                false
            }
            WindowEvent::CursorMoved { position, .. } => {
                let current = (position.x, position.y);
                let previous = self.cursor.replace(current);
                match (self.dragging, previous) {
                    (true, Some((x, y))) => {
                        let dx = (current.0 - x) as f32 * self.rotate_speed;
                        let dy = (current.1 - y) as f32 * self.rotate_speed;
                        self.rotate(camera, -dx, -dy);
                        true
                    }
                    _ => false,
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 100.0,
                };
                self.zoom(camera, 1.0 - lines * self.zoom_speed);
                true
            }
            _ => false,
        }
    }

    fn rotate(&self, camera: &mut PerspectiveCamera, theta: f32, phi: f32) {
        let offset = camera.position - camera.target;
        let radius = offset.magnitude();
        if radius <= f32::EPSILON {
            return;
        }
        let mut azimuth = offset.x.atan2(offset.z);
        let mut polar = (offset.y / radius).clamp(-1.0, 1.0).acos();
        azimuth += theta;
        polar = (polar + phi).clamp(0.01, std::f32::consts::PI - 0.01);
        let offset = Vector3::new(
            radius * polar.sin() * azimuth.sin(),
            radius * polar.cos(),
            radius * polar.sin() * azimuth.cos(),
        );
        camera.position = camera.target + offset;
    }

    fn zoom(&self, camera: &mut PerspectiveCamera, scale: f32) {
        let offset = camera.position - camera.target;
        let distance = (offset.magnitude() * scale).clamp(self.min_distance, self.max_distance);
        if offset.magnitude() > f32::EPSILON {
            camera.position = camera.target + offset.normalize() * distance;
        }
    }
}

/// Camera uniform: eye position and view projection.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &PerspectiveCamera) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = camera.view_projection().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}
