//! Scene lights and the packed light uniform.

use cgmath::{InnerSpace, Vector3};

/// Default light colour of the built-in scenes (0xd4d4d4).
pub const DEFAULT_LIGHT_COLOR: u32 = 0xd4d4d4;
pub const DEFAULT_LIGHT_INTENSITY: f32 = 0.6;

#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    Ambient {
        color: [f32; 3],
        intensity: f32,
    },
    /// Light coming from `position` towards the origin.
    Directional {
        color: [f32; 3],
        intensity: f32,
        position: Vector3<f32>,
    },
}

impl Light {
    pub fn ambient() -> Self {
        Light::Ambient {
            color: hex_to_rgb(DEFAULT_LIGHT_COLOR),
            intensity: DEFAULT_LIGHT_INTENSITY,
        }
    }

    pub fn directional() -> Self {
        Light::Directional {
            color: hex_to_rgb(DEFAULT_LIGHT_COLOR),
            intensity: DEFAULT_LIGHT_INTENSITY,
            position: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

pub fn hex_to_rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

pub fn hex_to_color(hex: u32) -> wgpu::Color {
    let [r, g, b] = hex_to_rgb(hex);
    wgpu::Color {
        r: r as f64,
        g: g as f64,
        b: b as f64,
        a: 1.0,
    }
}

/// Summed lighting of a scene. Multiple lights of one kind are accumulated; a scene
/// without lights renders unlit (full ambient).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub ambient: [f32; 4],
    /// Normalized direction towards the light, w unused.
    pub direction: [f32; 4],
    pub directional: [f32; 4],
}

impl LightUniform {
    pub fn from_lights(lights: &[Light]) -> Self {
        if lights.is_empty() {
            return Self {
                ambient: [1.0, 1.0, 1.0, 0.0],
                direction: [0.0, 1.0, 0.0, 0.0],
                directional: [0.0; 4],
            };
        }
        let mut uniform = Self {
            ambient: [0.0; 4],
            direction: [0.0, 1.0, 0.0, 0.0],
            directional: [0.0; 4],
        };
        for light in lights {
            match light {
                Light::Ambient { color, intensity } => {
                    for i in 0..3 {
                        uniform.ambient[i] += color[i] * intensity;
                    }
                }
                Light::Directional {
                    color,
                    intensity,
                    position,
                } => {
                    if position.magnitude2() > 0.0 {
                        uniform.direction = position.normalize().extend(0.0).into();
                    }
                    for i in 0..3 {
                        uniform.directional[i] += color[i] * intensity;
                    }
                }
            }
        }
        uniform
    }
}
