use crate::viewport::BufferSize;

/// Film grain/scanline parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilmSettings {
    pub enabled: bool,
    pub noise_intensity: f32,
    pub scanline_intensity: f32,
    pub scanline_count: f32,
    pub grayscale: bool,
}

impl Default for FilmSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            noise_intensity: 0.35,
            scanline_intensity: 0.05,
            scanline_count: 4096.0,
            grayscale: false,
        }
    }
}

/// Uniform block of `final.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FinalUniforms {
    pub resolution: [f32; 2],
    /// `1 / resolution`, used by FXAA.
    pub inverse_resolution: [f32; 2],
    pub time: f32,
    pub film_enabled: f32,
    pub noise_intensity: f32,
    pub scanline_intensity: f32,
    pub scanline_count: f32,
    pub grayscale: f32,
    _padding: [f32; 2],
}

/// Screen pass: FXAA followed by film effects. Owns the time and resolution uniforms.
#[derive(Debug)]
pub struct FinalPass {
    uniforms: FinalUniforms,
}

impl FinalPass {
    pub fn new(size: BufferSize, film: FilmSettings) -> Self {
        let mut pass = Self {
            uniforms: FinalUniforms {
                resolution: [0.0; 2],
                inverse_resolution: [0.0; 2],
                time: 0.0,
                film_enabled: 0.0,
                noise_intensity: 0.0,
                scanline_intensity: 0.0,
                scanline_count: 0.0,
                grayscale: 0.0,
                _padding: [0.0; 2],
            },
        };
        pass.set_film(film);
        pass.resize(size);
        pass
    }

    pub fn set_film(&mut self, film: FilmSettings) {
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        self.uniforms.film_enabled = flag(film.enabled);
        self.uniforms.noise_intensity = film.noise_intensity;
        self.uniforms.scanline_intensity = film.scanline_intensity;
        self.uniforms.scanline_count = film.scanline_count;
        self.uniforms.grayscale = flag(film.grayscale);
    }

    pub fn resize(&mut self, size: BufferSize) {
        let width = size.width.max(1) as f32;
        let height = size.height.max(1) as f32;
        self.uniforms.resolution = [width, height];
        self.uniforms.inverse_resolution = [1.0 / width, 1.0 / height];
    }

    pub fn advance(&mut self, dt: f32) {
        self.uniforms.time += dt;
    }

    pub fn uniforms(&self) -> &FinalUniforms {
        &self.uniforms
    }
}
