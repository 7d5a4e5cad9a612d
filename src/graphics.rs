//! Graphics quality tiers.
//!
//! A [`QualityTier`] is a coarse classification of the device used to pick the render
//! buffer budget and the pixel ratio. The tier either comes from the `graphics` query
//! override or from a [`TierClassifier`] that inspects the GPU adapter.

use std::fmt;

/// Coarse graphics capability class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QualityTier {
    High,
    #[default]
    Normal,
}

impl QualityTier {
    /// Parse the value of the `graphics` query parameter.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "high" => Some(Self::High),
            "normal" => Some(Self::Normal),
            _ => None,
        }
    }

    pub fn config(self) -> GraphicsConfig {
        match self {
            QualityTier::High => GraphicsConfig {
                antialias: false,
                min_pixel_ratio: 1.0,
                max_pixel_ratio: 2.0,
                max_frame_buffer: (1280, 720),
            },
            QualityTier::Normal => GraphicsConfig {
                antialias: false,
                min_pixel_ratio: 1.0,
                max_pixel_ratio: 1.0,
                max_frame_buffer: (1280, 720),
            },
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityTier::High => f.write_str("high"),
            QualityTier::Normal => f.write_str("normal"),
        }
    }
}

/// Per-tier render budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphicsConfig {
    /// MSAA on the surface. Off whenever the post-processing FXAA runs.
    pub antialias: bool,
    pub min_pixel_ratio: f64,
    pub max_pixel_ratio: f64,
    /// Largest render buffer, expressed as a width/height pair whose area is the budget.
    pub max_frame_buffer: (u32, u32),
}

impl GraphicsConfig {
    /// The pixel ratio the render buffer is sized with for a given device pixel ratio.
    pub fn pixel_ratio(&self, device_pixel_ratio: f64) -> f64 {
        device_pixel_ratio.clamp(self.min_pixel_ratio, self.max_pixel_ratio)
    }

    pub fn max_buffer_area(&self) -> u64 {
        self.max_frame_buffer.0 as u64 * self.max_frame_buffer.1 as u64
    }
}

/// Opaque capability classifier.
pub trait TierClassifier {
    fn classify(&self) -> QualityTier;
}

/// Classifies by the adapter's device type: discrete GPUs get the high tier.
pub struct AdapterClassifier {
    info: wgpu::AdapterInfo,
}

impl AdapterClassifier {
    pub fn new(info: wgpu::AdapterInfo) -> Self {
        Self { info }
    }
}

impl TierClassifier for AdapterClassifier {
    fn classify(&self) -> QualityTier {
        match self.info.device_type {
            wgpu::DeviceType::DiscreteGpu => QualityTier::High,
            _ => QualityTier::Normal,
        }
    }
}

/// Always answers the same tier. Used when the tier is forced.
pub struct FixedTier(pub QualityTier);

impl TierClassifier for FixedTier {
    fn classify(&self) -> QualityTier {
        self.0
    }
}
