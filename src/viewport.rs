//! Render buffer sizing.
//!
//! The render buffer (the backing store every pass renders into) is derived from the
//! window size, the device pixel ratio and the quality tier's buffer budget. The
//! visible canvas always keeps the raw window size; when the buffer is smaller it is
//! scaled up on presentation. In the browser the canvas does that scaling. Natively the
//! swapchain must match the window, so the surface stays at window size and the final
//! pass stretches the buffer over it.

use crate::graphics::GraphicsConfig;

/// Whether the presentation surface is sized to the window rather than the render buffer.
pub const SURFACE_FOLLOWS_WINDOW: bool = cfg!(not(target_arch = "wasm32"));

/// Width/height of a render buffer in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferSize {
    pub width: u32,
    pub height: u32,
}

impl BufferSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Uniformly scale both axes, never collapsing below one pixel.
    pub fn scaled(&self, scale: f32) -> Self {
        Self {
            width: ((self.width as f32 * scale) as u32).max(1),
            height: ((self.height as f32 * scale) as u32).max(1),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// A screen-space rectangle (x, y, width, height) used for viewport and scissor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn from_size(size: BufferSize) -> Self {
        Self {
            x: 0,
            y: 0,
            width: size.width,
            height: size.height,
        }
    }
}

/// Resolve the render buffer size for a window.
///
/// Windows whose area exceeds `max_area` are scaled down keeping their aspect ratio:
/// the side of a square with the budget's area is used as the width, the height follows
/// the window's aspect ratio, and a final uniform scalar corrects the area back up to
/// the budget. Each step truncates to whole pixels. Windows within budget, or any window
/// when `full_resolution` is set, pass through unchanged.
///
/// Zero sized windows are treated as one pixel.
pub fn resolve_buffer_size(
    window_width: u32,
    window_height: u32,
    max_area: u64,
    full_resolution: bool,
) -> BufferSize {
    let window_width = window_width.max(1);
    let window_height = window_height.max(1);
    let window_area = window_width as u64 * window_height as u64;
    if full_resolution || window_area <= max_area {
        return BufferSize::new(window_width, window_height);
    }

    let base = (max_area as f64).sqrt();
    let ratio = window_height as f64 / window_width as f64;
    let width = base;
    let height = (base * ratio).floor();
    let scalar = (max_area as f64 / (width * height)).sqrt();
    let width = (width * scalar).floor() as u32;
    let height = (height * scalar).floor() as u32;
    BufferSize::new(width.max(1), height.max(1))
}

/// Current viewport configuration: window, pixel ratio, buffer and the two rectangles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    /// Window size in physical pixels (the canvas size).
    pub window: BufferSize,
    pub device_pixel_ratio: f64,
    pub buffer: BufferSize,
    /// Size the presentation surface is configured at.
    pub surface: BufferSize,
    /// Full resolution rectangle.
    pub main: Rect,
    /// Small inset used for the main camera while the dev camera is active.
    pub debug: Rect,
}

impl ViewportState {
    /// Compute the viewport for a physical window size.
    ///
    /// The window is first brought back to CSS pixels, multiplied by the tier's pixel
    /// ratio, and then fitted into the tier's buffer budget.
    pub fn compute(
        window_width: u32,
        window_height: u32,
        device_pixel_ratio: f64,
        graphics: &GraphicsConfig,
        full_resolution: bool,
        preview_scale: f32,
    ) -> Self {
        let device_pixel_ratio = if device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        let ratio = graphics.pixel_ratio(device_pixel_ratio) / device_pixel_ratio;
        let requested_width = (window_width as f64 * ratio).floor() as u32;
        let requested_height = (window_height as f64 * ratio).floor() as u32;
        let buffer = resolve_buffer_size(
            requested_width,
            requested_height,
            graphics.max_buffer_area(),
            full_resolution,
        );
        let window = BufferSize::new(window_width.max(1), window_height.max(1));
        Self {
            window,
            device_pixel_ratio,
            buffer,
            surface: if SURFACE_FOLLOWS_WINDOW { window } else { buffer },
            main: Rect::from_size(buffer),
            debug: Rect::from_size(buffer.scaled(preview_scale)),
        }
    }

    /// Map a rectangle in render buffer pixels onto the surface.
    pub fn to_surface(&self, rect: Rect) -> Rect {
        let sx = self.surface.width as f64 / self.buffer.width.max(1) as f64;
        let sy = self.surface.height as f64 / self.buffer.height.max(1) as f64;
        Rect {
            x: (rect.x as f64 * sx).round() as u32,
            y: (rect.y as f64 * sy).round() as u32,
            width: ((rect.width as f64 * sx).round() as u32).max(1),
            height: ((rect.height as f64 * sy).round() as u32).max(1),
        }
    }
}
