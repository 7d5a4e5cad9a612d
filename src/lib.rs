//! stage-ngin
//!
//! Scene lifecycle and rendering-pipeline orchestration for real-time wgpu experiences
//! running natively or in the browser (WebGL2). Independently constructed scenes are
//! loaded, pre-warmed, cross-faded and disposed by a single orchestrator, while a
//! double-buffered post-processing graph blends the outgoing and incoming scene and
//! applies the final screen pass.
//!
//! High-level modules
//! - `app`: winit host that owns the window, GPU context and drives the frame loop
//! - `app_state`: the tiny value type that gates the preloader -> content switch
//! - `camera`: perspective cameras, orbit controls and camera uniforms
//! - `context`: GPU and window context that owns device/queue/surface
//! - `data_structures`: scene graph, geometry and GPU textures
//! - `experience`: the top-level controller (boot preloader, react to app state)
//! - `graphics`: quality tiers and tier classification
//! - `gui`: debug panel sink
//! - `light`: ambient/directional lights and the light uniform
//! - `orchestrator`: the scene switch state machine and per-frame render driver
//! - `pipelines`: wgpu pipelines for scene drawing and the post passes
//! - `post_processing`: transition pass, final pass and the render target pool
//! - `render`: the render backend contract shared by the GPU renderer and tests
//! - `renderer`: the wgpu implementation of the render backend
//! - `resources`: asset descriptors, fetching, bounded-parallel loading and the manager
//! - `scene`: the scene lifecycle contract, the shared scene kit and the registry
//! - `scenes`: the built-in preloader, landing and empty scenes
//! - `settings`: immutable query-derived configuration
//! - `stats`: render statistics overlay (logged)
//! - `tween`: eased tweens and completion signals
//! - `viewport`: render buffer sizing and viewport rectangles
//!

pub mod app;
pub mod app_state;
pub mod camera;
pub mod context;
pub mod data_structures;
pub mod experience;
pub mod graphics;
pub mod gui;
pub mod light;
pub mod orchestrator;
pub mod pipelines;
pub mod post_processing;
pub mod render;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod scenes;
pub mod settings;
pub mod stats;
pub mod tween;
pub mod viewport;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use wgpu::Color;
pub use winit::event::WindowEvent;
