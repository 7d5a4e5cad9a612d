//! Engine data structures: geometry, scene graphs and textures.
//!
//! - `geometry` holds CPU vertex/index data and the procedural shapes
//! - `scene_graph` enables hierarchical scene organization and disposal
//! - `texture` contains the GPU texture wrapper and creation utilities

pub mod geometry;
pub mod scene_graph;
pub mod texture;
