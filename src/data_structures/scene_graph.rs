//! Scene graph and hierarchical scene organization.
//!
//! A scene is a tree of [`Node`]s. Nodes carry a local [`Transform`], a visibility flag
//! and optionally a [`Mesh`]. Meshes keep their geometry on the CPU and are uploaded to
//! the GPU lazily the first time they are drawn, so building a scene needs no device.
//! Tearing a scene down walks the tree and releases every uploaded buffer exactly once.

use std::cell::OnceCell;

use cgmath::{InnerSpace, Matrix4, One, Point3, Quaternion, Transform as _, Vector3};

use crate::{
    camera::Frustum,
    data_structures::geometry::{Geometry, Topology},
};

/// Local transformation: position, rotation (as quaternion) and scale.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    /// Identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Tint multiplied with the vertex colours.
    pub color: [f32; 3],
    pub opacity: f32,
    /// Blend with what is behind instead of writing opaque pixels.
    pub transparent: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            opacity: 1.0,
            transparent: false,
        }
    }
}

/// Per-mesh uniform: world matrix and material tint.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshUniform {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl MeshUniform {
    pub fn new(world: &Matrix4<f32>, material: &Material) -> Self {
        let [r, g, b] = material.color;
        Self {
            model: (*world).into(),
            color: [r, g, b, material.opacity],
        }
    }
}

/// Something holding GPU memory that has to be given back explicitly.
pub trait GpuResource {
    fn release(&mut self);
}

/// The uploaded part of a mesh.
#[derive(Debug)]
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl GpuResource for GpuMesh {
    fn release(&mut self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
        self.uniform_buffer.destroy();
    }
}

#[derive(Debug)]
pub struct Mesh {
    pub geometry: Geometry,
    pub material: Material,
    bounds: (Point3<f32>, f32),
    gpu: OnceCell<GpuMesh>,
    disposed: bool,
}

impl Mesh {
    pub fn new(geometry: Geometry, material: Material) -> Self {
        let bounds = geometry.bounding_sphere();
        Self {
            geometry,
            material,
            bounds,
            gpu: OnceCell::new(),
            disposed: false,
        }
    }

    pub fn topology(&self) -> Topology {
        self.geometry.topology
    }

    /// Local space bounding sphere.
    pub fn bounds(&self) -> (Point3<f32>, f32) {
        self.bounds
    }

    pub fn gpu(&self) -> Option<&GpuMesh> {
        self.gpu.get()
    }

    /// Upload on first use. Later calls return the existing buffers.
    pub fn gpu_or_upload(&self, upload: impl FnOnce(&Geometry) -> GpuMesh) -> &GpuMesh {
        self.gpu.get_or_init(|| upload(&self.geometry))
    }

    pub fn is_uploaded(&self) -> bool {
        self.gpu.get().is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Release the GPU side. Returns false when the mesh was already disposed.
    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        if let Some(mut gpu) = self.gpu.take() {
            gpu.release();
        }
        self.disposed = true;
        true
    }
}

/// What a traversal includes.
#[derive(Debug, Clone, Copy)]
pub enum Culling {
    /// Skip hidden subtrees and meshes outside the frustum.
    Frustum(Frustum),
    /// Everything, hidden or not. Used to pre-warm a scene.
    Disabled,
}

/// A mesh with its world matrix, ready to be drawn.
pub struct DrawItem<'a> {
    pub mesh: &'a Mesh,
    pub world: Matrix4<f32>,
}

#[derive(Debug)]
pub struct Node {
    pub name: String,
    pub visible: bool,
    /// Whether the node may be skipped when outside the camera frustum.
    pub frustum_culled: bool,
    pub transform: Transform,
    pub mesh: Option<Mesh>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            frustum_culled: true,
            transform: Transform::new(),
            mesh: None,
            children: Vec::new(),
        }
    }

    pub fn with_mesh(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            mesh: Some(mesh),
            ..Self::new(name)
        }
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Depth-first search by name.
    pub fn find(&self, name: &str) -> Option<&Node> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Node> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(name))
    }

    /// Detach the first child with the given name.
    pub fn remove_child(&mut self, name: &str) -> Option<Node> {
        let index = self.children.iter().position(|child| child.name == name)?;
        Some(self.children.remove(index))
    }

    /// Flatten the tree into the meshes that should be drawn.
    pub fn draw_list(&self, culling: &Culling) -> Vec<DrawItem<'_>> {
        let mut items = Vec::new();
        self.collect(&Matrix4::one(), culling, &mut items);
        items
    }

    fn collect<'a>(&'a self, parent: &Matrix4<f32>, culling: &Culling, items: &mut Vec<DrawItem<'a>>) {
        if !self.visible && matches!(culling, Culling::Frustum(_)) {
            return;
        }
        let world = *parent * self.transform.to_matrix();
        if let Some(mesh) = &self.mesh {
            let in_view = match culling {
                Culling::Frustum(frustum) if self.frustum_culled => {
                    let (center, radius) = mesh.bounds();
                    let center = world.transform_point(center);
                    // Largest axis scale of the accumulated transform, parents included.
                    let scale = world
                        .x
                        .truncate()
                        .magnitude()
                        .max(world.y.truncate().magnitude())
                        .max(world.z.truncate().magnitude());
                    frustum.intersects_sphere(center, radius * scale)
                }
                _ => true,
            };
            if in_view && !mesh.is_disposed() {
                items.push(DrawItem { mesh, world });
            }
        }
        for child in &self.children {
            child.collect(&world, culling, items);
        }
    }

    /// Release every mesh in this subtree. Returns how many meshes were disposed.
    pub fn dispose(&mut self) -> usize {
        let own = self.mesh.as_mut().map_or(0, |mesh| mesh.dispose() as usize);
        own + self.children.iter_mut().map(Node::dispose).sum::<usize>()
    }

    pub fn mesh_count(&self) -> usize {
        self.mesh.is_some() as usize + self.children.iter().map(Node::mesh_count).sum::<usize>()
    }
}
