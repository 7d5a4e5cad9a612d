//! Model assets: glTF documents and Wavefront OBJ files.
//!
//! Both are kept in their parsed form after loading. Scenes turn them into scene graph
//! nodes with [`GltfModel::to_node`] / [`ObjModel::to_node`] while building content.

use std::io::{BufReader, Cursor};

use anyhow::Context;
use cgmath::{Quaternion, Vector3};

use crate::{
    data_structures::{
        geometry::{Geometry, Topology, Vertex},
        scene_graph::{Material, Mesh, Node, Transform},
    },
    resources::fetch::{Fetch, resolve_relative},
};

#[derive(Debug)]
pub struct GltfModel {
    pub document: gltf::Document,
    pub buffers: Vec<Vec<u8>>,
}

impl GltfModel {
    /// Parse a glTF/GLB file and fetch its external buffers relative to `src`.
    pub async fn load(fetcher: &dyn Fetch, src: &str, bytes: &[u8]) -> anyhow::Result<Self> {
        let gltf = gltf::Gltf::from_slice(bytes)?;
        let mut buffers = Vec::new();
        for buffer in gltf.buffers() {
            match buffer.source() {
                gltf::buffer::Source::Bin => {
                    let blob = gltf
                        .blob
                        .as_deref()
                        .context("binary glTF buffer without a GLB blob")?;
                    buffers.push(blob.to_vec());
                }
                gltf::buffer::Source::Uri(uri) => {
                    let path = resolve_relative(src, uri);
                    buffers.push(fetcher.fetch(&path).await?);
                }
            }
        }
        Ok(Self {
            document: gltf.document,
            buffers,
        })
    }

    /// Build a node tree from the default scene (or the first one).
    pub fn to_node(&self, name: &str, material: &Material) -> Node {
        let mut root = Node::new(name);
        let scene = self
            .document
            .default_scene()
            .or_else(|| self.document.scenes().next());
        if let Some(scene) = scene {
            for node in scene.nodes() {
                root.add_child(self.convert_node(node, material));
            }
        }
        root
    }

    fn convert_node(&self, node: gltf::Node, material: &Material) -> Node {
        let mut out = Node::new(node.name().unwrap_or("gltf node"));
        let (translation, [x, y, z, w], scale) = node.transform().decomposed();
        out.transform = Transform {
            position: translation.into(),
            rotation: Quaternion::new(w, x, y, z),
            scale: Vector3::from(scale),
        };
        if let Some(mesh) = node.mesh() {
            for primitive in mesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    log::warn!("skipping non-triangle primitive in {:?}", mesh.name());
                    continue;
                }
                if let Some(geometry) = self.read_primitive(&primitive, material.color) {
                    out.add_child(Node::with_mesh(
                        mesh.name().unwrap_or("gltf mesh"),
                        Mesh::new(geometry, material.clone()),
                    ));
                }
            }
        }
        for child in node.children() {
            out.add_child(self.convert_node(child, material));
        }
        out
    }

    fn read_primitive(&self, primitive: &gltf::Primitive, color: [f32; 3]) -> Option<Geometry> {
        let reader = primitive.reader(|buffer| self.buffers.get(buffer.index()).map(Vec::as_slice));
        let mut vertices: Vec<Vertex> = reader
            .read_positions()?
            .map(|position| Vertex::new(position, [0.0, 1.0, 0.0], color))
            .collect();
        if let Some(normals) = reader.read_normals() {
            for (vertex, normal) in vertices.iter_mut().zip(normals) {
                vertex.normal = normal;
            }
        }
        let indices = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..vertices.len() as u32).collect(),
        };
        Some(Geometry::new(vertices, indices, Topology::Triangles))
    }
}

#[derive(Debug)]
pub struct ObjModel {
    pub models: Vec<tobj::Model>,
    pub materials: Vec<tobj::Material>,
}

impl ObjModel {
    /// Parse an OBJ file. Referenced MTL files are fetched relative to `src`; a missing
    /// MTL only costs the material colours.
    pub async fn load(fetcher: &dyn Fetch, src: &str, bytes: &[u8]) -> anyhow::Result<Self> {
        let mut reader = BufReader::new(Cursor::new(bytes));
        let (models, materials) = tobj::load_obj_buf_async(
            &mut reader,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |p| {
                let path = resolve_relative(src, &p);
                async move {
                    match fetcher.fetch(&path).await {
                        Ok(mtl) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mtl))),
                        Err(e) => {
                            log::warn!("material {path} could not be loaded: {e:#}");
                            Err(tobj::LoadError::OpenFileFailed)
                        }
                    }
                }
            },
        )
        .await?;
        let materials = materials.unwrap_or_else(|e| {
            log::warn!("{src} has no usable materials: {e}");
            Vec::new()
        });
        Ok(Self { models, materials })
    }

    pub fn to_node(&self, name: &str, material: &Material) -> Node {
        let mut root = Node::new(name);
        for model in &self.models {
            let color = model
                .mesh
                .material_id
                .and_then(|id| self.materials.get(id))
                .and_then(|m| m.diffuse)
                .unwrap_or(material.color);
            let geometry = Self::read_mesh(&model.mesh, color);
            root.add_child(Node::with_mesh(&model.name, Mesh::new(geometry, material.clone())));
        }
        root
    }

    fn read_mesh(mesh: &tobj::Mesh, color: [f32; 3]) -> Geometry {
        let vertices = (0..mesh.positions.len() / 3)
            .map(|i| {
                Vertex::new(
                    [
                        mesh.positions[i * 3],
                        mesh.positions[i * 3 + 1],
                        mesh.positions[i * 3 + 2],
                    ],
                    [
                        mesh.normals.get(i * 3).map_or(0.0, |f| *f),
                        mesh.normals.get(i * 3 + 1).map_or(1.0, |f| *f),
                        mesh.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
                    ],
                    color,
                )
            })
            .collect();
        Geometry::new(vertices, mesh.indices.clone(), Topology::Triangles)
    }
}
