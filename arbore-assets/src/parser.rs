//! Model file parsing.
//!
//! Parsers turn a file on disk into a [`ModelTemplate`]. They are blocking
//! and run on the blocking thread pool. Format selection is by extension.

use std::collections::HashSet;
use std::path::Path;

use arbore_core::{Aabb, Material, MeshShape, ModelTemplate, NodeKind, Transform};
use glam::{Quat, Vec3};

use crate::error::{AssetError, AssetResult};

/// Deepest node hierarchy accepted from a model file.
const MAX_NODE_DEPTH: usize = 64;

/// Something that can read model files.
pub trait ModelParser: Send + Sync {
    /// Whether this parser handles the file at `path`.
    fn supports(&self, path: &Path) -> bool;

    /// Parse the file into a template.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unsupported, unreadable, malformed or
    /// has no meshes.
    fn parse(&self, path: &Path) -> AssetResult<ModelTemplate>;
}

/// glTF 2.0 parser for `.gltf` and `.glb` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct GltfParser;

impl GltfParser {
    fn convert_node(node: &gltf::Node<'_>, depth: usize) -> AssetResult<ModelTemplate> {
        if depth > MAX_NODE_DEPTH {
            return Err(AssetError::Parse(format!(
                "node hierarchy deeper than {MAX_NODE_DEPTH}"
            )));
        }
        let (translation, rotation, scale) = node.transform().decomposed();
        let children = node
            .children()
            .map(|child| Self::convert_node(&child, depth + 1))
            .collect::<AssetResult<Vec<_>>>()?;

        Ok(ModelTemplate {
            name: node
                .name()
                .map_or_else(|| format!("node_{}", node.index()), str::to_string),
            kind: node.mesh().map_or(NodeKind::Empty, |mesh| Self::convert_mesh(&mesh)),
            transform: Transform {
                position: Vec3::from(translation),
                rotation: Quat::from_array(rotation),
                scale: Vec3::from(scale),
            },
            children,
        })
    }

    fn convert_mesh(mesh: &gltf::Mesh<'_>) -> NodeKind {
        let mut bounds: Option<Aabb> = None;
        let mut vertex_count = 0;
        let mut materials = Vec::new();
        for primitive in mesh.primitives() {
            let bb = primitive.bounding_box();
            let b = Aabb::new(Vec3::from(bb.min), Vec3::from(bb.max));
            bounds = Some(bounds.map_or(b, |acc| acc.union(&b)));
            vertex_count += primitive
                .get(&gltf::Semantic::Positions)
                .map_or(0, |accessor| accessor.count());

            let pbr = primitive.material().pbr_metallic_roughness();
            materials.push(Material {
                color: pbr.base_color_factor(),
                unlit: false,
                metallic: pbr.metallic_factor() > 0.5,
            });
        }
        NodeKind::Model {
            mesh: MeshShape::Triangles {
                vertex_count,
                bounds: bounds.unwrap_or(Aabb::new(Vec3::ZERO, Vec3::ZERO)),
            },
            materials,
        }
    }
}

impl ModelParser for GltfParser {
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("gltf") || e.eq_ignore_ascii_case("glb"))
    }

    fn parse(&self, path: &Path) -> AssetResult<ModelTemplate> {
        if !self.supports(path) {
            return Err(AssetError::UnsupportedFormat(path.display().to_string()));
        }
        let (document, _buffers, _images) = gltf::import(path).map_err(|e| match e {
            gltf::Error::Io(io) => AssetError::Io(io),
            other => AssetError::Parse(other.to_string()),
        })?;

        let roots: Vec<gltf::Node<'_>> = match document.default_scene().or_else(|| document.scenes().next()) {
            Some(scene) => scene.nodes().collect(),
            None => {
                let children: HashSet<usize> = document
                    .nodes()
                    .flat_map(|n| n.children().map(|c| c.index()).collect::<Vec<_>>())
                    .collect();
                document.nodes().filter(|n| !children.contains(&n.index())).collect()
            }
        };

        let children = roots
            .iter()
            .map(|node| Self::convert_node(node, 0))
            .collect::<AssetResult<Vec<_>>>()?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("model")
            .to_string();
        let template = ModelTemplate::group(name, children);

        if !template.has_mesh() {
            return Err(AssetError::NoMesh(path.display().to_string()));
        }
        tracing::debug!(
            "Parsed {} ({} nodes)",
            path.display(),
            template.node_count()
        );
        Ok(template)
    }
}
