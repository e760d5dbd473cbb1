//! Procedural meshes for decorations and placeholders.

use glam::Vec3;

use crate::node::{Material, MeshShape, ModelTemplate};

/// Name given to the selection indicator node.
pub const SELECTION_BOX_NAME: &str = "selectionBox";

/// Name given to the placeholder plant root.
pub const PLACEHOLDER_NAME: &str = "placeholderPlant";

const TRUNK_SIZE: Vec3 = Vec3::new(0.05, 0.2, 0.05);
const TRUNK_HEIGHT: f32 = 0.1;
const FOLIAGE_RADIUS: f32 = 0.08;
const FOLIAGE_HEIGHT: f32 = 0.22;

const BROWN: Material = Material::simple(0.45, 0.29, 0.14);
const GREEN: Material = Material::simple(0.20, 0.62, 0.24);
const SELECTION_BLUE: Material = Material::unlit(0.0, 0.48, 1.0, 0.3);

/// Box mesh template.
#[must_use]
pub fn box_mesh(name: &str, size: Vec3, material: Material) -> ModelTemplate {
    ModelTemplate::mesh(name, MeshShape::Box { size }, material)
}

/// Sphere mesh template.
#[must_use]
pub fn sphere(name: &str, radius: f32, material: Material) -> ModelTemplate {
    ModelTemplate::mesh(name, MeshShape::Sphere { radius }, material)
}

/// Stand-in plant shown whenever the real model cannot be loaded: a brown box
/// trunk under a green sphere of foliage, grouped under one root.
#[must_use]
pub fn placeholder_plant() -> ModelTemplate {
    ModelTemplate::group(
        PLACEHOLDER_NAME,
        vec![
            box_mesh("trunk", TRUNK_SIZE, BROWN).at(Vec3::new(0.0, TRUNK_HEIGHT, 0.0)),
            sphere("foliage", FOLIAGE_RADIUS, GREEN).at(Vec3::new(0.0, FOLIAGE_HEIGHT, 0.0)),
        ],
    )
}

/// Translucent selection indicator with the given local edge lengths.
#[must_use]
pub fn selection_box(size: Vec3) -> ModelTemplate {
    box_mesh(SELECTION_BOX_NAME, size, SELECTION_BLUE)
}
