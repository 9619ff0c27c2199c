//! cadxr core - scene graph and interchange formats for CAD/XR workflows.
//!
//! This crate provides:
//!
//! - **Scene graph types**: `Scene`, `Node`, `Mesh`, `Material`
//! - **Materials**: full glTF 2.0 material model with KHR extensions
//! - **USD support**: USDA writing and parsing
//! - **glTF support**: `.gltf`/`.glb` export and import
//!
//! # Example
//!
//! ```ignore
//! use cadxr_core::{Scene, Mesh};
//! use cadxr_core::gltf::export_gltf;
//!
//! let mut scene = Scene::new("demo");
//! let world = scene.add_layer("world", None)?;
//! scene.add_mesh_node("element", Some("world"), mesh, None)?;
//! export_gltf(&scene, "demo.glb", true)?;
//! ```

pub mod gltf;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod texture;
pub mod usd;

// Re-export commonly used types
pub use material::{AlphaMode, Material, PbrMetallicRoughness};
pub use mesh::Mesh;
pub use scene::{Node, NodeId, Scene, SceneError};
