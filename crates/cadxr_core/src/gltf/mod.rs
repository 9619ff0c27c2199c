//! glTF 2.0 support for cadxr.
//!
//! Reading and writing the glTF interchange format:
//!
//! - `.glb` binary containers and `.gltf` JSON, with embedded or external
//!   buffers
//! - node hierarchies with matrix or TRS transforms
//! - triangle meshes (POSITION, NORMAL, TEXCOORD_0, indices)
//! - the full material schema including the KHR material extensions
//!
//! Not supported: animation, skinning, morph targets, Draco compression,
//! sparse accessors.

mod glb;
mod types;
mod exporter;
mod importer;

pub use exporter::*;
pub use glb::*;
pub use importer::*;
pub use types::*;
