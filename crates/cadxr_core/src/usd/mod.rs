//! USD (Universal Scene Description) support for cadxr.
//!
//! This module reads and writes USDA (ASCII) stages:
//!
//! - `Xform`/`Scope`: transform hierarchies with xformOps
//! - `Mesh`: points, face counts/indices, normals, `primvars:st`
//! - `Material`/`Shader`: UsdPreviewSurface parameters and
//!   `material:binding` relationships
//!
//! Not supported: binary `.usdc`, references/payloads, point instancers,
//! lights, cameras, animation.
//!
//! # Example
//!
//! ```ignore
//! use cadxr_core::usd::{load_usda, write_usda};
//!
//! let scene = load_usda("scene.usda")?;
//! write_usda(&scene, "copy.usda")?;
//! ```

mod types;
mod parser;
mod loader;
mod writer;

pub use types::*;
pub use parser::*;
pub use loader::*;
pub use writer::*;
