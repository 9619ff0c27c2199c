//! Texture image loading for material export.
//!
//! The exporters embed texture images referenced by materials, so this
//! module deals in *encoded* bytes (PNG/JPEG as stored on disk) plus their
//! MIME type, not decoded pixels. Images are cached per path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::material::MimeType;

/// Errors that can occur during texture loading.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("unsupported texture format: {0}")]
    UnsupportedFormat(String),
}

pub type TextureResult<T> = Result<T, TextureError>;

/// An encoded texture image ready for embedding.
#[derive(Clone, Debug)]
pub struct TextureData {
    /// Encoded file bytes (PNG or JPEG)
    pub bytes: Vec<u8>,

    /// Detected MIME type
    pub mime_type: MimeType,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Original file path (for external references)
    pub path: String,
}

impl TextureData {
    /// Size of the encoded payload in bytes.
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// Sniff the MIME type from file magic bytes.
pub fn sniff_mime_type(bytes: &[u8]) -> Option<MimeType> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(MimeType::Png)
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(MimeType::Jpeg)
    } else {
        None
    }
}

/// Cache for loaded texture images.
#[derive(Default)]
pub struct TextureCache {
    textures: HashMap<String, Arc<TextureData>>,

    /// Base directory for resolving relative paths
    base_dir: Option<PathBuf>,
}

impl TextureCache {
    /// Create a new empty texture cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a texture cache with a base directory for relative paths.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            textures: HashMap::new(),
            base_dir: Some(base_dir.into()),
        }
    }

    /// Load a texture from file, using the cache if available.
    pub fn load(&mut self, path: &str) -> TextureResult<Arc<TextureData>> {
        if let Some(texture) = self.textures.get(path) {
            return Ok(texture.clone());
        }

        let full_path = self.resolve_path(path);
        let bytes = std::fs::read(&full_path)?;

        let mime_type = sniff_mime_type(&bytes)
            .ok_or_else(|| TextureError::UnsupportedFormat(path.to_string()))?;

        // Probe dimensions without keeping the decoded image around
        let (width, height) = image::load_from_memory(&bytes)
            .map(|img| (img.width(), img.height()))?;

        let texture = Arc::new(TextureData {
            bytes,
            mime_type,
            width,
            height,
            path: path.to_string(),
        });

        log::debug!(
            "loaded texture {} ({}x{}, {:.1} KB)",
            path,
            width,
            height,
            texture.size_bytes() as f32 / 1024.0
        );

        self.textures.insert(path.to_string(), texture.clone());
        Ok(texture)
    }

    /// Get a cached texture without loading.
    pub fn get(&self, path: &str) -> Option<Arc<TextureData>> {
        self.textures.get(path).cloned()
    }

    /// Number of cached textures.
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Resolve a path relative to the base directory.
    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);

        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(base) = &self.base_dir {
            base.join(path)
        } else {
            path.to_path_buf()
        }
    }
}
