//! GLB binary container encoding and decoding.
//!
//! A GLB file is a 12-byte header followed by a JSON chunk and an optional
//! binary chunk. The JSON chunk is padded with spaces to a 4-byte boundary,
//! the binary chunk with zeros.

use thiserror::Error;

pub const GLB_MAGIC: u32 = 0x4654_6C67; // "glTF"
pub const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A; // "JSON"
const CHUNK_BIN: u32 = 0x004E_4942; // "BIN\0"

/// Errors from reading a GLB container.
#[derive(Error, Debug)]
pub enum GlbError {
    #[error("not a GLB file (bad magic)")]
    BadMagic,

    #[error("unsupported GLB version: {0}")]
    UnsupportedVersion(u32),

    #[error("truncated GLB data")]
    Truncated,

    #[error("GLB file has no JSON chunk")]
    MissingJsonChunk,
}

/// The chunks of a decoded GLB container.
pub struct GlbChunks {
    pub json: Vec<u8>,
    pub bin: Option<Vec<u8>>,
}

/// Check whether a byte slice starts with the GLB magic.
pub fn is_glb(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && read_u32(bytes, 0) == Some(GLB_MAGIC)
}

/// Encode JSON and binary payloads into a GLB container.
pub fn encode_glb(json: &[u8], bin: Option<&[u8]>) -> Vec<u8> {
    let json_padded = pad_len(json.len());
    let bin_padded = bin.map(|b| pad_len(b.len())).unwrap_or(0);
    let total = 12 + 8 + json_padded + if bin.is_some() { 8 + bin_padded } else { 0 };

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());

    out.extend_from_slice(&(json_padded as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(json);
    out.resize(out.len() + json_padded - json.len(), b' ');

    if let Some(bin) = bin {
        out.extend_from_slice(&(bin_padded as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(bin);
        out.resize(out.len() + bin_padded - bin.len(), 0);
    }

    out
}

/// Decode a GLB container into its JSON and binary chunks.
pub fn parse_glb(bytes: &[u8]) -> Result<GlbChunks, GlbError> {
    if bytes.len() < 12 {
        return Err(GlbError::Truncated);
    }
    if read_u32(bytes, 0) != Some(GLB_MAGIC) {
        return Err(GlbError::BadMagic);
    }
    let version = read_u32(bytes, 4).ok_or(GlbError::Truncated)?;
    if version != GLB_VERSION {
        return Err(GlbError::UnsupportedVersion(version));
    }

    let mut json = None;
    let mut bin = None;
    let mut offset = 12;
    while offset + 8 <= bytes.len() {
        let length = read_u32(bytes, offset).ok_or(GlbError::Truncated)? as usize;
        let kind = read_u32(bytes, offset + 4).ok_or(GlbError::Truncated)?;
        let start = offset + 8;
        let end = start.checked_add(length).ok_or(GlbError::Truncated)?;
        if end > bytes.len() {
            return Err(GlbError::Truncated);
        }

        match kind {
            CHUNK_JSON => json = Some(bytes[start..end].to_vec()),
            CHUNK_BIN => bin = Some(bytes[start..end].to_vec()),
            // Unknown chunk types are skipped per the GLB spec
            _ => {}
        }
        offset = end;
    }

    Ok(GlbChunks {
        json: json.ok_or(GlbError::MissingJsonChunk)?,
        bin,
    })
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn pad_len(len: usize) -> usize {
    (len + 3) & !3
}
