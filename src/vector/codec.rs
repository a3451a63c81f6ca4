//! Embedding and content-hash encodings used by the store file
//!
//! Embeddings are stored as base64 (standard alphabet, padded) of the packed
//! little-endian `f32` values. Content hashes are lowercase hex SHA-256.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload of {0} bytes is not a whole number of f32 values")]
    Length(usize),
}

/// Pack an embedding as base64 of little-endian f32 bytes
pub fn encode_embedding(embedding: &[f32]) -> String {
    let bytes: Vec<u8> = embedding.iter().flat_map(|v| v.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}

/// Inverse of [`encode_embedding`]
pub fn decode_embedding(encoded: &str) -> Result<Vec<f32>, CodecError> {
    let bytes = STANDARD.decode(encoded.trim())?;
    if bytes.len() % 4 != 0 {
        return Err(CodecError::Length(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Digest of the text an embedding was computed from
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}
