//! JSON encoding of snapshot documents.

use crate::archival::domain::BoardSnapshot;
use sha2::{Digest, Sha256};

/// An encoded snapshot ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSnapshot {
    /// Indented UTF-8 JSON.
    pub bytes: Vec<u8>,
    /// Lowercase hex SHA-256 of `bytes`.
    pub digest: String,
}

/// Serializes a snapshot as indented JSON and computes its digest.
///
/// # Errors
///
/// Returns the serializer error when the document cannot be written.
pub fn encode_snapshot(snapshot: &BoardSnapshot) -> Result<EncodedSnapshot, serde_json::Error> {
    let bytes = serde_json::to_vec_pretty(snapshot)?;
    let digest = digest_hex(&bytes);
    Ok(EncodedSnapshot { bytes, digest })
}

/// Parses a snapshot document.
///
/// Unknown fields are ignored; missing required fields are errors.
///
/// # Errors
///
/// Returns the parser error when the bytes are not a valid snapshot.
pub fn decode_snapshot(bytes: &[u8]) -> Result<BoardSnapshot, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Returns the lowercase hex SHA-256 digest of `bytes`.
#[must_use]
pub fn digest_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
