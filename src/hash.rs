use sha2::{Digest, Sha256};

/// Hex SHA-256 of a clipping body, used to index the exists-by-content check.
pub fn hash_content(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
