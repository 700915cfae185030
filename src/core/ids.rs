//! Content hashing utilities.
//!
//! Every identity in this pipeline (file content hash, function code hash,
//! snippet hash, cache key) is a lowercase hex SHA-256 digest. Using one
//! hash function everywhere keeps cache keys and identity strings directly
//! comparable across pipeline stages.

use sha2::{Digest, Sha256};

/// SHA-256 of raw bytes as a lowercase hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 of UTF-8 text as a lowercase hex string.
pub fn hash_text(text: &str) -> String {
    hash_bytes(text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_text("hello"), hash_text("hello"));
        assert_ne!(hash_text("hello"), hash_text("world"));
    }

    #[test]
    fn matches_known_sha256() {
        // echo -n "" | sha256sum
        assert_eq!(
            hash_text(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
