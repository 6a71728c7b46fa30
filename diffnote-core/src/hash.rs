//! Content hashing for patch deduplication.

use sha2::{Digest, Sha256};

/// Returns the lowercase hex SHA-256 of `content`.
///
/// Only used for equality testing of diff snapshots within one review, so the
/// exact algorithm is not part of any external contract.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_hashes_identically() {
        assert_eq!(content_hash("diff --git a/x b/x\n"), content_hash("diff --git a/x b/x\n"));
    }

    #[test]
    fn distinct_content_hashes_differently() {
        assert_ne!(content_hash("+a\n"), content_hash("+b\n"));
        assert_eq!(content_hash("").len(), 64);
    }
}
