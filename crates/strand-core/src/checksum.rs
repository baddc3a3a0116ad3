//! Content checksums for deployment deduplication.
//!
//! A deployed resource is considered a duplicate of the latest persisted
//! version exactly when its content checksum matches. Checksums are
//! SHA-256, hex-encoded so they survive JSON record payloads unchanged.

use sha2::{Digest, Sha256};

/// Computes the hex-encoded SHA-256 checksum of a resource's content.
#[must_use]
pub fn resource_checksum(resource: &[u8]) -> String {
    hex::encode(Sha256::digest(resource))
}
