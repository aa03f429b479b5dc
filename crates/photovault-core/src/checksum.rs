//! Content checksum
//!
//! The checksum is the identity key for dedup. Client and server must agree
//! byte for byte, so both sides call [`compute_checksum`].

use sha2::{Digest, Sha256};

use crate::domain::newtypes::Checksum;

/// Computes the SHA-256 checksum of `data` as 64 lowercase hex characters
pub fn compute_checksum(data: &[u8]) -> Checksum {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Checksum::from_digest(format!("{:x}", hasher.finalize()))
}
