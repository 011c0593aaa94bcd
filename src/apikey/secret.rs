//! API key secret generation and derivation.
//!
//! The raw secret is revealed exactly once at issuance; only its SHA-256
//! digest is ever stored. Lookup happens by digest, which is why the
//! derivation is an unsalted hash: the secret itself carries 192 bits of
//! entropy, and a salted scheme could not be indexed.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Prefix on every raw secret, so keys are recognizable in configs and logs
/// that should not contain them.
pub const SECRET_PREFIX: &str = "fd_";

/// Number of random bytes in a secret.
const SECRET_BYTES: usize = 24;

/// Generate a new raw API key secret: `fd_` followed by 48 hex chars.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rng().fill_bytes(&mut bytes);

    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("{SECRET_PREFIX}{hex}")
}

/// Derive the stored digest for a raw secret: lowercase hex SHA-256.
pub fn derive_digest(raw_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_secret.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
