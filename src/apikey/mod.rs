//! API key issuance, authorization, and revocation.

mod repository;
mod secret;
mod service;

pub use repository::{ApiKeyRecord, ApiKeyRepository, KeyStats, NewApiKey};
pub use secret::{derive_digest, generate_secret, SECRET_PREFIX};
pub use service::{ApiKeyService, AuthContext};

/// Maximum length of a key's human-readable name.
pub const MAX_KEY_NAME_LENGTH: usize = 100;
