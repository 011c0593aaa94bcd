//! filedepot - content-addressable file store with folder hierarchy and
//! API-key access control.
//!
//! The service persists file bytes keyed by content hash (deduplicating
//! identical payloads per account), catalogs file metadata with searchable
//! paginated listing, maintains a folder forest with materialized paths,
//! and gates every request behind per-account API keys with rolling-hour
//! rate limits.

pub mod apikey;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod rate_limit;
pub mod web;

pub use apikey::{ApiKeyService, AuthContext};
pub use config::Config;
pub use db::Database;
pub use error::{DepotError, Result};
pub use file::{ContentStore, FileService, FolderService};
pub use rate_limit::{RateLimitResult, RollingWindowLimiter};
pub use web::WebServer;
