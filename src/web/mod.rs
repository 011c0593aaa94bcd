//! Web API module for filedepot.
//!
//! The request gateway: authenticates every call via API key, applies rate
//! limiting, and dispatches to the file, folder, and key services. It holds
//! no business state and is safe to run in multiple instances against the
//! same database and blob store.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
