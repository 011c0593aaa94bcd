//! Test helpers for Web API integration tests.

use std::sync::Arc;

use axum_test::TestServer;
use tempfile::TempDir;

use filedepot::config::Config;
use filedepot::web::handlers::AppState;
use filedepot::web::middleware::IpRateLimitState;
use filedepot::web::router::{create_health_router, create_router};
use filedepot::{ContentStore, Database};

/// A running test server together with the state behind it.
pub struct TestContext {
    pub server: TestServer,
    pub state: Arc<AppState>,
    // Blob storage lives for as long as the context
    _storage_dir: TempDir,
}

/// Create a test server with an in-memory database and tempdir storage.
pub async fn create_test_server() -> TestContext {
    create_test_server_with(Config::default()).await
}

/// Create a test server with a customized configuration.
pub async fn create_test_server_with(config: Config) -> TestContext {
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");

    let storage_dir = TempDir::new().expect("Failed to create storage dir");
    let store = ContentStore::new(storage_dir.path()).expect("Failed to create content store");

    let state = Arc::new(AppState::new(db, store, &config));

    // High per-IP allowance so only the per-key quota matters in tests
    let ip_limit = Arc::new(IpRateLimitState::new(1_000_000));

    let router = create_router(state.clone(), ip_limit, &[]).merge(create_health_router());
    let server = TestServer::new(router).expect("Failed to create test server");

    TestContext {
        server,
        state,
        _storage_dir: storage_dir,
    }
}

/// Issue an API key for the given account and return its raw secret.
pub async fn issue_key(ctx: &TestContext, account: &str) -> String {
    let (_, secret) = ctx
        .state
        .keys
        .issue(account, "test", Some(100_000), None)
        .await
        .expect("Failed to issue test key");
    secret
}

/// Issue an API key with a specific rate limit, returning (id, secret).
pub async fn issue_key_with_limit(
    ctx: &TestContext,
    account: &str,
    rate_limit: u32,
) -> (String, String) {
    let (record, secret) = ctx
        .state
        .keys
        .issue(account, "limited", Some(rate_limit), None)
        .await
        .expect("Failed to issue test key");
    (record.id, secret)
}
