//! Web server for filedepot.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::config::Config;
use crate::db::Database;
use crate::file::ContentStore;
use crate::{DepotError, Result};

use super::handlers::AppState;
use super::middleware::IpRateLimitState;
use super::router::{create_health_router, create_router, create_swagger_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Per-IP limiter state.
    ip_limit: Arc<IpRateLimitState>,
    /// CORS origins.
    cors_origins: Vec<String>,
}

impl WebServer {
    /// Build a web server from configuration and an opened database.
    ///
    /// Initializes blob storage and seeds the bootstrap key when configured.
    pub async fn build(config: &Config, db: Database) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| DepotError::Config(format!("invalid server address: {e}")))?;

        let store = ContentStore::new(&config.storage.path)?;
        tracing::info!("Blob storage initialized at: {}", config.storage.path);

        let app_state = Arc::new(AppState::new(db, store, config));

        if let (Some(account), Some(key)) =
            (&config.api.bootstrap_account, &config.api.bootstrap_key)
        {
            app_state.keys.ensure_bootstrap_key(account, key).await?;
        }

        let ip_limit = Arc::new(IpRateLimitState::new(config.ip_limit.requests_per_minute));

        Ok(Self {
            addr,
            app_state,
            ip_limit,
            cors_origins: config.server.cors_origins.clone(),
        })
    }

    /// Get the configured server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the hourly usage-eviction background task.
    ///
    /// Inline eviction keeps active keys bounded; this sweep catches usage
    /// rows left behind by keys that went idle.
    fn start_usage_eviction_task(state: Arc<AppState>) {
        tokio::spawn(async move {
            const EVICTION_INTERVAL_SECS: u64 = 3600;

            let mut interval = tokio::time::interval(Duration::from_secs(EVICTION_INTERVAL_SECS));

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;

                match state.keys.limiter().evict_expired().await {
                    Ok(count) => {
                        if count > 0 {
                            tracing::info!(evicted = count, "Evicted aged-out usage events");
                        } else {
                            tracing::debug!("No aged-out usage events to evict");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to evict usage events");
                    }
                }
            }
        });
    }

    fn build_router(&self) -> Router {
        create_router(self.app_state.clone(), self.ip_limit.clone(), &self.cors_origins)
            .merge(create_health_router())
            .merge(create_swagger_router())
            .layer(CompressionLayer::new())
    }

    /// Run the web server.
    pub async fn run(self) -> std::result::Result<(), std::io::Error> {
        let router = self.build_router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_usage_eviction_task(self.app_state.clone());
        self.ip_limit.clone().start_cleanup_task();

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::result::Result<SocketAddr, std::io::Error> {
        let router = self.build_router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_usage_eviction_task(self.app_state.clone());
        self.ip_limit.clone().start_cleanup_task();

        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
