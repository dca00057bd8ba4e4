//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::warn;

use crate::config::AppConfig;
use crate::services::catalog::{CatalogClient, CatalogError};
use crate::services::email::Mailer;
use crate::services::token::TokenService;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; every collaborator the handlers need
/// (pool, token service, catalog client, mailer, pricing) is injected
/// here at startup.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    tokens: TokenService,
    catalog: CatalogClient,
    mailer: Option<Mailer>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// A broken SMTP configuration downgrades to no mailer with a
    /// warning instead of refusing to start; verification links are
    /// still persisted server-side.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog HTTP client cannot be built.
    pub fn new(config: AppConfig, pool: PgPool) -> Result<Self, CatalogError> {
        let tokens = TokenService::new(&config.jwt_secret);
        let catalog = CatalogClient::new(config.catalog.clone())?;
        let mailer = match &config.email {
            Some(email_config) => match Mailer::new(email_config) {
                Ok(mailer) => Some(mailer),
                Err(e) => {
                    warn!(error = %e, "SMTP configuration rejected, email disabled");
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                catalog,
                mailer,
            }),
        })
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Get a reference to the catalog client.
    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    /// Get the mailer, if SMTP is configured.
    #[must_use]
    pub fn mailer(&self) -> Option<&Mailer> {
        self.inner.mailer.as_ref()
    }
}
