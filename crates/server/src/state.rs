//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::query::ResultAssembler;
use crate::services::{EmailService, Geocoder, TokenService};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// PostgreSQL connection pool.
    db: PgPool,

    /// Query engine executor for list endpoints.
    assembler: ResultAssembler,

    /// JWT signing/verification.
    tokens: TokenService,

    /// Forward-geocoding client.
    geocoder: Geocoder,

    /// Email delivery (available when SMTP_HOST is configured).
    email: Option<Arc<EmailService>>,
}

impl AppState {
    /// Create new application state with database connections.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        db::run_migrations(&db)
            .await
            .context("failed to run migrations")?;

        let assembler = ResultAssembler::new(db.clone());

        let tokens = TokenService::new(config.jwt_secret.as_bytes(), config.jwt_lifetime_days);

        let geocoder = Geocoder::new(&config.geocoder_url, config.geocoder_api_key.clone())
            .context("failed to create geocoder")?;

        // Email is optional: without SMTP_HOST the forgot-password flow
        // still records tokens but sends nothing.
        let email = config.smtp_host.as_ref().and_then(|host| {
            match EmailService::new(
                host,
                config.smtp_port,
                config.smtp_username.as_deref(),
                config.smtp_password.as_deref(),
                &config.smtp_encryption,
                config.smtp_from_email.clone(),
                config.site_url.clone(),
            ) {
                Ok(svc) => {
                    info!(host = %host, port = config.smtp_port, "SMTP email service configured");
                    Some(Arc::new(svc))
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to initialize email service");
                    None
                }
            }
        });

        Ok(Self {
            inner: Arc::new(AppStateInner {
                db,
                assembler,
                tokens,
                geocoder,
                email,
            }),
        })
    }

    /// Get the database pool.
    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    /// Get the query engine executor.
    pub fn assembler(&self) -> &ResultAssembler {
        &self.inner.assembler
    }

    /// Get the token service.
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Get the geocoder.
    pub fn geocoder(&self) -> &Geocoder {
        &self.inner.geocoder
    }

    /// Get the email service (if SMTP is configured).
    pub fn email(&self) -> Option<&Arc<EmailService>> {
        self.inner.email.as_ref()
    }

    /// Check if PostgreSQL is healthy.
    pub async fn postgres_healthy(&self) -> bool {
        db::check_health(&self.inner.db).await
    }
}
