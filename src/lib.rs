#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod api;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod storage;
pub mod telemetry;

use crate::api::ServiceContainer;
use crate::config::{Config, StorageBackend};
use crate::services::auth_service::AuthService;
use crate::services::conversation_service::ConversationService;
use crate::services::health_service::HealthService;
use crate::services::rate_limit_service::RateLimitService;
use crate::storage::Storage;
use std::sync::Arc;
use tokio::sync::watch;

/// Everything the two routers need, wired from one configuration.
#[derive(Debug)]
pub struct App {
    pub services: ServiceContainer,
    pub health_service: HealthService,
}

#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    storage: Option<Storage>,
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, storage: None }
    }

    #[must_use]
    pub fn with_storage(mut self, storage: Storage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Wires services on top of the configured storage.
    ///
    /// # Errors
    /// Returns an error if no storage was provided.
    pub fn build(self) -> anyhow::Result<App> {
        let storage = self.storage.ok_or_else(|| anyhow::anyhow!("storage is required"))?;

        let auth_service = AuthService::new(self.config.auth.clone(), Arc::clone(&storage.users));
        let conversation_service = ConversationService::new(
            Arc::clone(&storage.users),
            Arc::clone(&storage.conversations),
            self.config.messaging.clone(),
        );
        let rate_limit_service = RateLimitService::new(self.config.server.trusted_proxies.clone());
        let health_service = HealthService::new(storage.conversations);

        Ok(App { services: ServiceContainer { auth_service, conversation_service, rate_limit_service }, health_service })
    }
}

/// Opens the storage backend selected in `config`, running migrations for Postgres.
///
/// # Errors
/// Returns an error if the database URL is missing, the pool cannot connect, or migrations fail.
pub async fn connect_storage(config: &Config) -> anyhow::Result<Storage> {
    match config.database.backend {
        StorageBackend::Postgres => {
            let url = config
                .database
                .url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("BHROMON_DATABASE_URL is required for the postgres backend"))?;
            let pool = storage::init_pool(&config.database, url).await?;
            storage::run_migrations(&pool).await?;
            tracing::info!("Connected to postgres and applied migrations");
            Ok(Storage::postgres(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(Storage::memory())
        }
    }
}

/// Routes panics through `tracing` so they reach the structured log.
pub fn setup_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info.location().map(|l| format!("{}:{}", l.file(), l.line())).unwrap_or_default();
        tracing::error!(panic = %info, location = %location, "Panic occurred");
        default_hook(info);
    }));
}

/// Flips the shutdown channel on SIGINT or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => tracing::info!("Received ctrl-c, shutting down"),
            () = terminate => tracing::info!("Received SIGTERM, shutting down"),
        }

        let _ = shutdown_tx.send(true);
    });
}
