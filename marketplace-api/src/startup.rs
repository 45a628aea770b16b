//! Application startup and lifecycle management.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use marketplace_core::error::AppError;
use tokio::net::TcpListener;
use tokio::signal;

use crate::config::Config;
use crate::services::{MongoStore, PaymentGateway, StripeClient};
use crate::{build_router, AppState};

pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Connect to MongoDB, prepare indexes, settle any orphaned payments and bind.
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let store = MongoStore::connect(&config.database, &config.service_name).await?;
        store.init_indexes().await.map_err(AppError::DatabaseError)?;
        tracing::info!("Database initialized successfully");

        let stripe = StripeClient::new(config.stripe.clone())
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;
        if stripe.is_configured() {
            tracing::info!("Stripe client initialized");
        } else {
            tracing::warn!("Stripe secret key not configured - payment intents will fail");
        }
        let gateway: Arc<dyn PaymentGateway> = Arc::new(stripe);

        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid listen address: {}", e)))?;

        let state = AppState::new(config, Arc::new(store.clone()), gateway).with_database(store);

        match state.payments.reconcile().await {
            Ok(report) if report.failed > 0 => tracing::warn!(
                failed = report.failed,
                "Some payments are still missing booking settlement"
            ),
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Startup payment reconciliation failed"),
        }

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            router: build_router(state),
        })
    }

    pub fn port(&self) -> u16 {
        self.listener
            .local_addr()
            .map(|addr| addr.port())
            .unwrap_or_default()
    }

    pub async fn run_until_stopped(self) -> Result<(), AppError> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Service shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
