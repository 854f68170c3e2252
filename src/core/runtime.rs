//! Main runtime orchestration.
//!
//! The runtime coordinates component lifecycle:
//! - Start order: storage engine → HTTP listener
//! - Shutdown order: HTTP listener → storage engine
//!
//! Shutdown is signal-driven: Ctrl-C or a component calling
//! [`Runtime::shutdown`] flips a watch channel that drains the HTTP server
//! and stops every partition.

use crate::core::config::Config;
use crate::engine::Engine;
use crate::http::{self, AppState};
use anyhow::{Context, Result};
use std::future::IntoFuture;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Stratum runtime holding all component handles.
pub struct Runtime {
    /// Configuration.
    config: Arc<Config>,

    /// Storage engine (present while running).
    engine: Option<Engine>,

    /// HTTP server task handle.
    http_handle: Option<JoinHandle<io::Result<()>>>,

    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,

    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
}

impl Runtime {
    /// Create a new runtime with the given configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate().context("invalid configuration")?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config: Arc::new(config),
            engine: None,
            http_handle: None,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Start the storage engine and the HTTP listener.
    pub async fn start(&mut self) -> Result<()> {
        tracing::info!(
            addr = %self.config.listen_addr(),
            data_dir = %self.config.storage.data_dir,
            "starting Stratum runtime"
        );

        let engine = Engine::start(&self.config).await?;

        let state = AppState::new(engine.router());
        let app = http::app(state);

        let addr = self.config.listen_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;

        let mut shutdown_rx = self.shutdown_rx.clone();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            while !*shutdown_rx.borrow() {
                if shutdown_rx.changed().await.is_err() {
                    break;
                }
            }
        });

        self.http_handle = Some(tokio::spawn(server.into_future()));
        self.engine = Some(engine);

        tracing::info!(addr = %addr, "HTTP listener started");
        tracing::info!("available endpoints:");
        tracing::info!("  GET    /api/v1/kv/keys/{{key}}     - get value for key");
        tracing::info!("  PUT    /api/v1/kv/keys/{{key}}     - set value for key");
        tracing::info!("  DELETE /api/v1/kv/keys/{{key}}     - delete key");
        tracing::info!("  GET    /api/v1/kv/keys            - list all keys");
        tracing::info!("  GET    /health                    - health check");
        tracing::info!("  GET    /stats                     - server statistics");

        Ok(())
    }

    /// Trigger graceful shutdown.
    pub fn shutdown(&self) {
        tracing::info!("shutdown requested");
        let _ = self.shutdown_tx.send(true);
    }

    /// Run the runtime until Ctrl-C or a shutdown request, then stop.
    pub async fn run(&mut self) -> Result<()> {
        self.start().await?;

        let mut shutdown_rx = self.shutdown_rx.clone();
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("shutdown signal received (SIGINT)");
            }
            _ = async {
                while !*shutdown_rx.borrow() {
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            } => {
                tracing::info!("shutdown requested by component");
            }
        }

        self.stop().await
    }

    /// Stop the HTTP listener, then the storage engine.
    pub async fn stop(&mut self) -> Result<()> {
        tracing::info!("stopping Stratum runtime");
        let _ = self.shutdown_tx.send(true);

        if let Some(handle) = self.http_handle.take() {
            match tokio::time::timeout(Duration::from_secs(5), handle).await {
                Ok(Ok(Ok(()))) => {
                    tracing::info!("HTTP server stopped");
                }
                Ok(Ok(Err(err))) => {
                    tracing::warn!(error = %err, "HTTP server stopped with error");
                }
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "HTTP server task panicked");
                }
                Err(_) => {
                    tracing::warn!("HTTP server stop timed out");
                }
            }
        }

        if let Some(mut engine) = self.engine.take() {
            engine.stop().await;
        }

        tracing::info!("Stratum runtime stopped");
        Ok(())
    }
}
