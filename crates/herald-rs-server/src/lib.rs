//! HTTP surface for the Herald router.
//!
//! `POST /store_report_and_notify` submits one task and always answers with an
//! orchestration result; `GET /health` reports the active backend mode.

mod routes;

pub use routes::{HEALTH_PATH, SUBMIT_PATH, router, status_for};

use herald_rs_core::Orchestrator;
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("server task failed: {0}")]
    Join(String),
}

/// A running gateway server.
pub struct GatewayServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl GatewayServer {
    /// Bind the listener and start serving in the background.
    ///
    /// Port `0` picks a free port; read it back with [`addr`](Self::addr).
    pub async fn bind(addr: &str, orchestrator: Arc<Orchestrator>) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local = listener.local_addr().map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let app = router(orchestrator);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(err) = served {
                warn!("gateway server stopped with error: {err}");
            }
        });
        info!("gateway listening (addr={local})");
        Ok(Self {
            addr: local,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL for clients, e.g. `http://127.0.0.1:8000`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Signal graceful shutdown. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(sender) = self.shutdown.take() {
            let _ = sender.send(());
        }
    }

    /// Shut down and wait for in-flight requests to finish.
    pub async fn stop(mut self) -> Result<(), ServerError> {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .map_err(|err| ServerError::Join(err.to_string()))?;
        }
        info!("gateway stopped (addr={})", self.addr);
        Ok(())
    }
}

impl Drop for GatewayServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
