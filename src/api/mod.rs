//! Read-only HTTP surface over the clinic collections, plus bulk loading.
//!
//! `clinic_router()` returns a composable `Router`; `serve()` binds it and
//! runs until Ctrl-C.

pub mod endpoints;
pub mod error;
pub mod router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::core_state::ClinicState;

pub use error::HttpError;
pub use router::clinic_router;

/// Bind `addr` and serve the API until the process receives Ctrl-C.
pub async fn serve(state: Arc<ClinicState>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!(addr = %local, "Clinic API server started");

    axum::serve(listener, clinic_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Clinic API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
