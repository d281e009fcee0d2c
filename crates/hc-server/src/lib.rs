//! hc-server: live HLS muxer, frame feeder and HTTP server.
//!
//! This crate ties the media building blocks of `hc-media` into a running
//! service. It provides:
//!
//! - [`muxer::Muxer`], which writes segments and playlists to disk
//! - a placeholder frame feeder driving the muxer
//! - an Axum server exposing the output under `/hls` with blocking
//!   playlist reload
//! - graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod feeder;
pub mod muxer;
pub mod router;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use hc_core::config::Config;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;
use crate::muxer::{Muxer, MULTIVARIANT_PLAYLIST};

/// Start the muxer, the feeder and the HTTP server.
///
/// Returns after a shutdown signal once the feeder has stopped, the server
/// has drained and the muxer has been closed.
pub async fn start(config: Config) -> hc_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let muxer = Arc::new(Muxer::new(config.muxer.clone())?);
    // The feeder may only see the muxer after it accepts writes.
    muxer.start()?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| hc_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| hc_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    let cancel = CancellationToken::new();
    let app = router::build_router(AppContext::new(muxer.clone()));

    tracing::info!("Serving HLS on http://{addr}/hls/{MULTIVARIANT_PLAYLIST}");

    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(async move {
        let shutdown = server_cancel.clone();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;
        if let Err(ref e) = result {
            tracing::error!("HTTP server failed: {e}");
        }
        // Bring the rest of the process down with the server.
        server_cancel.cancel();
        result
    });

    let feeder_handle = if config.feeder.enabled {
        let feeder_muxer = muxer.clone();
        let feeder_cancel = cancel.clone();
        let feeder_config = config.feeder.clone();
        Some(tokio::spawn(async move {
            feeder::run_feeder(feeder_muxer, feeder_config, feeder_cancel).await;
        }))
    } else {
        tracing::info!("Feeder disabled");
        None
    };

    shutdown_signal(cancel.clone()).await;
    cancel.cancel();

    if let Some(handle) = feeder_handle {
        if let Err(e) = handle.await {
            tracing::warn!("Feeder task ended abnormally: {e}");
        }
    }
    if let Err(e) = server_handle.await {
        tracing::warn!("Server task ended abnormally: {e}");
    }

    let closer = muxer.clone();
    tokio::task::spawn_blocking(move || closer.close())
        .await
        .map_err(|e| hc_core::Error::Internal(format!("Muxer close task failed: {e}")))??;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM) or cancellation.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
