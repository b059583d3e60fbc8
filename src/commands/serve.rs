use std::sync::Arc;

use eyre::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::sink::FileSink;
use crate::web::{build_router, AppState};

pub async fn run(listen: &str, log_dir: &str) -> eyre::Result<()> {
    let sink = Arc::new(FileSink::new(log_dir)?);
    let shutdown = CancellationToken::new();

    let state = Arc::new(AppState {
        sink: sink.clone(),
        shutdown: shutdown.clone(),
    });

    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed binding listener on {}", listen))?;

    log::info!(target: "logd", "accepting log events on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("Server error")?;

    // In-flight requests have drained at this point; anything arriving later
    // gets the sink-closed error rather than a torn write.
    log::info!(target: "logd", "shutting down, closing file sink");
    sink.close().context("Failed closing file sink")?;

    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        // Without a working signal hook the only sane reaction is to shut
        // down rather than run unstoppable.
        log::error!(target: "logd", "failed listening for ctrl-c: {}", err);
    }

    log::info!(target: "logd", "shutdown requested");
    cancel.cancel();
}
