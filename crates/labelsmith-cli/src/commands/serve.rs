//! Remote training worker process

use labelsmith::worker::{serve, Worker};
use tracing::warn;

use crate::error::Result;

/// Bind `host:port` and answer worker requests until Ctrl+C.
pub(crate) fn run(host: &str, port: u16) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind((host, port)).await?;
        serve(listener, Worker::new(), shutdown_signal()).await?;
        Ok(())
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
