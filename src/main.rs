use std::sync::Arc;

use gt06_server::{Config, JsonLinesSink, Result, Server};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let (sink, writer) = JsonLinesSink::open(&config.log_file, config.sink_capacity).await?;
    info!(path = %config.log_file.display(), "packet log ready");

    let server = Server::bind(config, Arc::new(sink)).await?;
    info!(addr = %server.local_addr()?, "GT06 TCP server listening");

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    let written = writer.finish().await?;
    info!(records = written, "packet log closed");
    Ok(())
}
