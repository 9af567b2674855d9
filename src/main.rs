use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wirehttp::{Router, Server, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "wirehttp", about = "Minimal HTTP/1.1 server")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "wirehttp.toml")]
    config: PathBuf,

    /// Override the configured port
    #[arg(short, long)]
    port: Option<u16>,
}

#[async_std::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wirehttp=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = ServerConfig::load_or_default(&cli.config);
    if let Some(port) = cli.port {
        config.port = port;
    }

    let router = Router::new(&config);
    let mut server = Server::serve(config, router).await?;
    info!(addr = %server.local_addr(), "server started");

    server.close_on(shutdown_signal()).await?;
    Ok(())
}

/// Resolves on the first SIGINT or SIGTERM.
#[cfg(unix)]
async fn shutdown_signal() {
    use async_std::stream::StreamExt;
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook_async_std::Signals;

    let mut signals = match Signals::new([SIGINT, SIGTERM]) {
        Ok(signals) => signals,
        Err(err) => {
            warn!(error = %err, "cannot install signal handlers, serving until killed");
            return std::future::pending().await;
        }
    };
    let handle = signals.handle();
    if let Some(signal) = signals.next().await {
        info!(signal, "received shutdown signal");
    }
    handle.close();
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    std::future::pending().await
}
