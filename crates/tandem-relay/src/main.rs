//! tandem-relay: WebSocket front end for the sync core.
//!
//! Each connection identifies itself with a user id, then issues JSON
//! requests against one shared in-process [`SyncService`]. A connection
//! may hold one subscription (a session's state topic or a device's
//! command topic) whose traffic is forwarded as `event` frames.

mod connection;
mod protocol;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tandem_common::TandemError;
use tandem_config::TandemConfig;
use tandem_sync::SyncService;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tracing_subscriber::EnvFilter;

use crate::connection::handle_connection;

#[derive(Parser)]
#[command(name = "tandem-relay", about = "WebSocket relay for shared navigation and remote control")]
struct Args {
    /// Config file to load instead of the platform default.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file).
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (overrides the config file).
    #[arg(long)]
    bind: Option<String>,
}

fn load(args: &Args) -> Result<TandemConfig, TandemError> {
    let mut config = match &args.config {
        Some(path) => tandem_config::load_config_from(path)?,
        None => tandem_config::load_config()?,
    };
    if let Some(port) = args.port {
        config.relay.port = port;
    }
    if let Some(bind) = &args.bind {
        config.relay.bind = bind.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), TandemError> {
    let args = Args::parse();
    let config = load(&args)?;

    let directive = config.logging.level.directive();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive)),
        )
        .init();

    let addr = config.relay.listen_addr();
    let hello_timeout = Duration::from_secs(config.relay.hello_timeout_secs);
    let listener = TcpListener::bind(&addr).await?;
    let service = SyncService::in_memory(config);

    tracing::info!("tandem-relay listening on {}", addr);

    // Accept loop.
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let service = service.clone();
                tokio::spawn(async move {
                    match accept_async(stream).await {
                        Ok(ws) => handle_connection(ws, peer, service, hello_timeout).await,
                        Err(e) => {
                            tracing::warn!(peer = %peer, error = %e, "WS handshake failed");
                        }
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept error");
            }
        }
    }
}
