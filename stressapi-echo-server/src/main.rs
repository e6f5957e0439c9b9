use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use stressapi_echo_server::config::{DEFAULT_HOST, DEFAULT_PORT};
use stressapi_echo_server::{Server, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stressapi-echo-server", about = "Echo server for smoke-testing stressapi")]
struct Args {
    /// IP address to bind
    #[arg(long, default_value = DEFAULT_HOST)]
    host: IpAddr,

    /// Port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Log every request
    #[arg(long)]
    log: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    if !args.log {
        info!("Run with --log to log every request");
    }

    let config = ServerConfig { address: SocketAddr::new(args.host, args.port), log_requests: args.log };

    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        if let Ok(addr) = ready_rx.await {
            info!("Listening on http://{addr}/");
        }
    });

    Server::new(config).run(ready_tx).await
}
