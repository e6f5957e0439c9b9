//! Helpers shared by the end-to-end tests.

use std::net::SocketAddr;
use std::thread;
use stressapi_echo_server::{Server, ServerConfig};
use tokio::sync::oneshot;

/// Start an echo server on an ephemeral port and return its address.
///
/// The server gets its own runtime thread: the generator's blocking client
/// must stay outside any async context.
pub fn start_echo_server() -> std::io::Result<SocketAddr> {
    let (ready_tx, ready_rx) = oneshot::channel();
    let server = Server::new(ServerConfig { address: SocketAddr::from(([127, 0, 0, 1], 0)), log_requests: false });
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    thread::Builder::new().name("echo-server".to_string()).spawn(move || {
        runtime.block_on(async move {
            if let Err(e) = server.run(ready_tx).await {
                eprintln!("echo server stopped: {e}");
            }
        });
    })?;
    ready_rx
        .blocking_recv()
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "echo server did not start"))
}
