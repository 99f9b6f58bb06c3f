// Server module entry point
// Listener setup, the accept loop, per-connection serving and request handling

pub mod connection;
pub mod listener;
mod request;
mod signal;
mod state;

use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::handler::HandlerRegistry;
use crate::logger;

pub use listener::create_reusable_listener;
pub use request::handle_request;
pub use signal::shutdown_signal;
pub use state::AppState;

/// Bind, build the application state and serve until shutdown
///
/// `registries` maps rule prefixes to the handlers of their trees.
pub async fn start(
    config: Config,
    registries: HashMap<String, HandlerRegistry>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = config.get_socket_addr()?;
    let state = Arc::new(AppState::from_config(config, registries)?);
    let listener = create_reusable_listener(addr)?;

    logger::log_server_start(&addr, &state.config, state.registered_routes());
    run(listener, state).await;
    Ok(())
}

/// Accept connections until a shutdown signal arrives
///
/// Connections already being served finish in their own tasks.
pub async fn run(listener: TcpListener, state: Arc<AppState>) {
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    connection::accept_connection(stream, peer_addr, &state);
                }
                Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
            },
            () = &mut shutdown => {
                logger::log_info("Shutting down, no longer accepting connections");
                return;
            }
        }
    }
}
