// Connection handling module
// Accepts a single TCP connection and serves it over HTTP/1.1

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpStream;

use super::request::handle_request;
use super::AppState;
use crate::logger;

/// Accept a connection unless the connection limit is reached
pub fn accept_connection(stream: TcpStream, peer_addr: SocketAddr, state: &Arc<AppState>) {
    // Increment first, then check, so concurrent accepts cannot overshoot
    let prev_count = state.active_connections.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            state.active_connections.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    logger::log_debug(&format!("[Connection] Accepted from: {peer_addr}"));
    handle_connection(stream, peer_addr, Arc::clone(state));
}

/// Serve one connection in its own task.
///
/// HTTP/1.1 with keep-alive when enabled, a header read timeout, and an
/// overall cap of `max(read_timeout, write_timeout)` seconds. The active
/// connection counter is released when the task ends.
fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, state: Arc<AppState>) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let performance = &state.config.performance;
        let timeout_duration =
            Duration::from_secs(std::cmp::max(performance.read_timeout, performance.write_timeout));

        let mut builder = http1::Builder::new();
        builder
            .keep_alive(performance.keep_alive_timeout > 0)
            .timer(TokioTimer::new())
            .header_read_timeout(Duration::from_secs(performance.read_timeout));

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| handle_request(req, Arc::clone(&service_state), peer_addr)),
        );

        match tokio::time::timeout(timeout_duration, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => logger::log_debug(&format!(
                "Connection from {peer_addr} closed after {} seconds",
                timeout_duration.as_secs()
            )),
        }

        state.active_connections.fetch_sub(1, Ordering::SeqCst);
    });
}
