//! HTTP/WebSocket presentation surface.
//!
//! Thin handlers that translate requests into [`SessionHandle`] calls and
//! expose the published session state.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bootstrap::BootstrappedServices;
use crate::events::BroadcastEvent;
use crate::media::InMemoryNowPlayingSurface;
use crate::network::NetworkAvailabilityMonitor;
use crate::services::SessionHandle;

pub mod http;
pub mod response;
pub mod ws;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),
}

/// Shared application state for the API layer.
#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
    pub now_playing: Arc<InMemoryNowPlayingSurface>,
    pub monitor: Arc<NetworkAvailabilityMonitor>,
    /// Broadcast channel sender for real-time events.
    pub broadcast_tx: broadcast::Sender<BroadcastEvent>,
    /// Cancelled on shutdown; closes the server and open WebSockets.
    pub cancel_token: CancellationToken,
}

impl From<&BootstrappedServices> for AppState {
    fn from(services: &BootstrappedServices) -> Self {
        Self {
            session: services.session.clone(),
            now_playing: Arc::clone(&services.now_playing),
            monitor: Arc::clone(&services.monitor),
            broadcast_tx: services.broadcast_tx.clone(),
            cancel_token: services.cancel_token.clone(),
        }
    }
}

/// Binds the listener. Port 0 lets the OS pick a free port.
pub async fn bind(port: u16) -> Result<(TcpListener, SocketAddr), ServerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;
    Ok((listener, local_addr))
}

/// Serves the API on `listener` until the state's cancellation token fires.
pub async fn start_server(state: AppState, listener: TcpListener) -> Result<(), ServerError> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("Server listening on http://{}", addr);
    }

    let shutdown = state.cancel_token.clone().cancelled_owned();
    let app = http::create_router(state);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    log::info!("[Server] Stopped");
    Ok(())
}
