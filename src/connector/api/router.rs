use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::routing::post;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::container::Container;
use super::controller::{complete, stream};

pub const COMPLETION_ROUTE: &str = "/completions";
pub const STREAM_ROUTE: &str = "/completions/stream";

/// HTTP surface of the relay: two POST endpoints over a shared [`Container`].
pub struct Router {
    container: Arc<Container>,
}

impl Router {
    pub fn new(container: Arc<Container>) -> Self {
        Self { container }
    }

    pub fn build(self) -> axum::Router {
        axum::Router::new()
            .route(COMPLETION_ROUTE, post(complete))
            .route(STREAM_ROUTE, post(stream))
            .with_state(self.container)
    }

    /// Serve on an already-bound listener until `shutdown` fires.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        let addr: SocketAddr = listener.local_addr()?;
        info!("Relay listening on http://{}", addr);

        axum::serve(listener, self.build())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Relay stopped");
        Ok(())
    }
}
