use std::sync::Arc;

use error_stack::Report;
use poem::get;
use poem::listener::TcpListener;
use poem::middleware::Tracing;
use poem::post;
use poem::Endpoint;
use poem::EndpointExt;
use poem::Route;
use poem::Server;
use tokio_util::sync::CancellationToken;
use topology::TopologyStore;
use tracing::error;
use tracing::info;

use super::errors::ApiError;
use super::handlers::drag_node;
use super::handlers::get_graph;
use super::handlers::get_node;
use super::handlers::get_topology;
use super::handlers::refresh_topology;
use super::handlers::select_node;
use crate::view::GraphViewer;

/// HTTP API exposing the topology snapshot and the live layout
pub struct ApiServer {
    store: Arc<TopologyStore>,
    viewer: Arc<GraphViewer>,
    listen_addr: String,
}

impl ApiServer {
    pub fn new(store: Arc<TopologyStore>, viewer: Arc<GraphViewer>, listen_addr: String) -> Self {
        Self {
            store,
            viewer,
            listen_addr,
        }
    }

    pub fn listen_addr(&self) -> &str {
        &self.listen_addr
    }

    /// Route table with shared state attached.
    pub fn routes(&self) -> impl Endpoint + 'static {
        Route::new()
            .at("/api/topology", get(get_topology))
            .at("/api/topology/refresh", post(refresh_topology))
            .at("/api/graph", get(get_graph))
            .at("/api/graph/drag", post(drag_node))
            .at("/api/graph/nodes/:id", get(get_node))
            .at("/api/graph/nodes/:id/select", post(select_node))
            .data(self.store.clone())
            .data(self.viewer.clone())
            .with(Tracing)
    }

    /// Serve until `token` is cancelled.
    ///
    /// # Errors
    ///
    /// - [`ApiError::ServerError`] if the server fails to start or bind to the address
    pub async fn run(self, token: CancellationToken) -> Result<(), Report<ApiError>> {
        info!("Starting HTTP API server on {}", self.listen_addr);

        let app = self.routes();
        let listener = TcpListener::bind(&self.listen_addr);
        let server = Server::new(listener);

        tokio::select! {
            result = server.run(app) => {
                match result {
                    Ok(()) => {
                        info!("API server stopped normally");
                        Ok(())
                    }
                    Err(e) => {
                        error!("API server failed: {e}");
                        Err(Report::new(ApiError::ServerError {
                            message: format!("Server failed: {e}"),
                        }))
                    }
                }
            }
            _ = token.cancelled() => {
                info!("API server shutdown requested");
                Ok(())
            }
        }
    }
}
