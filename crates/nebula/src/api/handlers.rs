use std::sync::Arc;

use api_types::TopologyState;
use poem::handler;
use poem::http::StatusCode;
use poem::web::Data;
use poem::web::Json;
use poem::web::Path;
use serde::Serialize;
use serde_json::Value;
use topology::layout::DragCommand;
use topology::layout::LayoutFrame;
use topology::CycleOutcome;
use topology::TopologyStore;
use tracing::debug;
use tracing::info;

use super::errors::ApiError;
use crate::view::GraphViewer;

/// Store-to-UI contract
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyResponse {
    pub topology: TopologyState,
    pub is_loading: bool,
    pub version: u64,
}

impl TopologyResponse {
    fn from_store(store: &TopologyStore) -> Self {
        let snapshot = store.snapshot();
        Self {
            topology: snapshot.state.clone(),
            is_loading: store.is_loading(),
            version: snapshot.version,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub outcome: CycleOutcome,
    #[serde(flatten)]
    pub current: TopologyResponse,
}

/// Current topology snapshot
#[handler]
pub async fn get_topology(store: Data<&Arc<TopologyStore>>) -> Json<TopologyResponse> {
    Json(TopologyResponse::from_store(&store))
}

/// Run one fetch cycle now
#[handler]
pub async fn refresh_topology(store: Data<&Arc<TopologyStore>>) -> Json<RefreshResponse> {
    let outcome = store.refresh().await;
    info!(?outcome, "Manual refresh finished");
    Json(RefreshResponse {
        outcome,
        current: TopologyResponse::from_store(&store),
    })
}

/// Latest layout frame
#[handler]
pub async fn get_graph(viewer: Data<&Arc<GraphViewer>>) -> poem::Result<Json<LayoutFrame>> {
    let frame = viewer.frame().await.ok_or(ApiError::GraphNotReady)?;
    Ok(Json(LayoutFrame::clone(&frame)))
}

/// Forward a drag gesture to the layout loop
#[handler]
pub async fn drag_node(
    viewer: Data<&Arc<GraphViewer>>,
    Json(command): Json<DragCommand>,
) -> poem::Result<StatusCode> {
    debug!(?command, "Drag command received");
    if viewer.drag(command).await {
        Ok(StatusCode::ACCEPTED)
    } else {
        Err(ApiError::GraphNotReady.into())
    }
}

/// Record a node was built from, without activating it
#[handler]
pub async fn get_node(
    viewer: Data<&Arc<GraphViewer>>,
    Path(id): Path<String>,
) -> poem::Result<Json<Value>> {
    let record = viewer
        .lookup(&id)
        .await
        .ok_or(ApiError::NodeNotFound { id })?;
    Ok(Json(record))
}

/// Activate a node and return the record it was built from
#[handler]
pub async fn select_node(
    viewer: Data<&Arc<GraphViewer>>,
    Path(id): Path<String>,
) -> poem::Result<Json<Value>> {
    let record = viewer
        .select(&id)
        .await
        .ok_or(ApiError::NodeNotFound { id })?;
    Ok(Json(record))
}
