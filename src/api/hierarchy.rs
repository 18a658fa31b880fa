//! Hierarchy API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{deleted, require, success, ApiResult};
use crate::models::{Deleted, HierarchySnapshot, LocationNode, NodeRequest, UpdateNodeRequest};
use crate::AppState;

/// GET /api/hierarchy - Nested nodes and categories.
pub async fn get_hierarchy(State(state): State<AppState>) -> ApiResult<HierarchySnapshot> {
    success(state.repo.get_hierarchy().await?)
}

/// POST /api/hierarchy/root - Create a root location.
pub async fn create_root(
    State(state): State<AppState>,
    Json(request): Json<NodeRequest>,
) -> ApiResult<LocationNode> {
    require(&request.name, "Location name is required")?;

    let node = state.repo.create_node(None, &request).await?;
    tracing::info!(node = %node.id, "Root location created");
    success(node)
}

/// POST /api/hierarchy/:parent_id/child - Create a child location.
pub async fn create_child(
    State(state): State<AppState>,
    Path(parent_id): Path<String>,
    Json(request): Json<NodeRequest>,
) -> ApiResult<LocationNode> {
    require(&request.name, "Location name is required")?;

    let node = state.repo.create_node(Some(&parent_id), &request).await?;
    tracing::info!(node = %node.id, parent = %parent_id, "Child location created");
    success(node)
}

/// PUT /api/hierarchy/:id - Update a location's own fields.
pub async fn update_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateNodeRequest>,
) -> ApiResult<LocationNode> {
    if let Some(name) = &request.name {
        require(name, "Location name is required")?;
    }

    success(state.repo.update_node(&id, &request).await?)
}

/// DELETE /api/hierarchy/:id - Delete a location and everything below it.
pub async fn delete_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    state.repo.delete_node(&id).await?;
    tracing::info!(node = %id, "Location subtree deleted");
    deleted()
}
