//! Kanban API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{deleted, require, success, ApiResult};
use crate::models::{
    CreateCardRequest, CreateListRequest, Deleted, KanbanBoard, KanbanCard, KanbanList,
    UpdateCardRequest, UpdateListRequest,
};
use crate::AppState;

/// GET /api/kanban - The whole board.
pub async fn get_board(State(state): State<AppState>) -> ApiResult<KanbanBoard> {
    success(state.repo.get_board().await?)
}

/// POST /api/kanban/lists - Create a list.
pub async fn create_list(
    State(state): State<AppState>,
    Json(request): Json<CreateListRequest>,
) -> ApiResult<KanbanList> {
    require(&request.title, "List title is required")?;

    let list = state.repo.create_list(&request).await?;
    tracing::info!(list = %list.id, "List created");
    success(list)
}

/// PUT /api/kanban/lists/:id - Rename or reorder a list.
pub async fn update_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateListRequest>,
) -> ApiResult<KanbanList> {
    if let Some(title) = &request.title {
        require(title, "List title is required")?;
    }

    success(state.repo.update_list(&id, &request).await?)
}

/// DELETE /api/kanban/lists/:id - Delete a list and its cards.
pub async fn delete_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    state.repo.delete_list(&id).await?;
    tracing::info!(list = %id, "List deleted");
    deleted()
}

/// POST /api/kanban/cards - Create a card at the end of a list.
pub async fn create_card(
    State(state): State<AppState>,
    Json(request): Json<CreateCardRequest>,
) -> ApiResult<KanbanCard> {
    require(&request.title, "Card title is required")?;
    require(&request.list_id, "List (listId) is required")?;

    success(state.repo.create_card(&request).await?)
}

/// PUT /api/kanban/cards/:id - Edit and/or move a card.
pub async fn update_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateCardRequest>,
) -> ApiResult<KanbanCard> {
    if let Some(title) = &request.title {
        require(title, "Card title is required")?;
    }

    success(state.repo.update_card(&id, &request).await?)
}

/// DELETE /api/kanban/cards/:id - Delete a card.
pub async fn delete_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    state.repo.delete_card(&id).await?;
    deleted()
}
