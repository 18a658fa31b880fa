//! Database repository for the board and the hierarchy.
//!
//! Multi-row writes (moves, deletes with re-ranking, subtree deletes) run in a
//! single transaction, and all writes are serialized by one lock.

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tokio::sync::{Mutex, MutexGuard};

use crate::board::{changed_cards, reconcile, DragResult};
use crate::errors::AppError;
use crate::models::{
    CreateCardRequest, CreateListRequest, HierarchySnapshot, KanbanBoard, KanbanCard, KanbanList,
    LocationNode, NodeRequest, Responsible, UpdateCardRequest, UpdateListRequest,
    UpdateNodeRequest,
};
use crate::tree::NodeIndex;

const CARD_COLUMNS: &str =
    "id, list_id, title, description, assignees, due_date, color, position";
const NODE_COLUMNS: &str = "id, parent_id, name, description, color, category, responsibles";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Held across every read-modify-write. SQLite admits a single writer and
    /// a deferred transaction that has read cannot upgrade once another
    /// writer commits.
    async fn writer(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    // ==================== BOARD OPERATIONS ====================

    /// Get the whole board.
    pub async fn get_board(&self) -> Result<KanbanBoard, AppError> {
        let mut conn = self.pool.acquire().await?;
        load_board(&mut conn).await
    }

    /// Create a list at the right end of the board.
    pub async fn create_list(&self, request: &CreateListRequest) -> Result<KanbanList, AppError> {
        let id = new_id("list");
        let now = Utc::now().to_rfc3339();
        let title = request.title.trim().to_string();

        let _writing = self.writer().await;
        let mut tx = self.pool.begin().await?;

        let order: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(sort_order), 0) + 1 FROM kanban_lists")
                .fetch_one(&mut *tx)
                .await?;

        sqlx::query("INSERT INTO kanban_lists (id, title, sort_order, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(&title)
            .bind(order)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(list = %id, order, "Created list");
        Ok(KanbanList { id, title, order })
    }

    /// Rename and/or reorder a list.
    pub async fn update_list(
        &self,
        id: &str,
        request: &UpdateListRequest,
    ) -> Result<KanbanList, AppError> {
        let _writing = self.writer().await;
        let existing = self
            .get_list(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("List {} not found", id)))?;

        let title = request
            .title
            .as_ref()
            .map(|t| t.trim().to_string())
            .unwrap_or(existing.title);
        let order = request.order.unwrap_or(existing.order);

        sqlx::query("UPDATE kanban_lists SET title = ?, sort_order = ? WHERE id = ?")
            .bind(&title)
            .bind(order)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(KanbanList {
            id: id.to_string(),
            title,
            order,
        })
    }

    /// Get a list by ID.
    pub async fn get_list(&self, id: &str) -> Result<Option<KanbanList>, AppError> {
        let row = sqlx::query("SELECT id, title, sort_order FROM kanban_lists WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(list_from_row))
    }

    /// Delete a list together with its cards.
    pub async fn delete_list(&self, id: &str) -> Result<(), AppError> {
        let _writing = self.writer().await;
        let mut tx = self.pool.begin().await?;

        let cards = sqlx::query("DELETE FROM kanban_cards WHERE list_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM kanban_lists WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("List {} not found", id)));
        }

        tx.commit().await?;

        tracing::debug!(list = %id, cards = cards.rows_affected(), "Deleted list");
        Ok(())
    }

    /// Get a card by ID.
    pub async fn get_card(&self, id: &str) -> Result<Option<KanbanCard>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM kanban_cards WHERE id = ?",
            CARD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(card_from_row).transpose()
    }

    /// Create a card at the end of its list.
    pub async fn create_card(&self, request: &CreateCardRequest) -> Result<KanbanCard, AppError> {
        let id = new_id("card");
        let now = Utc::now().to_rfc3339();

        let _writing = self.writer().await;
        let mut tx = self.pool.begin().await?;

        ensure_list_exists(&mut tx, &request.list_id).await?;

        let position: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM kanban_cards WHERE list_id = ?",
        )
        .bind(&request.list_id)
        .fetch_one(&mut *tx)
        .await?;

        let card = KanbanCard {
            id,
            list_id: request.list_id.clone(),
            title: request.title.trim().to_string(),
            description: Some(request.description.clone().unwrap_or_default()),
            assignees: request.assignees.clone().unwrap_or_default(),
            due_date: non_blank(request.due_date.as_deref()),
            color: non_blank(request.color.as_deref()),
            position,
        };

        sqlx::query(
            "INSERT INTO kanban_cards (id, list_id, title, description, assignees, due_date, color, position, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&card.id)
        .bind(&card.list_id)
        .bind(&card.title)
        .bind(&card.description)
        .bind(serde_json::to_string(&card.assignees)?)
        .bind(&card.due_date)
        .bind(&card.color)
        .bind(card.position)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(card = %card.id, list = %card.list_id, position, "Created card");
        Ok(card)
    }

    /// Edit a card and/or move it.
    ///
    /// A move runs the board reconciler against the stored board, so the ranks
    /// written here are the ones the client computed optimistically.
    pub async fn update_card(
        &self,
        id: &str,
        request: &UpdateCardRequest,
    ) -> Result<KanbanCard, AppError> {
        let now = Utc::now().to_rfc3339();
        let _writing = self.writer().await;
        let mut tx = self.pool.begin().await?;

        let board = load_board(&mut tx).await?;
        let existing = board
            .card(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Card {} not found", id)))?;

        let mut card = existing.clone();

        if request.is_move() {
            let list_id = request
                .list_id
                .clone()
                .unwrap_or_else(|| existing.list_id.clone());
            if board.list(&list_id).is_none() {
                return Err(AppError::NotFound(format!("List {} not found", list_id)));
            }

            let position = match request.position {
                Some(position) => position,
                None if list_id == existing.list_id => existing.position,
                None => i64::MAX,
            };

            let moved = DragResult::relocate(&board, id, &list_id, position)
                .and_then(|drag| reconcile(&board, &drag));
            if let Some(moved) = moved {
                for changed in changed_cards(&board, &moved) {
                    sqlx::query("UPDATE kanban_cards SET list_id = ?, position = ?, updated_at = ? WHERE id = ?")
                        .bind(&changed.list_id)
                        .bind(changed.position)
                        .bind(&now)
                        .bind(&changed.id)
                        .execute(&mut *tx)
                        .await?;
                }
                if let Some(placed) = moved.card(id) {
                    card.list_id = placed.list_id.clone();
                    card.position = placed.position;
                }
                tracing::debug!(card = %id, list = %card.list_id, position = card.position, "Moved card");
            }
        }

        if let Some(title) = &request.title {
            card.title = title.trim().to_string();
        }
        if let Some(description) = &request.description {
            card.description = Some(description.clone());
        }
        if let Some(assignees) = &request.assignees {
            card.assignees = assignees.clone();
        }
        if let Some(due_date) = &request.due_date {
            card.due_date = non_blank(Some(due_date.as_str()));
        }
        if let Some(color) = &request.color {
            card.color = non_blank(Some(color.as_str()));
        }

        sqlx::query(
            "UPDATE kanban_cards SET title = ?, description = ?, assignees = ?, due_date = ?, color = ?, updated_at = ? WHERE id = ?"
        )
        .bind(&card.title)
        .bind(&card.description)
        .bind(serde_json::to_string(&card.assignees)?)
        .bind(&card.due_date)
        .bind(&card.color)
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(card)
    }

    /// Delete a card and close the gap it leaves in its list.
    pub async fn delete_card(&self, id: &str) -> Result<(), AppError> {
        let _writing = self.writer().await;
        let mut tx = self.pool.begin().await?;

        let list_id: Option<String> =
            sqlx::query_scalar("SELECT list_id FROM kanban_cards WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let list_id = list_id.ok_or_else(|| AppError::NotFound(format!("Card {} not found", id)))?;

        sqlx::query("DELETE FROM kanban_cards WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let remaining: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM kanban_cards WHERE list_id = ? ORDER BY position, rowid",
        )
        .bind(&list_id)
        .fetch_all(&mut *tx)
        .await?;

        for (rank, card_id) in remaining.iter().enumerate() {
            sqlx::query("UPDATE kanban_cards SET position = ? WHERE id = ?")
                .bind(rank as i64)
                .bind(card_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    // ==================== HIERARCHY OPERATIONS ====================

    /// Get the hierarchy as nested roots plus the known categories.
    pub async fn get_hierarchy(&self) -> Result<HierarchySnapshot, AppError> {
        let index = NodeIndex::from_flat(self.list_nodes().await?);

        let categories: Vec<String> =
            sqlx::query_scalar("SELECT name FROM hierarchy_categories ORDER BY rowid")
                .fetch_all(&self.pool)
                .await?;

        Ok(HierarchySnapshot {
            nodes: index.nested(),
            categories,
        })
    }

    /// List all nodes flat, in creation order.
    pub async fn list_nodes(&self) -> Result<Vec<LocationNode>, AppError> {
        let mut conn = self.pool.acquire().await?;
        load_nodes(&mut conn).await
    }

    /// Get a node by ID, without children.
    pub async fn get_node(&self, id: &str) -> Result<Option<LocationNode>, AppError> {
        let mut conn = self.pool.acquire().await?;
        load_node(&mut conn, id).await
    }

    /// Create a root node (`parent_id == None`) or a child of `parent_id`.
    pub async fn create_node(
        &self,
        parent_id: Option<&str>,
        request: &NodeRequest,
    ) -> Result<LocationNode, AppError> {
        let _writing = self.writer().await;
        let mut tx = self.pool.begin().await?;

        if let Some(parent_id) = parent_id {
            if load_node(&mut tx, parent_id).await?.is_none() {
                return Err(AppError::NotFound(format!("Node {} not found", parent_id)));
            }
        }

        let now = Utc::now().to_rfc3339();
        let node = LocationNode {
            id: new_id("loc"),
            name: request.name.trim().to_string(),
            description: non_blank(request.description.as_deref()),
            color: non_blank(request.color.as_deref()),
            category: non_blank(request.category.as_deref()),
            responsibles: sanitize_responsibles(&request.responsibles),
            children: Vec::new(),
            parent_id: parent_id.map(str::to_string),
        };

        if let Some(category) = &node.category {
            ensure_category(&mut tx, category).await?;
        }

        sqlx::query(
            "INSERT INTO hierarchy_nodes (id, parent_id, name, description, color, category, responsibles, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&node.id)
        .bind(&node.parent_id)
        .bind(&node.name)
        .bind(&node.description)
        .bind(&node.color)
        .bind(&node.category)
        .bind(serde_json::to_string(&node.responsibles)?)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(node = %node.id, parent = ?node.parent_id, "Created hierarchy node");
        Ok(node)
    }

    /// Update a node's own fields. Children are returned empty.
    pub async fn update_node(
        &self,
        id: &str,
        request: &UpdateNodeRequest,
    ) -> Result<LocationNode, AppError> {
        let _writing = self.writer().await;
        let mut tx = self.pool.begin().await?;

        let mut node = load_node(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Node {} not found", id)))?;

        if let Some(name) = &request.name {
            node.name = name.trim().to_string();
        }
        if let Some(description) = &request.description {
            node.description = non_blank(Some(description.as_str()));
        }
        if let Some(color) = &request.color {
            node.color = non_blank(Some(color.as_str()));
        }
        if let Some(category) = &request.category {
            node.category = non_blank(Some(category.as_str()));
            if let Some(category) = &node.category {
                ensure_category(&mut tx, category).await?;
            }
        }
        if let Some(responsibles) = &request.responsibles {
            node.responsibles = sanitize_responsibles(responsibles);
        }

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE hierarchy_nodes SET name = ?, description = ?, color = ?, category = ?, responsibles = ?, updated_at = ? WHERE id = ?"
        )
        .bind(&node.name)
        .bind(&node.description)
        .bind(&node.color)
        .bind(&node.category)
        .bind(serde_json::to_string(&node.responsibles)?)
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(node)
    }

    /// Delete a node and its whole subtree.
    pub async fn delete_node(&self, id: &str) -> Result<(), AppError> {
        let _writing = self.writer().await;
        let mut tx = self.pool.begin().await?;

        let index = NodeIndex::from_flat(load_nodes(&mut tx).await?);
        let doomed = index.subtree_ids(id);
        if doomed.is_empty() {
            return Err(AppError::NotFound(format!("Node {} not found", id)));
        }

        // Leaves first so parent links never dangle mid-transaction.
        for node_id in doomed.iter().rev() {
            sqlx::query("DELETE FROM hierarchy_nodes WHERE id = ?")
                .bind(node_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::debug!(node = %id, removed = doomed.len(), "Deleted hierarchy subtree");
        Ok(())
    }
}

/// Register a category unless one with the same name (ignoring case) exists.
async fn ensure_category(conn: &mut SqliteConnection, name: &str) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(());
    }

    sqlx::query("INSERT OR IGNORE INTO hierarchy_categories (name, created_at) VALUES (?, ?)")
        .bind(name)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn load_nodes(conn: &mut SqliteConnection) -> Result<Vec<LocationNode>, AppError> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM hierarchy_nodes ORDER BY rowid",
        NODE_COLUMNS
    ))
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(node_from_row).collect()
}

async fn load_node(conn: &mut SqliteConnection, id: &str) -> Result<Option<LocationNode>, AppError> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM hierarchy_nodes WHERE id = ?",
        NODE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(node_from_row).transpose()
}

async fn load_board(conn: &mut SqliteConnection) -> Result<KanbanBoard, AppError> {
    let list_rows =
        sqlx::query("SELECT id, title, sort_order FROM kanban_lists ORDER BY sort_order, rowid")
            .fetch_all(&mut *conn)
            .await?;

    let card_rows = sqlx::query(&format!(
        "SELECT {} FROM kanban_cards ORDER BY list_id, position, rowid",
        CARD_COLUMNS
    ))
    .fetch_all(&mut *conn)
    .await?;

    Ok(KanbanBoard {
        lists: list_rows.iter().map(list_from_row).collect(),
        cards: card_rows
            .iter()
            .map(card_from_row)
            .collect::<Result<_, _>>()?,
    })
}

async fn ensure_list_exists(conn: &mut SqliteConnection, list_id: &str) -> Result<(), AppError> {
    let found: Option<String> = sqlx::query_scalar("SELECT id FROM kanban_lists WHERE id = ?")
        .bind(list_id)
        .fetch_optional(&mut *conn)
        .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!("List {} not found", list_id))),
    }
}

fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

/// Trimmed text, or `None` when blank.
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Trim names, drop nameless entries and keep only the first primary.
pub fn sanitize_responsibles(responsibles: &[Responsible]) -> Vec<Responsible> {
    let mut has_primary = false;
    responsibles
        .iter()
        .filter_map(|r| {
            let name = r.name.trim();
            if name.is_empty() {
                return None;
            }
            let is_primary = r.is_primary && !has_primary;
            has_primary |= is_primary;
            Some(Responsible {
                name: name.to_string(),
                username: non_blank(r.username.as_deref()),
                photo_rel: non_blank(r.photo_rel.as_deref()),
                is_primary,
            })
        })
        .collect()
}

// Helper functions for row conversion

fn list_from_row(row: &sqlx::sqlite::SqliteRow) -> KanbanList {
    KanbanList {
        id: row.get("id"),
        title: row.get("title"),
        order: row.get("sort_order"),
    }
}

fn card_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<KanbanCard, AppError> {
    let id: String = row.get("id");
    let assignees: String = row.get("assignees");
    Ok(KanbanCard {
        assignees: parse_json_list(&assignees, "assignees", &id)?,
        id,
        list_id: row.get("list_id"),
        title: row.get("title"),
        description: row.get("description"),
        due_date: row.get("due_date"),
        color: row.get("color"),
        position: row.get("position"),
    })
}

fn node_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<LocationNode, AppError> {
    let id: String = row.get("id");
    let responsibles: String = row.get("responsibles");
    Ok(LocationNode {
        responsibles: parse_json_list(&responsibles, "responsibles", &id)?,
        id,
        name: row.get("name"),
        description: row.get("description"),
        color: row.get("color"),
        category: row.get("category"),
        children: Vec::new(),
        parent_id: row.get("parent_id"),
    })
}

/// Decode a JSON array column. A corrupt value is an error, never an empty
/// list, so a later update cannot overwrite it with `[]`.
fn parse_json_list<T: DeserializeOwned>(
    raw: &str,
    column: &str,
    id: &str,
) -> Result<Vec<T>, AppError> {
    serde_json::from_str(raw).map_err(|e| {
        tracing::error!(row = %id, column, "Unreadable JSON column: {}", e);
        AppError::Internal(format!("Stored {} of {} is unreadable", column, id))
    })
}
