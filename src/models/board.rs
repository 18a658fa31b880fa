//! Kanban board models matching the frontend KanbanBoard types.

use serde::{Deserialize, Serialize};

/// A board column. `order` is the left-to-right position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KanbanList {
    pub id: String,
    pub title: String,
    pub order: i64,
}

/// A card on the board. `position` is a zero-based rank within its list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KanbanCard {
    pub id: String,
    pub list_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Usernames
    #[serde(default)]
    pub assignees: Vec<String>,
    /// ISO date string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub position: i64,
}

/// The whole board as served by `GET /api/kanban`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanbanBoard {
    #[serde(default)]
    pub lists: Vec<KanbanList>,
    #[serde(default)]
    pub cards: Vec<KanbanCard>,
}

impl KanbanBoard {
    pub fn card(&self, id: &str) -> Option<&KanbanCard> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn list(&self, id: &str) -> Option<&KanbanList> {
        self.lists.iter().find(|l| l.id == id)
    }
}

/// Request body for creating a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListRequest {
    pub title: String,
}

/// Request body for updating a list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

/// Request body for creating a card. It is appended to the end of `list_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardRequest {
    pub list_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Request body for `PUT /api/kanban/cards/{id}`.
///
/// Carries either field edits, a move (`list_id` and/or `position`), or both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCardRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

impl UpdateCardRequest {
    /// A pure move: the body the board sends after a drag.
    pub fn move_to(list_id: impl Into<String>, position: i64) -> Self {
        Self {
            list_id: Some(list_id.into()),
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn is_move(&self) -> bool {
        self.list_id.is_some() || self.position.is_some()
    }
}

/// Body returned by delete endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deleted {
    pub deleted: bool,
}
