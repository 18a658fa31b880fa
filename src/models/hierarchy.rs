//! Location hierarchy models matching the frontend LocationNode types.

use serde::{Deserialize, Serialize};

/// A person responsible for a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Responsible {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(
        default,
        rename = "photo_rel",
        skip_serializing_if = "Option::is_none"
    )]
    pub photo_rel: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

impl Responsible {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            username: None,
            photo_rel: None,
            is_primary: false,
        }
    }

    pub fn primary(name: impl Into<String>) -> Self {
        Self {
            is_primary: true,
            ..Self::named(name)
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Deduplication key: lowercase username, or lowercase name without one.
    pub fn identity_key(&self) -> String {
        match self.username.as_deref().map(str::trim) {
            Some(username) if !username.is_empty() => username.to_lowercase(),
            _ => self.name.trim().to_lowercase(),
        }
    }
}

/// A location/unit in the hierarchy.
///
/// On the wire every node carries both `parentId` and its nested `children`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationNode {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub responsibles: Vec<Responsible>,
    #[serde(default)]
    pub children: Vec<LocationNode>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Body of `GET /api/hierarchy`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchySnapshot {
    /// Root nodes, children nested.
    #[serde(default)]
    pub nodes: Vec<LocationNode>,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Request body for creating a root or child node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub responsibles: Vec<Responsible>,
}

/// Request body for updating a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNodeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsibles: Option<Vec<Responsible>>,
}
