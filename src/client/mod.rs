//! Async client for the board and hierarchy REST API, and the page stores
//! built on it.

mod board;
mod hierarchy;

pub use board::*;
pub use hierarchy::*;

use std::env;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::events::{Command, CommandReceiver};
use crate::models::{
    CreateCardRequest, CreateListRequest, Deleted, HierarchySnapshot, KanbanBoard, KanbanCard,
    KanbanList, LocationNode, NodeRequest, UpdateCardRequest, UpdateListRequest,
    UpdateNodeRequest,
};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base, e.g. `http://localhost:8000`
    pub base_url: String,
    /// Per-request timeout. Unset means requests wait indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// Load from `STUDIO_API_URL` (and `.env`).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let base_url =
            env::var("STUDIO_API_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());

        Self {
            base_url,
            timeout: None,
        }
    }
}

/// Client-side error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Non-2xx response; `detail` comes from the error body when present
    Http { status: u16, detail: Option<String> },
    /// Connection or protocol failure
    Transport(String),
    /// Response body did not match the expected shape
    Decode(String),
    /// Input rejected before any request was sent
    Invalid(String),
    /// Base URL cannot be joined with API paths
    InvalidUrl(String),
}

impl ClientError {
    /// Server-provided detail, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ClientError::Http { detail, .. } => detail.as_deref(),
            ClientError::Invalid(msg) => Some(msg),
            _ => None,
        }
    }

    /// Text for a user notification: the server detail, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.detail().unwrap_or(fallback).to_string()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Http { status: 404, .. })
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Http { status, detail } => match detail {
                Some(detail) => write!(f, "HTTP {}: {}", status, detail),
                None => write!(f, "HTTP {}", status),
            },
            ClientError::Transport(msg) => write!(f, "transport error: {}", msg),
            ClientError::Decode(msg) => write!(f, "decode error: {}", msg),
            ClientError::Invalid(msg) => write!(f, "invalid input: {}", msg),
            ClientError::InvalidUrl(msg) => write!(f, "invalid URL: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
}

/// Typed wrapper over the REST endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Self::with_client(http, &config.base_url)
    }

    /// Use an existing `reqwest::Client`, e.g. one with default headers.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { http, base_url })
    }

    /// `base/api/<segments...>`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ClientError> {
        Ok(self.http.request(method, self.endpoint(segments)?))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let detail = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.detail);
            tracing::debug!(status = status.as_u16(), ?detail, "Request failed");
            return Err(ClientError::Http {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(response.json::<T>().await?)
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(self.request(method, segments)?.json(body)).await
    }

    // ==================== BOARD ====================

    /// GET /api/kanban
    pub async fn fetch_board(&self) -> Result<KanbanBoard, ClientError> {
        self.send(self.request(Method::GET, &["kanban"])?).await
    }

    /// PUT /api/kanban/cards/:id with `{ listId, position }`.
    pub async fn move_card(
        &self,
        card_id: &str,
        list_id: &str,
        position: i64,
    ) -> Result<KanbanCard, ClientError> {
        self.update_card(card_id, &UpdateCardRequest::move_to(list_id, position))
            .await
    }

    pub async fn create_list(&self, title: &str) -> Result<KanbanList, ClientError> {
        let body = CreateListRequest {
            title: title.to_string(),
        };
        self.send_json(Method::POST, &["kanban", "lists"], &body).await
    }

    pub async fn update_list(
        &self,
        list_id: &str,
        request: &UpdateListRequest,
    ) -> Result<KanbanList, ClientError> {
        self.send_json(Method::PUT, &["kanban", "lists", list_id], request)
            .await
    }

    pub async fn delete_list(&self, list_id: &str) -> Result<(), ClientError> {
        let _: Deleted = self
            .send(self.request(Method::DELETE, &["kanban", "lists", list_id])?)
            .await?;
        Ok(())
    }

    pub async fn create_card(&self, request: &CreateCardRequest) -> Result<KanbanCard, ClientError> {
        self.send_json(Method::POST, &["kanban", "cards"], request)
            .await
    }

    pub async fn update_card(
        &self,
        card_id: &str,
        request: &UpdateCardRequest,
    ) -> Result<KanbanCard, ClientError> {
        self.send_json(Method::PUT, &["kanban", "cards", card_id], request)
            .await
    }

    pub async fn delete_card(&self, card_id: &str) -> Result<(), ClientError> {
        let _: Deleted = self
            .send(self.request(Method::DELETE, &["kanban", "cards", card_id])?)
            .await?;
        Ok(())
    }

    // ==================== HIERARCHY ====================

    /// GET /api/hierarchy
    pub async fn fetch_hierarchy(&self) -> Result<HierarchySnapshot, ClientError> {
        self.send(self.request(Method::GET, &["hierarchy"])?).await
    }

    /// POST /api/hierarchy/root
    pub async fn create_root(&self, request: &NodeRequest) -> Result<LocationNode, ClientError> {
        self.send_json(Method::POST, &["hierarchy", "root"], request)
            .await
    }

    /// POST /api/hierarchy/:parent_id/child
    pub async fn create_child(
        &self,
        parent_id: &str,
        request: &NodeRequest,
    ) -> Result<LocationNode, ClientError> {
        self.send_json(Method::POST, &["hierarchy", parent_id, "child"], request)
            .await
    }

    pub async fn update_node(
        &self,
        node_id: &str,
        request: &UpdateNodeRequest,
    ) -> Result<LocationNode, ClientError> {
        self.send_json(Method::PUT, &["hierarchy", node_id], request)
            .await
    }

    pub async fn delete_node(&self, node_id: &str) -> Result<(), ClientError> {
        let _: Deleted = self
            .send(self.request(Method::DELETE, &["hierarchy", node_id])?)
            .await?;
        Ok(())
    }
}

/// Consume delete commands until every sender is dropped.
///
/// Failures are already reported as notices by the stores.
pub async fn run_commands(
    mut commands: CommandReceiver,
    board: &BoardStore,
    hierarchy: &HierarchyStore,
) {
    while let Some(command) = commands.recv().await {
        tracing::debug!(?command, "Handling command");
        let result = match &command {
            Command::DeleteCard { card_id } => board.delete_card(card_id).await,
            Command::DeleteList { list_id } => board.delete_list(list_id).await,
            Command::DeleteNode { node_id } => hierarchy.delete_node(node_id).await,
        };
        if let Err(e) = result {
            tracing::debug!(?command, "Command failed: {}", e);
        }
    }
}
