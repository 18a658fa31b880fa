//! Integration tests for the studio backend and client stores.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

use crate::board::{reconcile, DragLocation, DragResult};
use crate::client::{run_commands, ApiClient, BoardStore, HierarchyStore, MoveOutcome};
use crate::db::{init_database, Repository};
use crate::events::{command_channel, Command, Notice, Notifier};
use crate::models::{KanbanBoard, NodeRequest, Responsible};
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    state: AppState,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        let state = AppState { repo };

        let app = create_router(state.clone());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            state,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn api(&self) -> ApiClient {
        ApiClient::with_client(self.client.clone(), &self.base_url).unwrap()
    }

    fn board_store(&self) -> (BoardStore, UnboundedReceiver<Notice>) {
        let (notifier, notices) = Notifier::channel();
        (BoardStore::new(self.api(), notifier), notices)
    }

    fn hierarchy_store(&self) -> (HierarchyStore, UnboundedReceiver<Notice>) {
        let (notifier, notices) = Notifier::channel();
        (HierarchyStore::new(self.api(), notifier), notices)
    }

    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn put(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn delete(&self, path: &str) -> reqwest::Response {
        self.client.delete(self.url(path)).send().await.unwrap()
    }

    async fn board(&self) -> KanbanBoard {
        self.client
            .get(self.url("/api/kanban"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn hierarchy(&self) -> Value {
        self.client
            .get(self.url("/api/hierarchy"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn create_list(&self, title: &str) -> String {
        let resp = self.post("/api/kanban/lists", json!({ "title": title })).await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_card(&self, list_id: &str, title: &str) -> String {
        let resp = self
            .post(
                "/api/kanban/cards",
                json!({ "listId": list_id, "title": title }),
            )
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_node(&self, parent: Option<&str>, body: Value) -> String {
        let path = match parent {
            Some(parent) => format!("/api/hierarchy/{}/child", parent),
            None => "/api/hierarchy/root".to_string(),
        };
        let resp = self.post(&path, body).await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }
}

/// `(listId, position)` per card id.
fn placements(board: &KanbanBoard) -> HashMap<String, (String, i64)> {
    board
        .cards
        .iter()
        .map(|c| (c.id.clone(), (c.list_id.clone(), c.position)))
        .collect()
}

/// Card ids of one list in rank order.
fn column(board: &KanbanBoard, list_id: &str) -> Vec<String> {
    let mut cards: Vec<_> = board.cards.iter().filter(|c| c.list_id == list_id).collect();
    cards.sort_by_key(|c| c.position);
    cards.into_iter().map(|c| c.id.clone()).collect()
}

fn drain(notices: &mut UnboundedReceiver<Notice>) -> Vec<Notice> {
    let mut out = Vec::new();
    while let Ok(notice) = notices.try_recv() {
        out.push(notice);
    }
    out
}

// ==================== HEALTH ====================

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_router_serves_board_without_network() {
    let fixture = TestFixture::new().await;
    let app = create_router(fixture.state.clone());

    let resp = app
        .oneshot(Request::builder().uri("/api/kanban").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

// ==================== BOARD ====================

#[tokio::test]
async fn test_list_and_card_crud() {
    let fixture = TestFixture::new().await;

    let todo = fixture.create_list("Todo").await;
    let done = fixture.create_list("Done").await;

    let board = fixture.board().await;
    assert_eq!(board.lists.len(), 2);
    assert_eq!(board.list(&todo).unwrap().order, 1);
    assert_eq!(board.list(&done).unwrap().order, 2);

    let a = fixture.create_card(&todo, "A").await;
    let b = fixture.create_card(&todo, "B").await;
    let c = fixture.create_card(&todo, "C").await;

    let board = fixture.board().await;
    assert_eq!(column(&board, &todo), vec![a.clone(), b.clone(), c.clone()]);
    assert_eq!(board.card(&c).unwrap().position, 2);

    // Rename a list
    let resp = fixture
        .put(&format!("/api/kanban/lists/{}", todo), json!({ "title": "Backlog" }))
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["title"], "Backlog");

    // Edit card fields
    let resp = fixture
        .put(
            &format!("/api/kanban/cards/{}", b),
            json!({ "description": "details", "assignees": ["ana"], "color": "#ff0000" }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["description"], "details");
    assert_eq!(body["assignees"], json!(["ana"]));
    assert_eq!(body["position"], 1);

    // Deleting the middle card closes the gap
    let resp = fixture.delete(&format!("/api/kanban/cards/{}", b)).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["deleted"], true);

    let board = fixture.board().await;
    assert_eq!(column(&board, &todo), vec![a.clone(), c.clone()]);
    assert_eq!(board.card(&c).unwrap().position, 1);

    // Deleting a list removes its cards
    let resp = fixture.delete(&format!("/api/kanban/lists/{}", todo)).await;
    assert_eq!(resp.status(), 200);
    let board = fixture.board().await;
    assert_eq!(board.lists.len(), 1);
    assert!(board.cards.is_empty());
}

#[tokio::test]
async fn test_blank_title_rejected() {
    let fixture = TestFixture::new().await;

    let resp = fixture.post("/api/kanban/lists", json!({ "title": "   " })).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["detail"], "List title is required");
}

#[tokio::test]
async fn test_card_in_missing_list() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .post("/api/kanban/cards", json!({ "listId": "nope", "title": "A" }))
        .await;
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_server_move_matches_reconcile() {
    let fixture = TestFixture::new().await;

    let todo = fixture.create_list("Todo").await;
    let done = fixture.create_list("Done").await;
    let a = fixture.create_card(&todo, "A").await;
    let b = fixture.create_card(&todo, "B").await;
    let c = fixture.create_card(&todo, "C").await;
    let d = fixture.create_card(&done, "D").await;

    let before = fixture.board().await;
    let drag = DragResult::new(
        b.clone(),
        DragLocation::new(todo.clone(), 1),
        Some(DragLocation::new(done.clone(), 0)),
    );
    let expected = reconcile(&before, &drag).unwrap();

    let resp = fixture
        .put(
            &format!("/api/kanban/cards/{}", b),
            json!({ "listId": done, "position": 0 }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["listId"], done.as_str());
    assert_eq!(body["position"], 0);

    let after = fixture.board().await;
    assert_eq!(placements(&after), placements(&expected));
    assert_eq!(column(&after, &todo), vec![a, c]);
    assert_eq!(column(&after, &done), vec![b, d]);
}

#[tokio::test]
async fn test_move_to_missing_list() {
    let fixture = TestFixture::new().await;

    let todo = fixture.create_list("Todo").await;
    let a = fixture.create_card(&todo, "A").await;

    let resp = fixture
        .put(
            &format!("/api/kanban/cards/{}", a),
            json!({ "listId": "ghost", "position": 0 }),
        )
        .await;
    assert_eq!(resp.status(), 404);

    let board = fixture.board().await;
    assert_eq!(board.card(&a).unwrap().list_id, todo);
}

#[tokio::test]
async fn test_overlapping_moves_all_succeed() {
    let fixture = TestFixture::new().await;

    let todo = fixture.create_list("Todo").await;
    let done = fixture.create_list("Done").await;
    let mut cards = Vec::new();
    for i in 0..20 {
        cards.push(fixture.create_card(&todo, &format!("Card {}", i)).await);
    }

    let mut moves = tokio::task::JoinSet::new();
    for (i, card) in cards.iter().enumerate() {
        let client = fixture.client.clone();
        let url = fixture.url(&format!("/api/kanban/cards/{}", card));
        let target = if i % 2 == 0 { &todo } else { &done };
        let body = json!({ "listId": target, "position": 0 });
        moves.spawn(async move { client.put(url).json(&body).send().await.unwrap().status() });
    }
    while let Some(status) = moves.join_next().await {
        assert_eq!(status.unwrap(), 200);
    }

    let board = fixture.board().await;
    assert_eq!(board.cards.len(), 20);
    for list_id in [&todo, &done] {
        let mut positions: Vec<i64> = board
            .cards
            .iter()
            .filter(|c| &c.list_id == list_id)
            .map(|c| c.position)
            .collect();
        positions.sort();
        assert_eq!(positions, (0..10).collect::<Vec<i64>>());
    }
}

// ==================== HIERARCHY ====================

#[tokio::test]
async fn test_hierarchy_nesting_and_categories() {
    let fixture = TestFixture::new().await;

    let root = fixture
        .create_node(
            None,
            json!({
                "name": "HQ",
                "category": "Building",
                "responsibles": [{ "name": "Ana", "username": "ana", "isPrimary": true }]
            }),
        )
        .await;
    let child = fixture
        .create_node(
            Some(&root),
            json!({
                "name": "Floor 1",
                "category": "building",
                "responsibles": [{ "name": "Bruno", "isPrimary": true }]
            }),
        )
        .await;
    fixture
        .create_node(
            Some(&child),
            json!({ "name": "Room 101", "category": "Room", "responsibles": [] }),
        )
        .await;

    let body = fixture.hierarchy().await;
    let nodes = body["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0]["name"], "HQ");
    assert_eq!(nodes[0]["children"][0]["name"], "Floor 1");
    assert_eq!(nodes[0]["children"][0]["parentId"], root.as_str());
    assert_eq!(nodes[0]["children"][0]["children"][0]["name"], "Room 101");
    assert_eq!(body["categories"], json!(["Building", "Room"]));
}

#[tokio::test]
async fn test_child_of_missing_parent() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .post(
            "/api/hierarchy/ghost/child",
            json!({ "name": "Orphan", "responsibles": [] }),
        )
        .await;
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_update_and_delete_subtree() {
    let fixture = TestFixture::new().await;

    let root = fixture
        .create_node(None, json!({ "name": "HQ", "responsibles": [] }))
        .await;
    let child = fixture
        .create_node(Some(&root), json!({ "name": "Floor 1", "responsibles": [] }))
        .await;
    fixture
        .create_node(Some(&child), json!({ "name": "Room 101", "responsibles": [] }))
        .await;
    let other = fixture
        .create_node(None, json!({ "name": "Warehouse", "responsibles": [] }))
        .await;

    let resp = fixture
        .put(&format!("/api/hierarchy/{}", other), json!({ "name": "Depot" }))
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["name"], "Depot");

    let resp = fixture.delete(&format!("/api/hierarchy/{}", root)).await;
    assert_eq!(resp.status(), 200);

    let body = fixture.hierarchy().await;
    let nodes = body["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0]["name"], "Depot");
    assert!(fixture.state.repo.get_node(&child).await.unwrap().is_none());
}

// ==================== CLIENT STORES ====================

#[tokio::test]
async fn test_board_store_confirmed_move() {
    let fixture = TestFixture::new().await;

    let todo = fixture.create_list("Todo").await;
    let done = fixture.create_list("Done").await;
    let a = fixture.create_card(&todo, "A").await;
    let b = fixture.create_card(&todo, "B").await;

    let (store, mut notices) = fixture.board_store();
    store.load().await.unwrap();
    assert_eq!(store.board().cards.len(), 2);

    let updates = store.subscribe();

    let drag = DragResult::new(
        a.clone(),
        DragLocation::new(todo.clone(), 0),
        Some(DragLocation::new(done.clone(), 0)),
    );
    assert_eq!(store.apply_drag(&drag).await, MoveOutcome::Confirmed);
    assert!(updates.has_changed().unwrap());

    let local = store.board();
    assert_eq!(column(&local, &done), vec![a.clone()]);
    assert_eq!(column(&local, &todo), vec![b.clone()]);
    assert_eq!(local.card(&b).unwrap().position, 0);

    let server = fixture.board().await;
    assert_eq!(placements(&server), placements(&local));
    assert!(drain(&mut notices).iter().all(|n| !n.is_error()));
}

#[tokio::test]
async fn test_board_store_reverts_rejected_move() {
    let fixture = TestFixture::new().await;

    let todo = fixture.create_list("Todo").await;
    let a = fixture.create_card(&todo, "A").await;

    let (store, mut notices) = fixture.board_store();
    store.load().await.unwrap();
    let before = store.board();

    let drag = DragResult::new(
        a.clone(),
        DragLocation::new(todo.clone(), 0),
        Some(DragLocation::new("ghost", 0)),
    );
    match store.apply_drag(&drag).await {
        MoveOutcome::Reverted(err) => assert!(err.is_not_found()),
        other => panic!("expected a reverted move, got {:?}", other),
    }

    assert_eq!(placements(&store.board()), placements(&before));
    let notices = drain(&mut notices);
    assert!(notices.iter().any(|n| n.is_error()));
}

#[tokio::test]
async fn test_board_store_ignores_cancelled_drag() {
    let fixture = TestFixture::new().await;

    let todo = fixture.create_list("Todo").await;
    let a = fixture.create_card(&todo, "A").await;

    let (store, _notices) = fixture.board_store();
    store.load().await.unwrap();

    let drag = DragResult::new(a, DragLocation::new(todo, 0), None);
    assert_eq!(store.apply_drag(&drag).await, MoveOutcome::Ignored);
}

#[tokio::test]
async fn test_board_store_column_search() {
    let fixture = TestFixture::new().await;

    let todo = fixture.create_list("Todo").await;
    fixture.create_card(&todo, "Paint walls").await;
    let b = fixture.create_card(&todo, "Order chairs").await;

    let (store, _notices) = fixture.board_store();
    store.load().await.unwrap();

    assert_eq!(store.column(&todo, "").len(), 2);
    let found = store.column(&todo, "CHAIR");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, b);
}

#[tokio::test]
async fn test_board_store_rejects_blank_list() {
    let fixture = TestFixture::new().await;

    let (store, mut notices) = fixture.board_store();
    assert!(store.create_list("  ").await.is_err());
    assert_eq!(
        drain(&mut notices),
        vec![Notice::Error("List title is required.".to_string())]
    );

    store.create_list("Todo").await.unwrap();
    assert_eq!(store.board().lists.len(), 1);
    assert_eq!(
        drain(&mut notices),
        vec![Notice::Success("List created!".to_string())]
    );
}

#[tokio::test]
async fn test_hierarchy_store_inheritance() {
    let fixture = TestFixture::new().await;

    let root = fixture
        .create_node(
            None,
            json!({
                "name": "HQ",
                "responsibles": [
                    { "name": "Ana", "username": "ana", "isPrimary": true },
                    { "name": "Bruno" }
                ]
            }),
        )
        .await;

    let (store, mut notices) = fixture.hierarchy_store();
    store.load().await.unwrap();

    let form = store.new_child_form(&root);
    assert_eq!(form.responsibles.len(), 2);
    assert!(form.responsibles[0].is_primary);
    assert!(!form.responsibles[1].is_primary);

    // A child with nobody responsible is refused before any request
    let empty = NodeRequest {
        name: "Floor 1".to_string(),
        ..Default::default()
    };
    assert!(store.create_child(&root, empty).await.is_err());
    assert!(drain(&mut notices).iter().any(|n| n.is_error()));

    let request = NodeRequest {
        name: "Floor 1".to_string(),
        responsibles: vec![Responsible::named("Carla").with_username("carla")],
        ..Default::default()
    };
    let child = store.create_child(&root, request).await.unwrap();
    assert_eq!(child.parent_id.as_deref(), Some(root.as_str()));
    assert!(child.responsibles[0].is_primary);

    let effective: Vec<String> = store
        .effective_for(&child.id)
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(effective, vec!["Carla", "Ana", "Bruno"]);
}

#[tokio::test]
async fn test_run_commands() {
    let fixture = TestFixture::new().await;

    let todo = fixture.create_list("Todo").await;
    let a = fixture.create_card(&todo, "A").await;
    let b = fixture.create_card(&todo, "B").await;
    let root = fixture
        .create_node(None, json!({ "name": "HQ", "responsibles": [] }))
        .await;

    let (board, _board_notices) = fixture.board_store();
    let (hierarchy, _hierarchy_notices) = fixture.hierarchy_store();
    let (commands, receiver) = command_channel(8);

    commands
        .send(Command::DeleteCard { card_id: a })
        .await
        .unwrap();
    commands
        .send(Command::DeleteNode { node_id: root })
        .await
        .unwrap();
    drop(commands);

    run_commands(receiver, &board, &hierarchy).await;

    let server = fixture.board().await;
    assert_eq!(column(&server, &todo), vec![b.clone()]);
    assert_eq!(server.card(&b).unwrap().position, 0);
    assert_eq!(board.board().cards.len(), 1);
    assert!(hierarchy.view().index.is_empty());
}
