//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for the board and the hierarchy.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS kanban_lists (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS kanban_cards (
            id TEXT PRIMARY KEY,
            list_id TEXT NOT NULL REFERENCES kanban_lists(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            description TEXT,
            assignees TEXT NOT NULL DEFAULT '[]',
            due_date TEXT,
            color TEXT,
            position INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Flat parent links are the only stored tree shape.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS hierarchy_nodes (
            id TEXT PRIMARY KEY,
            parent_id TEXT REFERENCES hierarchy_nodes(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT,
            color TEXT,
            category TEXT,
            responsibles TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS hierarchy_categories (
            name TEXT PRIMARY KEY COLLATE NOCASE,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_cards_list_position ON kanban_cards(list_id, position);
        CREATE INDEX IF NOT EXISTS idx_lists_order ON kanban_lists(sort_order);
        CREATE INDEX IF NOT EXISTS idx_nodes_parent ON hierarchy_nodes(parent_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
