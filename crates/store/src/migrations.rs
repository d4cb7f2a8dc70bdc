//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use catalens_common::{CatalogError, Result};

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| CatalogError::storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version = current_version(conn)?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: product_catalog");
    }

    Ok(())
}

/// Highest applied schema version, 0 for a fresh database.
pub fn current_version(conn: &Connection) -> Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
    .map_err(|e| CatalogError::storage(format!("Failed to query migration version: {}", e)))
}

/// Version 1: product table and catalog metadata.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        BEGIN;

        CREATE TABLE IF NOT EXISTS products (
            id          TEXT PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL CHECK (length(name) > 0),
            owner       TEXT NOT NULL CHECK (length(owner) > 0),
            image_path  TEXT NOT NULL,
            embedding   BLOB NOT NULL,
            dimension   INTEGER NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_products_owner
            ON products (owner, created_at);

        CREATE INDEX IF NOT EXISTS idx_products_created_at
            ON products (created_at);

        -- Store-wide settings such as the embedding dimension.
        CREATE TABLE IF NOT EXISTS catalog_meta (
            key     TEXT PRIMARY KEY NOT NULL,
            value   TEXT NOT NULL
        );

        INSERT INTO schema_migrations (version, name) VALUES (1, 'product_catalog');

        COMMIT;
        ",
    )
    .map_err(|e| CatalogError::storage(format!("Failed to apply migration v1: {}", e)))
}
