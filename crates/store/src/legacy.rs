//! Import from the earlier single-table catalog layout.
//!
//! That layout kept one `products` table with the owner in either a
//! `user_id` or an older `user_phone` column, embeddings as JSON text,
//! SQLite `CURRENT_TIMESTAMP` text times and image paths relative to the
//! service directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use catalens_common::{CatalogError, Result};

use crate::images::ImageStore;
use crate::repository::ProductRepository;
use crate::types::NewProduct;

/// Outcome of a legacy import
#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportReport {
    /// Rows inserted into the catalog
    pub imported: usize,

    /// Rows already present (same id)
    pub already_present: usize,

    /// Rows that could not be imported, with the reason
    pub skipped: Vec<String>,
}

struct LegacyRow {
    id: String,
    name: String,
    owner: String,
    image_path: String,
    embedding: String,
    created_at: Option<String>,
}

/// Formats SQLite and the legacy service wrote timestamps in, all UTC
const LEGACY_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Import every row of a legacy database
///
/// Relative image paths resolve against `legacy_root`. Images are copied
/// into `images` under the current naming scheme. Rows keep their legacy
/// `created_at`; rows without a readable one get a fresh timestamp.
/// Re-running the import is safe:
/// ids already in the catalog are counted, not duplicated.
pub async fn import_legacy(
    legacy_db: &Path,
    legacy_root: &Path,
    repository: &ProductRepository,
    images: &ImageStore,
) -> Result<ImportReport> {
    let rows = read_legacy_rows(legacy_db)?;
    info!("Importing {} legacy rows from {}", rows.len(), legacy_db.display());

    let mut report = ImportReport::default();

    for row in rows {
        match import_row(&row, legacy_root, repository, images).await {
            Ok(true) => report.imported += 1,
            Ok(false) => report.already_present += 1,
            Err(e) => {
                warn!("Skipping legacy product {}: {}", row.id, e);
                report.skipped.push(format!("{}: {}", row.id, e));
            }
        }
    }

    info!(
        "Legacy import finished: {} imported, {} already present, {} skipped",
        report.imported,
        report.already_present,
        report.skipped.len()
    );
    Ok(report)
}

async fn import_row(
    row: &LegacyRow,
    legacy_root: &Path,
    repository: &ProductRepository,
    images: &ImageStore,
) -> Result<bool> {
    let id = Uuid::parse_str(row.id.trim())
        .map_err(|e| CatalogError::invalid_input(format!("invalid id: {}", e)))?;

    match repository.get_by_id(id) {
        Ok(_) => return Ok(false),
        Err(CatalogError::NotFound(_)) => {}
        Err(e) => return Err(e),
    }

    let embedding: Vec<f32> = serde_json::from_str(&row.embedding)
        .map_err(|e| CatalogError::invalid_input(format!("unreadable embedding: {}", e)))?;
    if embedding.len() != repository.dimension() {
        return Err(CatalogError::dimension_mismatch(
            repository.dimension(),
            embedding.len(),
        ));
    }

    let source = resolve_image_path(&row.image_path, legacy_root);
    let bytes = images.read(&source).await?;
    let extension = source
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("img")
        .to_string();

    let image_path = images.save(id, &extension, &bytes).await?;

    let created_at = row.created_at.as_deref().and_then(|raw| {
        let parsed = parse_legacy_time(raw);
        if parsed.is_none() {
            warn!("Unreadable created_at '{}' on legacy product {}", raw, id);
        }
        parsed
    });

    let insert = repository.insert(NewProduct {
        id,
        name: row.name.clone(),
        owner: row.owner.clone(),
        image_path: image_path.clone(),
        embedding,
        created_at,
    });

    if let Err(e) = insert {
        images.remove(&image_path).await?;
        return Err(e);
    }

    Ok(true)
}

fn parse_legacy_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    LEGACY_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn resolve_image_path(raw: &str, legacy_root: &Path) -> PathBuf {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        path
    } else {
        legacy_root.join(path)
    }
}

fn read_legacy_rows(legacy_db: &Path) -> Result<Vec<LegacyRow>> {
    if !legacy_db.exists() {
        return Err(CatalogError::not_found(format!(
            "Legacy database {} does not exist",
            legacy_db.display()
        )));
    }

    let conn = Connection::open_with_flags(legacy_db, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| CatalogError::storage(format!("Failed to open legacy database: {}", e)))?;

    let owner_column = legacy_owner_column(&conn)?;

    // owner_column comes from a fixed whitelist
    let sql = format!(
        "SELECT id, name, {}, image_path, embedding, created_at FROM products ORDER BY created_at, rowid",
        owner_column
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| CatalogError::storage(format!("Failed to query legacy products: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            Ok(LegacyRow {
                id: row.get(0)?,
                name: row.get(1)?,
                owner: row.get(2)?,
                image_path: row.get(3)?,
                embedding: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .map_err(|e| CatalogError::storage(format!("Failed to read legacy products: {}", e)))?;

    let rows = rows
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| CatalogError::storage(format!("Failed to read legacy row: {}", e)))?;
    Ok(rows)
}

/// Which owner column the legacy table carries
fn legacy_owner_column(conn: &Connection) -> Result<&'static str> {
    let mut stmt = conn
        .prepare("PRAGMA table_info(products)")
        .map_err(|e| CatalogError::storage(format!("Failed to inspect legacy schema: {}", e)))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|e| CatalogError::storage(format!("Failed to inspect legacy schema: {}", e)))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| CatalogError::storage(format!("Failed to inspect legacy schema: {}", e)))?;

    if columns.iter().any(|c| c == "user_id") {
        Ok("user_id")
    } else if columns.iter().any(|c| c == "user_phone") {
        Ok("user_phone")
    } else {
        Err(CatalogError::invalid_input(
            "Legacy products table has neither user_id nor user_phone",
        ))
    }
}
