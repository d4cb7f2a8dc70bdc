//! Product repository over the SQLite catalog.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};
use uuid::Uuid;

use catalens_common::{CatalogError, Result};
use catalens_vector::{check_unit_norm, decode_embedding, encode_embedding};

use crate::db::Database;
use crate::types::{NewProduct, ProductRecord, ProductSummary};

const DIMENSION_KEY: &str = "embedding_dim";

const SELECT_COLUMNS: &str = "SELECT id, name, owner, image_path, embedding, created_at FROM products";

/// Repository for product records.
pub struct ProductRepository {
    db: Arc<Database>,
    dimension: usize,
}

impl ProductRepository {
    /// Bind the repository to a database and an embedding dimension.
    ///
    /// The first repository opened on a database records the dimension;
    /// later opens with a different one fail, since every stored vector
    /// would be unusable.
    pub fn new(db: Arc<Database>, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(CatalogError::config("Embedding dimension cannot be 0"));
        }

        db.with_conn(|conn| {
            let stored: Option<String> = conn
                .query_row(
                    "SELECT value FROM catalog_meta WHERE key = ?1",
                    [DIMENSION_KEY],
                    |row| row.get(0),
                )
                .optional()
                .map_err(storage_err("read catalog metadata"))?;

            match stored {
                None => {
                    conn.execute(
                        "INSERT INTO catalog_meta (key, value) VALUES (?1, ?2)",
                        rusqlite::params![DIMENSION_KEY, dimension.to_string()],
                    )
                    .map_err(storage_err("write catalog metadata"))?;
                    info!("Catalog initialized with embedding dimension {}", dimension);
                    Ok(())
                }
                Some(value) => {
                    let stored: usize = value.parse().map_err(|_| {
                        CatalogError::storage(format!("Corrupt embedding dimension '{}'", value))
                    })?;
                    if stored != dimension {
                        return Err(CatalogError::config(format!(
                            "Catalog was created with {}-dimensional embeddings, but {} is configured",
                            stored, dimension
                        )));
                    }
                    Ok(())
                }
            }
        })?;

        Ok(Self { db, dimension })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Insert a new product.
    ///
    /// Fails with `DuplicateKey` if the id exists. A store-assigned
    /// `created_at` never goes backwards relative to earlier inserts, even
    /// if the clock does. A caller-supplied one is kept as given.
    pub fn insert(&self, product: NewProduct) -> Result<ProductRecord> {
        if product.name.trim().is_empty() {
            return Err(CatalogError::invalid_input("Product name cannot be empty"));
        }
        if product.owner.trim().is_empty() {
            return Err(CatalogError::invalid_input("Owner cannot be empty"));
        }
        if product.embedding.len() != self.dimension {
            return Err(CatalogError::dimension_mismatch(
                self.dimension,
                product.embedding.len(),
            ));
        }
        check_unit_norm(&product.embedding)?;

        let blob = encode_embedding(&product.embedding);

        let created_at = self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(storage_err("begin insert"))?;

            let created_at = match product.created_at {
                Some(ts) => ts.trunc_subsecs(6),
                None => next_timestamp(&tx)?,
            };
            tx.execute(
                "INSERT INTO products (id, name, owner, image_path, embedding, dimension, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    product.id.to_string(),
                    product.name,
                    product.owner,
                    product.image_path.to_string_lossy(),
                    blob,
                    self.dimension as i64,
                    format_timestamp(&created_at),
                ],
            )
            .map_err(|e| {
                if is_primary_key_violation(&e) {
                    CatalogError::duplicate_key(format!("Product {} already exists", product.id))
                } else {
                    CatalogError::storage(format!("Failed to insert product: {}", e))
                }
            })?;

            tx.commit().map_err(storage_err("commit insert"))?;
            Ok(created_at)
        })?;

        debug!("Inserted product {} for owner {}", product.id, product.owner);

        Ok(ProductRecord {
            id: product.id,
            name: product.name,
            owner: product.owner,
            image_path: product.image_path,
            embedding: product.embedding,
            created_at,
        })
    }

    /// Every stored product, oldest first.
    pub fn list_all(&self) -> Result<Vec<ProductRecord>> {
        self.query_records(
            &format!("{} ORDER BY created_at, rowid", SELECT_COLUMNS),
            rusqlite::params![],
        )
    }

    /// Products of one owner, oldest first. Empty when the owner has none.
    pub fn list_by_owner(&self, owner: &str) -> Result<Vec<ProductRecord>> {
        self.query_records(
            &format!("{} WHERE owner = ?1 ORDER BY created_at, rowid", SELECT_COLUMNS),
            rusqlite::params![owner],
        )
    }

    /// Find a product by ID.
    pub fn get_by_id(&self, id: Uuid) -> Result<ProductRecord> {
        let mut records = self.query_records(
            &format!("{} WHERE id = ?1", SELECT_COLUMNS),
            rusqlite::params![id.to_string()],
        )?;
        records
            .pop()
            .ok_or_else(|| CatalogError::not_found(format!("Product {} not found", id)))
    }

    /// Metadata listing, skipping embedding decode.
    pub fn list_summaries(&self, owner: Option<&str>) -> Result<Vec<ProductSummary>> {
        self.db.with_conn(|conn| {
            let (sql, params): (&str, Vec<String>) = match owner {
                Some(owner) => (
                    "SELECT id, name, owner, created_at FROM products
                     WHERE owner = ?1 ORDER BY created_at, rowid",
                    vec![owner.to_string()],
                ),
                None => (
                    "SELECT id, name, owner, created_at FROM products ORDER BY created_at, rowid",
                    Vec::new(),
                ),
            };

            let mut stmt = conn.prepare(sql).map_err(storage_err("prepare listing"))?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })
                .map_err(storage_err("query listing"))?;

            let mut summaries = Vec::new();
            for row in rows {
                let (id, name, owner, created_at) = row.map_err(storage_err("read listing row"))?;
                summaries.push(ProductSummary {
                    id: parse_id(&id)?,
                    name,
                    owner,
                    created_at: parse_timestamp(&created_at)?,
                });
            }
            Ok(summaries)
        })
    }

    /// Count stored products.
    pub fn count(&self) -> Result<u64> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
                .map_err(storage_err("count products"))?;
            Ok(count as u64)
        })
    }

    fn query_records<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<ProductRecord>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(sql).map_err(storage_err("prepare query"))?;
            let rows = stmt
                .query_map(params, |row| {
                    Ok(RawRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        owner: row.get(2)?,
                        image_path: row.get(3)?,
                        embedding: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })
                .map_err(storage_err("query products"))?;

            let mut records = Vec::new();
            for row in rows {
                let raw = row.map_err(storage_err("read product row"))?;
                records.push(raw.into_record(self.dimension)?);
            }
            Ok(records)
        })
    }
}

struct RawRow {
    id: String,
    name: String,
    owner: String,
    image_path: String,
    embedding: Vec<u8>,
    created_at: String,
}

impl RawRow {
    fn into_record(self, dimension: usize) -> Result<ProductRecord> {
        Ok(ProductRecord {
            id: parse_id(&self.id)?,
            name: self.name,
            owner: self.owner,
            image_path: PathBuf::from(self.image_path),
            embedding: decode_embedding(&self.embedding, dimension)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

fn storage_err(context: &'static str) -> impl Fn(rusqlite::Error) -> CatalogError {
    move |e| CatalogError::storage(format!("Failed to {}: {}", context, e))
}

fn is_primary_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| CatalogError::storage(format!("Corrupt product id '{}': {}", raw, e)))
}

/// Fixed-width RFC 3339, so text order equals time order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| CatalogError::storage(format!("Corrupt timestamp '{}': {}", raw, e)))
}

fn next_timestamp(conn: &Connection) -> Result<DateTime<Utc>> {
    let latest: Option<String> = conn
        .query_row("SELECT MAX(created_at) FROM products", [], |row| row.get(0))
        .map_err(storage_err("read latest timestamp"))?;

    // Stored at microsecond precision; truncate so the returned record
    // equals what a later read produces.
    let now = Utc::now().trunc_subsecs(6);
    match latest {
        Some(latest) => Ok(now.max(parse_timestamp(&latest)?)),
        None => Ok(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(dim: usize) -> ProductRepository {
        ProductRepository::new(Arc::new(Database::in_memory().unwrap()), dim).unwrap()
    }

    fn unit(v: &[f32]) -> Vec<f32> {
        let n = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        v.iter().map(|x| x / n).collect()
    }

    fn product(name: &str, owner: &str, embedding: Vec<f32>) -> NewProduct {
        let id = Uuid::new_v4();
        NewProduct {
            id,
            name: name.to_string(),
            owner: owner.to_string(),
            image_path: PathBuf::from(format!("uploads/{}.png", id)),
            embedding,
            created_at: None,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let repo = repo(3);
        let stored = repo
            .insert(product("Red mug", "u1", unit(&[1.0, 2.0, 2.0])))
            .unwrap();

        let fetched = repo.get_by_id(stored.id).unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(fetched.name, "Red mug");
        assert_eq!(fetched.owner, "u1");
    }

    #[test]
    fn test_duplicate_key() {
        let repo = repo(2);
        let first = product("a", "u1", unit(&[1.0, 0.0]));
        let mut second = product("b", "u2", unit(&[0.0, 1.0]));
        second.id = first.id;

        repo.insert(first).unwrap();
        let err = repo.insert(second).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateKey(_)));
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let repo = repo(2);
        let err = repo.get_by_id(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[test]
    fn test_owner_partitioning() {
        let repo = repo(2);
        for (name, owner) in [("a", "u1"), ("b", "u2"), ("c", "u1"), ("d", "u3")] {
            repo.insert(product(name, owner, unit(&[1.0, 1.0]))).unwrap();
        }

        let all = repo.list_all().unwrap();
        assert_eq!(all.len(), 4);

        let mut union = Vec::new();
        for owner in ["u1", "u2", "u3"] {
            let subset = repo.list_by_owner(owner).unwrap();
            assert!(subset.iter().all(|r| r.owner == owner));
            assert!(subset.iter().all(|r| all.contains(r)));
            union.extend(subset);
        }
        union.sort_by_key(|r| r.id);
        let mut all_sorted = all.clone();
        all_sorted.sort_by_key(|r| r.id);
        assert_eq!(union, all_sorted);

        assert!(repo.list_by_owner("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_created_at_non_decreasing() {
        let repo = repo(2);
        for i in 0..20 {
            repo.insert(product(&format!("p{}", i), "u1", unit(&[1.0, i as f32])))
                .unwrap();
        }
        let all = repo.list_all().unwrap();
        assert!(all.windows(2).all(|w| w[0].created_at <= w[1].created_at));
        let names: Vec<_> = all.iter().map(|r| r.name.clone()).collect();
        let expected: Vec<_> = (0..20).map(|i| format!("p{}", i)).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_rejects_bad_embeddings() {
        let repo = repo(2);
        let err = repo.insert(product("a", "u1", unit(&[1.0, 0.0, 0.0]))).unwrap_err();
        assert!(matches!(err, CatalogError::DimensionMismatch { .. }));

        let err = repo.insert(product("a", "u1", vec![0.0, 0.0])).unwrap_err();
        assert!(matches!(err, CatalogError::DegenerateVector(_)));

        let err = repo.insert(product("a", "u1", vec![3.0, 4.0])).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));

        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_rejects_blank_fields() {
        let repo = repo(2);
        let err = repo.insert(product("  ", "u1", unit(&[1.0, 0.0]))).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));
        let err = repo.insert(product("a", "", unit(&[1.0, 0.0]))).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));
    }

    #[test]
    fn test_dimension_is_fixed_per_store() {
        let db = Arc::new(Database::in_memory().unwrap());
        ProductRepository::new(db.clone(), 4).unwrap();
        assert!(ProductRepository::new(db.clone(), 4).is_ok());
        let err = ProductRepository::new(db, 8).err().unwrap();
        assert!(matches!(err, CatalogError::Config(_)));
    }

    #[test]
    fn test_summaries_match_records() {
        let repo = repo(2);
        let a = repo.insert(product("a", "u1", unit(&[1.0, 0.0]))).unwrap();
        let b = repo.insert(product("b", "u2", unit(&[0.0, 1.0]))).unwrap();

        assert_eq!(
            repo.list_summaries(None).unwrap(),
            vec![a.summary(), b.summary()]
        );
        assert_eq!(repo.list_summaries(Some("u2")).unwrap(), vec![b.summary()]);
        assert!(repo.list_summaries(Some("u9")).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_inserts() {
        let repo = Arc::new(repo(2));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let repo = repo.clone();
                std::thread::spawn(move || {
                    (0..10)
                        .map(|i| {
                            repo.insert(product(
                                &format!("t{}-{}", t, i),
                                &format!("u{}", t),
                                unit(&[1.0, (t * 10 + i) as f32]),
                            ))
                            .unwrap()
                            .id
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: Vec<Uuid> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(repo.count().unwrap(), 80);
        for id in ids {
            assert!(repo.get_by_id(id).is_ok());
        }
    }
}
