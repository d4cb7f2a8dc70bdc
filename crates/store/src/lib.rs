//! Catalens catalog persistence
//!
//! SQLite-backed product records and the on-disk image files they point at.

pub mod db;
pub mod images;
pub mod legacy;
pub mod migrations;
pub mod repository;
pub mod types;

pub use db::Database;
pub use images::ImageStore;
pub use legacy::{import_legacy, ImportReport};
pub use repository::ProductRepository;
pub use types::{NewProduct, ProductRecord, ProductSummary};
