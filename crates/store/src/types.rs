use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// A persisted catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    /// Product ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Uploading user
    pub owner: String,

    /// Path of the stored image file
    pub image_path: PathBuf,

    /// Unit-length feature vector
    pub embedding: Vec<f32>,

    /// Insertion time
    pub created_at: DateTime<Utc>,
}

impl ProductRecord {
    /// Metadata view without the embedding
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id,
            name: self.name.clone(),
            owner: self.owner.clone(),
            created_at: self.created_at,
        }
    }
}

/// A record about to be inserted
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub id: Uuid,
    pub name: String,
    pub owner: String,
    pub image_path: PathBuf,
    pub embedding: Vec<f32>,

    /// Imported rows keep their original time; `None` lets the store assign one
    pub created_at: Option<DateTime<Utc>>,
}

/// Product metadata as exposed to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
}
