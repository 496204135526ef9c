use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{format_data_sources, SourceKind, VideoMetadata};

/// A stored recipe row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Recipe {
    pub id: i64,
    pub item_id: String,
    pub title: String,
    pub description: Option<String>,
    pub ingredients: Option<String>,
    pub dish_name: Option<String>,
    pub url: String,
    pub data_sources: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A recipe about to be inserted; `created_at` is assigned by the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewRecipe {
    pub item_id: String,
    pub title: String,
    pub description: String,
    /// Canonical comma-separated list; empty string when extraction failed
    pub ingredients: String,
    pub dish_name: String,
    pub url: String,
    pub data_sources: String,
}

impl NewRecipe {
    pub fn from_extraction(
        metadata: &VideoMetadata,
        dish_name: String,
        ingredients: String,
        sources: &[SourceKind],
    ) -> Self {
        Self {
            item_id: metadata.item_id.clone(),
            title: metadata.title.clone(),
            description: metadata.description.clone(),
            ingredients,
            dish_name,
            url: metadata.url.clone(),
            data_sources: format_data_sources(sources),
        }
    }
}
