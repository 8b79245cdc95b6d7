//! Catalog item model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::identity::derive_item_id;

/// Catalog item with its copy counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Item {
    /// Derived identity, see [`crate::identity`]
    pub item_id: String,
    pub title: String,
    pub author: String,
    pub edition: String,
    pub total_copies: i32,
    /// Always within `0..=total_copies`
    pub available_copies: i32,
    /// First write; merges never touch it
    pub created_at: DateTime<Utc>,
}

/// Additive upsert payload handed to the store
#[derive(Debug, Clone)]
pub struct ItemDraft {
    pub item_id: String,
    pub title: String,
    pub author: String,
    pub edition: String,
    pub copies: i32,
    pub created_at: DateTime<Utc>,
}

impl ItemDraft {
    pub fn new(title: &str, author: &str, edition: &str, copies: i32) -> Self {
        Self {
            item_id: derive_item_id(title, author, edition),
            title: title.to_string(),
            author: author.to_string(),
            edition: edition.to_string(),
            copies,
            created_at: Utc::now(),
        }
    }

    /// The record created when nothing exists under this identity yet
    pub fn into_item(self) -> Item {
        Item {
            item_id: self.item_id,
            title: self.title,
            author: self.author,
            edition: self.edition,
            total_copies: self.copies,
            available_copies: self.copies,
            created_at: self.created_at,
        }
    }
}

/// Catalog upsert request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpsertItem {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "author is required"))]
    pub author: String,
    #[validate(length(min = 1, message = "edition is required"))]
    pub edition: String,
    /// Copies to add, must be greater than 0
    #[validate(range(min = 1, message = "copies must be greater than 0"))]
    pub copies: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpsertItemResponse {
    pub item_id: String,
    pub message: String,
}

/// Catalog listing query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ItemQuery {
    /// Page size (default: 10)
    pub limit: Option<i64>,
    /// `next_cursor` of the previous page
    pub cursor: Option<String>,
}

/// One page of the catalog
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemPage {
    pub items: Vec<Item>,
    /// Absent once the catalog is exhausted
    pub next_cursor: Option<String>,
}
