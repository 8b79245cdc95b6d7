//! Catalog store

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{Item, ItemDraft, LoanRecord},
    store::{LendingStore, WriteOp},
};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn LendingStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn LendingStore>) -> Self {
        Self { store }
    }

    /// Add copies of an item, creating it on first sight.
    ///
    /// Repeated upserts of the same title/author/edition resolve to one
    /// record and add to both counters; `created_at` keeps its first value.
    #[tracing::instrument(skip(self))]
    pub async fn upsert(
        &self,
        title: &str,
        author: &str,
        edition: &str,
        copies: i32,
    ) -> AppResult<Item> {
        if title.is_empty() || author.is_empty() || edition.is_empty() {
            return Err(AppError::Validation(
                "title, author, edition and copies are required".to_string(),
            ));
        }
        if copies <= 0 {
            return Err(AppError::Validation(
                "copies must be greater than 0".to_string(),
            ));
        }

        let draft = ItemDraft::new(title, author, edition, copies);
        let item = self.store.merge_item(&draft).await?;

        tracing::info!(
            item_id = %item.item_id,
            total = item.total_copies,
            available = item.available_copies,
            "Item added/updated"
        );
        Ok(item)
    }

    /// Get item by ID
    pub async fn get_item(&self, item_id: &str) -> AppResult<Item> {
        self.store
            .get_item(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {} not found", item_id)))
    }

    /// Raw ordered scan; see [`super::browser::CatalogBrowser`] for paging
    pub async fn list(&self, limit: i64, after: Option<&str>) -> AppResult<Vec<Item>> {
        Ok(self.store.list_items(limit, after).await?)
    }

    /// Ledger entries of an item, newest first
    pub async fn loans(&self, item_id: &str) -> AppResult<Vec<LoanRecord>> {
        self.get_item(item_id).await?;
        Ok(self.store.loans_by_item(item_id).await?)
    }

    /// Availability decrement, only ever committed inside a loan grant
    pub(crate) fn decrement_availability(item_id: &str) -> WriteOp {
        WriteOp::DecrementAvailable {
            item_id: item_id.to_string(),
        }
    }
}
