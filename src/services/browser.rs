//! Paginated, read-only catalog traversal.
//!
//! Pages are cut by item id; the cursor is the last id of the previous page.
//! Not transactional: concurrent upserts may or may not show up in later pages.

use crate::{
    config::CatalogConfig,
    error::{AppError, AppResult},
    models::ItemPage,
    services::catalog::CatalogService,
};

#[derive(Clone)]
pub struct CatalogBrowser {
    catalog: CatalogService,
    config: CatalogConfig,
}

impl CatalogBrowser {
    pub fn new(catalog: CatalogService, config: CatalogConfig) -> Self {
        Self { catalog, config }
    }

    pub async fn page(&self, limit: Option<i64>, cursor: Option<&str>) -> AppResult<ItemPage> {
        let limit = limit.unwrap_or(self.config.default_page_size);
        if limit <= 0 {
            return Err(AppError::Validation("limit must be greater than 0".to_string()));
        }
        let limit = limit.min(self.config.max_page_size);

        // One extra row tells us whether another page exists
        let mut items = self.catalog.list(limit + 1, cursor).await?;
        let next_cursor = if items.len() as i64 > limit {
            items.truncate(limit as usize);
            items.last().map(|item| item.item_id.clone())
        } else {
            None
        };

        Ok(ItemPage { items, next_cursor })
    }
}
