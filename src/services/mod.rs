//! Business logic services

pub mod browser;
pub mod catalog;
pub mod loans;
pub mod members;
pub mod notifications;

use std::sync::Arc;

use crate::{config::CatalogConfig, error::AppResult, store::LendingStore};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub members: members::MembersService,
    pub catalog: catalog::CatalogService,
    pub browser: browser::CatalogBrowser,
    pub loans: loans::LoansService,
    store: Arc<dyn LendingStore>,
}

impl Services {
    /// Create all services on top of the given store
    pub fn new(
        store: Arc<dyn LendingStore>,
        catalog_config: CatalogConfig,
        notifier: Arc<dyn notifications::Notifier>,
    ) -> Self {
        let sink = notifications::NotificationSink::new(notifier);
        let catalog = catalog::CatalogService::new(store.clone());

        Self {
            members: members::MembersService::new(store.clone(), sink),
            browser: browser::CatalogBrowser::new(catalog.clone(), catalog_config),
            catalog,
            loans: loans::LoansService::new(store.clone()),
            store,
        }
    }

    /// Store round trip, used by the readiness probe
    pub async fn ping(&self) -> AppResult<()> {
        Ok(self.store.ping().await?)
    }
}
