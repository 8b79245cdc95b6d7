//! Lending Registry
//!
//! A REST JSON service managing members, a catalog of circulating items with
//! finite copy counts, and an append-only ledger of loans. Granting a loan
//! commits the availability decrement, the member's loan count increment and
//! the ledger entry as one conditional transaction.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod services;
pub mod store;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
