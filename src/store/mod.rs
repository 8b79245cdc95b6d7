//! Transactional store layer
//!
//! All durable state lives behind [`LendingStore`]. Counter mutations are
//! expressed as [`WriteOp`]s, each carrying its own precondition, and applied
//! through [`LendingStore::transact`]: either every op commits or none does.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::{
    config::{StoreBackend, StoreConfig},
    error::AppResult,
    models::{Item, ItemDraft, LoanRecord, Member},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A single conditional write inside a transaction
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Create a member; fails if the id is taken
    PutMember(Member),
    /// `available_copies -= 1` if the item exists and has a copy left
    DecrementAvailable { item_id: String },
    /// `loan_count += 1` if the member exists and is below `limit`
    IncrementLoanCount { member_id: String, limit: i32 },
    /// Append a ledger entry; fails if the transaction id is already recorded
    AppendLoan(LoanRecord),
}

/// Why a single op's precondition did not hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionFailure {
    /// Referenced record does not exist
    Missing,
    /// Record to create already exists
    AlreadyExists,
    /// Counter is at its bound
    Exhausted,
}

#[derive(Error, Debug)]
pub enum StoreError {
    /// Preconditions failed; one entry per submitted op, `None` where the op
    /// held or was never evaluated. Nothing was applied.
    #[error("transaction cancelled: {0:?}")]
    Cancelled(Vec<Option<ConditionFailure>>),

    /// Adding copies would take the item's counters past their range
    #[error("copy count of item {0} out of range")]
    CounterOverflow(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// First failed precondition and its op position
    pub fn first_failure(&self) -> Option<(usize, ConditionFailure)> {
        match self {
            StoreError::Cancelled(reasons) => reasons
                .iter()
                .enumerate()
                .find_map(|(index, reason)| reason.map(|r| (index, r))),
            _ => None,
        }
    }
}

/// Faults that say nothing about the request itself: a lost connection, an
/// exhausted pool, or a serialization conflict the database aborted
pub fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db.code().is_some_and(|code| {
            // serialization_failure, deadlock_detected, connection_exception class,
            // admin/crash shutdown
            matches!(&*code, "40001" | "40P01" | "57P01" | "57P02" | "57P03")
                || code.starts_with("08")
        }),
        _ => false,
    }
}

impl StoreError {
    /// Whether the same request may succeed when retried
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Database(e) => is_transient(e),
            StoreError::Cancelled(_) | StoreError::CounterOverflow(_) => false,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The transactional store the registry is built on
#[async_trait]
pub trait LendingStore: Send + Sync {
    /// Apply all ops atomically, evaluating each precondition at commit time
    async fn transact(&self, ops: &[WriteOp]) -> StoreResult<()>;

    /// Create the item or add `copies` to both of its counters
    async fn merge_item(&self, draft: &ItemDraft) -> StoreResult<Item>;

    async fn get_member(&self, member_id: &str) -> StoreResult<Option<Member>>;

    async fn get_item(&self, item_id: &str) -> StoreResult<Option<Item>>;

    /// Items ordered by id, starting strictly after `after`
    async fn list_items(&self, limit: i64, after: Option<&str>) -> StoreResult<Vec<Item>>;

    /// Ledger entries of a member, newest first
    async fn loans_by_member(&self, member_id: &str) -> StoreResult<Vec<LoanRecord>>;

    /// Ledger entries of an item, newest first
    async fn loans_by_item(&self, item_id: &str) -> StoreResult<Vec<LoanRecord>>;

    async fn ping(&self) -> StoreResult<()>;
}

/// Build the configured store backend
pub async fn connect(config: &StoreConfig) -> AppResult<Arc<dyn LendingStore>> {
    match config.backend {
        StoreBackend::Postgres => {
            let store = PgStore::connect(config).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, state will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
