//! Loan transaction engine
//!
//! A grant is three conditional writes committed as one unit:
//!
//! 1. item `available_copies -= 1`, requires a copy left
//! 2. member `loan_count += 1`, requires the member and `loan_count < MAX_LOANS`
//! 3. a new `BORROWED` ledger entry
//!
//! Preconditions are evaluated by the store at commit time, never by a prior
//! read, so racing grants on one item or one member cannot oversubscribe it.

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult, RejectReason},
    models::LoanRecord,
    services::{catalog::CatalogService, members::MembersService},
    store::{ConditionFailure, LendingStore, StoreError, WriteOp},
};

// Positions of the ops in a grant transaction
const ITEM_OP: usize = 0;
const MEMBER_OP: usize = 1;
const LEDGER_OP: usize = 2;

#[derive(Clone)]
pub struct LoansService {
    store: Arc<dyn LendingStore>,
}

impl LoansService {
    pub fn new(store: Arc<dyn LendingStore>) -> Self {
        Self { store }
    }

    /// Grant a loan of `item_id` to `member_id`.
    ///
    /// Every precondition failure surfaces as [`AppError::BorrowRejected`];
    /// store faults surface as retryable store errors. In both cases nothing
    /// was written.
    #[tracing::instrument(skip(self))]
    pub async fn grant_loan(&self, member_id: &str, item_id: &str) -> AppResult<LoanRecord> {
        if member_id.is_empty() || item_id.is_empty() {
            return Err(AppError::Validation(
                "member_id and item_id are required".to_string(),
            ));
        }

        let record = LoanRecord::borrowed(member_id, item_id);
        let ops = [
            CatalogService::decrement_availability(item_id),
            MembersService::increment_loan_count(member_id),
            WriteOp::AppendLoan(record.clone()),
        ];

        match self.store.transact(&ops).await {
            Ok(()) => {
                tracing::info!(transaction_id = %record.transaction_id, "Loan granted");
                Ok(record)
            }
            Err(err @ StoreError::Cancelled(_)) => {
                let reason = reject_reason(&err);
                tracing::warn!(?reason, "Loan rejected");
                Err(AppError::BorrowRejected(reason))
            }
            Err(err) => {
                tracing::error!("Loan commit failed: {}", err);
                Err(err.into())
            }
        }
    }
}

/// Map the first failed op of a cancelled grant to its cause
fn reject_reason(err: &StoreError) -> RejectReason {
    match err.first_failure() {
        Some((ITEM_OP, ConditionFailure::Missing)) => RejectReason::ItemMissing,
        Some((ITEM_OP, _)) => RejectReason::ItemUnavailable,
        Some((MEMBER_OP, ConditionFailure::Missing)) => RejectReason::MemberMissing,
        Some((MEMBER_OP, _)) => RejectReason::MemberAtCap,
        Some((LEDGER_OP, _)) => RejectReason::DuplicateTransaction,
        _ => RejectReason::Unspecified,
    }
}
