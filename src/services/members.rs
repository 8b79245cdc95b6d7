//! Member registry

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{LoanRecord, Member, MAX_LOANS},
    services::notifications::NotificationSink,
    store::{LendingStore, StoreError, WriteOp},
};

#[derive(Clone)]
pub struct MembersService {
    store: Arc<dyn LendingStore>,
    notifications: NotificationSink,
}

impl MembersService {
    pub fn new(store: Arc<dyn LendingStore>, notifications: NotificationSink) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Create a member exactly once.
    ///
    /// The non-existence check is the insert's own precondition, so of any
    /// number of concurrent registrations for one id exactly one succeeds.
    /// The registration notice goes out only after the insert committed.
    #[tracing::instrument(skip(self))]
    pub async fn register(&self, member_id: &str) -> AppResult<Member> {
        let member = Member::new(member_id);

        match self
            .store
            .transact(&[WriteOp::PutMember(member.clone())])
            .await
        {
            Ok(()) => {}
            Err(StoreError::Cancelled(_)) => {
                return Err(AppError::Conflict(format!(
                    "Member {} already exists",
                    member_id
                )));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!("Member registered");

        // Outcome is logged by the sink, never observed here
        let _ = self.notifications.dispatch(&member.member_id);

        Ok(member)
    }

    /// Get member by ID
    pub async fn get(&self, member_id: &str) -> AppResult<Member> {
        self.store
            .get_member(member_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", member_id)))
    }

    /// Ledger entries of a member, newest first
    pub async fn loans(&self, member_id: &str) -> AppResult<Vec<LoanRecord>> {
        self.get(member_id).await?;
        Ok(self.store.loans_by_member(member_id).await?)
    }

    /// Loan counter bump, only ever committed inside a loan grant
    pub(crate) fn increment_loan_count(member_id: &str) -> WriteOp {
        WriteOp::IncrementLoanCount {
            member_id: member_id.to_string(),
            limit: MAX_LOANS,
        }
    }
}
