//! In-process store backend
//!
//! Tables sit behind a single lock that plays the role of the store's commit
//! serialization point. A transaction stages every op against copies of the
//! touched records and publishes them only when all preconditions hold, so a
//! fault between staging and publishing leaves the tables untouched.

use async_trait::async_trait;
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    ops::Bound,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard,
    },
};
use uuid::Uuid;

use super::{ConditionFailure, LendingStore, StoreError, StoreResult, WriteOp};
use crate::models::{Item, ItemDraft, LoanRecord, Member};

#[derive(Default)]
struct Tables {
    members: HashMap<String, Member>,
    items: BTreeMap<String, Item>,
    loans: Vec<LoanRecord>,
    transaction_ids: HashSet<Uuid>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_next_commit: AtomicBool,
}

/// Records touched by one transaction, not yet visible
#[derive(Default)]
struct Staged {
    members: HashMap<String, Member>,
    items: HashMap<String, Item>,
    loans: Vec<LoanRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `transact` fail as a transport fault after its
    /// preconditions have been evaluated and staged
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of ledger entries, for direct inspection
    pub fn loan_count(&self) -> StoreResult<usize> {
        Ok(self.lock()?.loans.len())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    fn stage(tables: &Tables, staged: &mut Staged, op: &WriteOp) -> Option<ConditionFailure> {
        match op {
            WriteOp::PutMember(member) => {
                let id = &member.member_id;
                if staged.members.contains_key(id) || tables.members.contains_key(id) {
                    return Some(ConditionFailure::AlreadyExists);
                }
                staged.members.insert(id.clone(), member.clone());
                None
            }
            WriteOp::DecrementAvailable { item_id } => {
                let current = staged
                    .items
                    .get(item_id)
                    .or_else(|| tables.items.get(item_id))
                    .cloned();
                match current {
                    None => Some(ConditionFailure::Missing),
                    Some(item) if item.available_copies <= 0 => Some(ConditionFailure::Exhausted),
                    Some(mut item) => {
                        item.available_copies -= 1;
                        staged.items.insert(item_id.clone(), item);
                        None
                    }
                }
            }
            WriteOp::IncrementLoanCount { member_id, limit } => {
                let current = staged
                    .members
                    .get(member_id)
                    .or_else(|| tables.members.get(member_id))
                    .cloned();
                match current {
                    None => Some(ConditionFailure::Missing),
                    Some(member) if member.loan_count >= *limit => {
                        Some(ConditionFailure::Exhausted)
                    }
                    Some(mut member) => {
                        member.loan_count += 1;
                        staged.members.insert(member_id.clone(), member);
                        None
                    }
                }
            }
            WriteOp::AppendLoan(record) => {
                let id = record.transaction_id;
                let duplicate = tables.transaction_ids.contains(&id)
                    || staged.loans.iter().any(|l| l.transaction_id == id);
                if duplicate {
                    return Some(ConditionFailure::AlreadyExists);
                }
                staged.loans.push(record.clone());
                None
            }
        }
    }
}

fn newest_first(mut loans: Vec<LoanRecord>) -> Vec<LoanRecord> {
    loans.sort_by(|a, b| b.borrowed_at.cmp(&a.borrowed_at));
    loans
}

#[async_trait]
impl LendingStore for MemoryStore {
    async fn transact(&self, ops: &[WriteOp]) -> StoreResult<()> {
        let mut tables = self.lock()?;
        let mut staged = Staged::default();

        let failures: Vec<Option<ConditionFailure>> = ops
            .iter()
            .map(|op| Self::stage(&tables, &mut staged, op))
            .collect();

        if failures.iter().any(Option::is_some) {
            return Err(StoreError::Cancelled(failures));
        }

        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected commit fault".to_string()));
        }

        tables.members.extend(staged.members);
        tables.items.extend(staged.items);
        for record in staged.loans {
            tables.transaction_ids.insert(record.transaction_id);
            tables.loans.push(record);
        }

        Ok(())
    }

    async fn merge_item(&self, draft: &ItemDraft) -> StoreResult<Item> {
        let mut tables = self.lock()?;

        let item = match tables.items.get_mut(&draft.item_id) {
            Some(existing) => {
                let (Some(total), Some(available)) = (
                    existing.total_copies.checked_add(draft.copies),
                    existing.available_copies.checked_add(draft.copies),
                ) else {
                    return Err(StoreError::CounterOverflow(draft.item_id.clone()));
                };
                existing.title = draft.title.clone();
                existing.author = draft.author.clone();
                existing.edition = draft.edition.clone();
                existing.total_copies = total;
                existing.available_copies = available;
                existing.clone()
            }
            None => {
                let item = draft.clone().into_item();
                tables.items.insert(item.item_id.clone(), item.clone());
                item
            }
        };

        Ok(item)
    }

    async fn get_member(&self, member_id: &str) -> StoreResult<Option<Member>> {
        Ok(self.lock()?.members.get(member_id).cloned())
    }

    async fn get_item(&self, item_id: &str) -> StoreResult<Option<Item>> {
        Ok(self.lock()?.items.get(item_id).cloned())
    }

    async fn list_items(&self, limit: i64, after: Option<&str>) -> StoreResult<Vec<Item>> {
        let tables = self.lock()?;
        let lower = match after {
            Some(id) => Bound::Excluded(id.to_string()),
            None => Bound::Unbounded,
        };

        Ok(tables
            .items
            .range((lower, Bound::Unbounded))
            .take(limit.max(0) as usize)
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn loans_by_member(&self, member_id: &str) -> StoreResult<Vec<LoanRecord>> {
        let tables = self.lock()?;
        Ok(newest_first(
            tables
                .loans
                .iter()
                .filter(|l| l.member_id == member_id)
                .cloned()
                .collect(),
        ))
    }

    async fn loans_by_item(&self, item_id: &str) -> StoreResult<Vec<LoanRecord>> {
        let tables = self.lock()?;
        Ok(newest_first(
            tables
                .loans
                .iter()
                .filter(|l| l.item_id == item_id)
                .cloned()
                .collect(),
        ))
    }

    async fn ping(&self) -> StoreResult<()> {
        self.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, Item) {
        let store = MemoryStore::new();
        store
            .transact(&[WriteOp::PutMember(Member::new("9876543210"))])
            .await
            .unwrap();
        let item = store
            .merge_item(&ItemDraft::new("Dune", "Frank Herbert", "1st", 1))
            .await
            .unwrap();
        (store, item)
    }

    fn grant_ops(item_id: &str) -> Vec<WriteOp> {
        vec![
            WriteOp::DecrementAvailable {
                item_id: item_id.to_string(),
            },
            WriteOp::IncrementLoanCount {
                member_id: "9876543210".to_string(),
                limit: 3,
            },
            WriteOp::AppendLoan(LoanRecord::borrowed("9876543210", item_id)),
        ]
    }

    #[tokio::test]
    async fn test_transact_applies_all_ops() {
        let (store, item) = seeded().await;

        store.transact(&grant_ops(&item.item_id)).await.unwrap();

        let item = store.get_item(&item.item_id).await.unwrap().unwrap();
        let member = store.get_member("9876543210").await.unwrap().unwrap();
        assert_eq!(item.available_copies, 0);
        assert_eq!(member.loan_count, 1);
        assert_eq!(store.loan_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_precondition_applies_nothing() {
        let (store, item) = seeded().await;
        store.transact(&grant_ops(&item.item_id)).await.unwrap();

        let err = store.transact(&grant_ops(&item.item_id)).await.unwrap_err();
        match err {
            StoreError::Cancelled(reasons) => {
                assert_eq!(reasons, vec![Some(ConditionFailure::Exhausted), None, None]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let member = store.get_member("9876543210").await.unwrap().unwrap();
        assert_eq!(member.loan_count, 1);
        assert_eq!(store.loan_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_injected_fault_leaves_tables_untouched() {
        let (store, item) = seeded().await;
        store.fail_next_commit();

        let err = store.transact(&grant_ops(&item.item_id)).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        let item = store.get_item(&item.item_id).await.unwrap().unwrap();
        let member = store.get_member("9876543210").await.unwrap().unwrap();
        assert_eq!(item.available_copies, 1);
        assert_eq!(member.loan_count, 0);
        assert_eq!(store.loan_count().unwrap(), 0);

        // fault is one-shot
        store.transact(&grant_ops(&item.item_id)).await.unwrap();
    }

    #[tokio::test]
    async fn test_ops_in_one_transaction_see_each_other() {
        let (store, item) = seeded().await;
        let ops = vec![
            WriteOp::DecrementAvailable {
                item_id: item.item_id.clone(),
            },
            WriteOp::DecrementAvailable {
                item_id: item.item_id.clone(),
            },
        ];

        let err = store.transact(&ops).await.unwrap_err();
        assert_eq!(err.first_failure(), Some((1, ConditionFailure::Exhausted)));
        let item = store.get_item(&item.item_id).await.unwrap().unwrap();
        assert_eq!(item.available_copies, 1);
    }

    #[tokio::test]
    async fn test_merge_past_counter_range_leaves_item_and_store_usable() {
        let store = MemoryStore::new();
        let big = ItemDraft::new("Dune", "Frank Herbert", "1st", i32::MAX);
        let item = store.merge_item(&big).await.unwrap();

        let err = store
            .merge_item(&ItemDraft::new("Dune", "Frank Herbert", "1st", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CounterOverflow(ref id) if *id == item.item_id));

        let item = store.get_item(&item.item_id).await.unwrap().unwrap();
        assert_eq!((item.total_copies, item.available_copies), (i32::MAX, i32::MAX));
        store.ping().await.unwrap();
        store
            .merge_item(&ItemDraft::new("Emma", "Jane Austen", "1st", 1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_items_pages_by_id() {
        let store = MemoryStore::new();
        for n in 0..5 {
            store
                .merge_item(&ItemDraft::new(&format!("Title {n}"), "Author", "1st", 1))
                .await
                .unwrap();
        }

        let first = store.list_items(3, None).await.unwrap();
        assert_eq!(first.len(), 3);
        let rest = store
            .list_items(3, Some(&first[2].item_id))
            .await
            .unwrap();
        assert_eq!(rest.len(), 2);
        assert!(first[2].item_id < rest[0].item_id);
    }
}
