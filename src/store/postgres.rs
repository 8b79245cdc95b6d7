//! PostgreSQL store backend
//!
//! Each `transact` runs in one database transaction. Every op is a single
//! conditional statement; the row lock taken by a conditional `UPDATE` means
//! its `WHERE` clause is re-evaluated against the latest committed row, so
//! concurrent grants on the same item or member serialize on that row.
//! Ops always lock items before members, which keeps lock order consistent.

use async_trait::async_trait;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgConnection, Pool, Postgres, Row,
};
use std::time::Duration;

use super::{ConditionFailure, LendingStore, StoreError, StoreResult, WriteOp};
use crate::{
    config::StoreConfig,
    error::{AppError, AppResult},
    models::{Item, ItemDraft, LoanRecord, LoanStatus, Member},
};

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Open the pool and bring the schema up to date
    pub async fn connect(config: &StoreConfig) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;

        tracing::info!("Connected to database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to run migrations: {}", e)))?;

        tracing::info!("Database migrations completed");

        Ok(Self::new(pool))
    }

    async fn apply(conn: &mut PgConnection, op: &WriteOp) -> StoreResult<Option<ConditionFailure>> {
        match op {
            WriteOp::PutMember(member) => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO members (member_id, created_at, loan_count)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (member_id) DO NOTHING
                    "#,
                )
                .bind(&member.member_id)
                .bind(member.created_at)
                .bind(member.loan_count)
                .execute(&mut *conn)
                .await?;

                Ok((result.rows_affected() == 0).then_some(ConditionFailure::AlreadyExists))
            }
            WriteOp::DecrementAvailable { item_id } => {
                let result = sqlx::query(
                    r#"
                    UPDATE items SET available_copies = available_copies - 1
                    WHERE item_id = $1 AND available_copies > 0
                    "#,
                )
                .bind(item_id)
                .execute(&mut *conn)
                .await?;

                if result.rows_affected() == 1 {
                    return Ok(None);
                }

                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM items WHERE item_id = $1)")
                        .bind(item_id)
                        .fetch_one(&mut *conn)
                        .await?;

                Ok(Some(if exists {
                    ConditionFailure::Exhausted
                } else {
                    ConditionFailure::Missing
                }))
            }
            WriteOp::IncrementLoanCount { member_id, limit } => {
                let result = sqlx::query(
                    r#"
                    UPDATE members SET loan_count = loan_count + 1
                    WHERE member_id = $1 AND loan_count < $2
                    "#,
                )
                .bind(member_id)
                .bind(limit)
                .execute(&mut *conn)
                .await?;

                if result.rows_affected() == 1 {
                    return Ok(None);
                }

                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM members WHERE member_id = $1)")
                        .bind(member_id)
                        .fetch_one(&mut *conn)
                        .await?;

                Ok(Some(if exists {
                    ConditionFailure::Exhausted
                } else {
                    ConditionFailure::Missing
                }))
            }
            WriteOp::AppendLoan(record) => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO loans (member_id, borrowed_at, item_id, transaction_id, status)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (transaction_id) DO NOTHING
                    "#,
                )
                .bind(&record.member_id)
                .bind(record.borrowed_at)
                .bind(&record.item_id)
                .bind(record.transaction_id)
                .bind(record.status.as_str())
                .execute(&mut *conn)
                .await?;

                Ok((result.rows_affected() == 0).then_some(ConditionFailure::AlreadyExists))
            }
        }
    }
}

fn loan_from_row(row: &PgRow) -> StoreResult<LoanRecord> {
    let status: String = row.try_get("status")?;
    Ok(LoanRecord {
        transaction_id: row.try_get("transaction_id")?,
        member_id: row.try_get("member_id")?,
        item_id: row.try_get("item_id")?,
        borrowed_at: row.try_get("borrowed_at")?,
        status: status
            .parse::<LoanStatus>()
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?,
    })
}

#[async_trait]
impl LendingStore for PgStore {
    async fn transact(&self, ops: &[WriteOp]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let mut failures = vec![None; ops.len()];

        for (index, op) in ops.iter().enumerate() {
            if let Some(failure) = Self::apply(&mut *tx, op).await? {
                failures[index] = Some(failure);
                // Dropping the transaction rolls it back
                return Err(StoreError::Cancelled(failures));
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn merge_item(&self, draft: &ItemDraft) -> StoreResult<Item> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (item_id, title, author, edition, total_copies, available_copies, created_at)
            VALUES ($1, $2, $3, $4, $5, $5, $6)
            ON CONFLICT (item_id) DO UPDATE SET
                title = EXCLUDED.title,
                author = EXCLUDED.author,
                edition = EXCLUDED.edition,
                total_copies = items.total_copies + EXCLUDED.total_copies,
                available_copies = items.available_copies + EXCLUDED.available_copies
            WHERE items.total_copies <= 2147483647 - EXCLUDED.total_copies
            RETURNING item_id, title, author, edition, total_copies, available_copies, created_at
            "#,
        )
        .bind(&draft.item_id)
        .bind(&draft.title)
        .bind(&draft.author)
        .bind(&draft.edition)
        .bind(draft.copies)
        .bind(draft.created_at)
        .fetch_optional(&self.pool)
        .await?;

        // available never exceeds total, so guarding total guards both
        item.ok_or_else(|| StoreError::CounterOverflow(draft.item_id.clone()))
    }

    async fn get_member(&self, member_id: &str) -> StoreResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(
            "SELECT member_id, created_at, loan_count FROM members WHERE member_id = $1",
        )
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    async fn get_item(&self, item_id: &str) -> StoreResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT item_id, title, author, edition, total_copies, available_copies, created_at
            FROM items WHERE item_id = $1
            "#,
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    async fn list_items(&self, limit: i64, after: Option<&str>) -> StoreResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT item_id, title, author, edition, total_copies, available_copies, created_at
            FROM items
            WHERE ($1::text IS NULL OR item_id > $1)
            ORDER BY item_id
            LIMIT $2
            "#,
        )
        .bind(after)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn loans_by_member(&self, member_id: &str) -> StoreResult<Vec<LoanRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT transaction_id, member_id, item_id, borrowed_at, status
            FROM loans WHERE member_id = $1
            ORDER BY borrowed_at DESC
            "#,
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(loan_from_row).collect()
    }

    async fn loans_by_item(&self, item_id: &str) -> StoreResult<Vec<LoanRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT transaction_id, member_id, item_id, borrowed_at, status
            FROM loans WHERE item_id = $1
            ORDER BY borrowed_at DESC
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(loan_from_row).collect()
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
