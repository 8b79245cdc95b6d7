//! Loan ledger records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Ledger entry status; only grants are modelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Borrowed,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Borrowed => "BORROWED",
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BORROWED" => Ok(LoanStatus::Borrowed),
            other => Err(format!("unknown loan status: {}", other)),
        }
    }
}

/// Append-only ledger entry, one per granted loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LoanRecord {
    pub transaction_id: Uuid,
    pub member_id: String,
    pub item_id: String,
    pub borrowed_at: DateTime<Utc>,
    pub status: LoanStatus,
}

impl LoanRecord {
    /// A new grant with a fresh transaction id
    pub fn borrowed(member_id: &str, item_id: &str) -> Self {
        Self {
            transaction_id: Uuid::new_v4(),
            member_id: member_id.to_string(),
            item_id: item_id.to_string(),
            borrowed_at: Utc::now(),
            status: LoanStatus::Borrowed,
        }
    }
}

/// Grant loan request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GrantLoan {
    #[validate(length(min = 1, message = "member_id is required"))]
    pub member_id: String,
    #[validate(length(min = 1, message = "item_id is required"))]
    pub item_id: String,
}

/// Grant loan response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoanResponse {
    pub transaction_id: Uuid,
    pub borrowed_at: DateTime<Utc>,
    pub status: LoanStatus,
    pub message: String,
}

impl From<LoanRecord> for LoanResponse {
    fn from(record: LoanRecord) -> Self {
        Self {
            transaction_id: record.transaction_id,
            borrowed_at: record.borrowed_at,
            status: record.status,
            message: "Item borrowed successfully".to_string(),
        }
    }
}
