//! Member model and related types

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Maximum number of open loans a member may hold
pub const MAX_LOANS: i32 = 3;

/// Ten digits, no leading zero
static MEMBER_ID_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9][0-9]{9}$").expect("member id pattern is valid"));

/// Member record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    /// Caller-supplied identity (mobile number)
    pub member_id: String,
    pub created_at: DateTime<Utc>,
    /// Open loans, never above [`MAX_LOANS`]
    pub loan_count: i32,
}

impl Member {
    /// A fresh member with no loans
    pub fn new(member_id: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            created_at: Utc::now(),
            loan_count: 0,
        }
    }
}

/// Register member request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterMember {
    /// Mobile number, 10 digits
    #[validate(regex(path = *MEMBER_ID_FORMAT, message = "member_id must be a valid 10-digit number"))]
    pub member_id: String,
}

/// Register member response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisteredMember {
    pub member_id: String,
    pub created_at: DateTime<Utc>,
    pub message: String,
}

impl From<Member> for RegisteredMember {
    fn from(member: Member) -> Self {
        Self {
            member_id: member.member_id,
            created_at: member.created_at,
            message: "Member registered successfully".to_string(),
        }
    }
}
