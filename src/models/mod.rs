//! Data models for the lending registry

pub mod item;
pub mod loan;
pub mod member;

// Re-export commonly used types
pub use item::{Item, ItemDraft, ItemPage};
pub use loan::{LoanRecord, LoanStatus};
pub use member::{Member, MAX_LOANS};
