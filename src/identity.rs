//! Derived item identities
//!
//! An item's identity is the SHA-256 digest (lowercase hex) of its
//! descriptive fields joined by [`FIELD_SEPARATOR`]. Identical triples always
//! resolve to the same record, which makes catalog upserts idempotent in
//! identity.

use sha2::{Digest, Sha256};

pub const FIELD_SEPARATOR: char = '-';

/// Derive the identity of a catalog item.
///
/// Callers reject empty fields before calling this.
pub fn derive_item_id(title: &str, author: &str, edition: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update([FIELD_SEPARATOR as u8]);
    hasher.update(author.as_bytes());
    hasher.update([FIELD_SEPARATOR as u8]);
    hasher.update(edition.as_bytes());
    hex::encode(hasher.finalize())
}
