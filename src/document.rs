//! The indexable content item.

use serde::{Deserialize, Serialize};

/// A single indexable content item (e.g. a blog post).
///
/// `id` is the unique reference key within the index: re-adding a document
/// with an existing `id` overwrites its indexed content. `updated_at` is an
/// opaque ISO-8601 timestamp used only for incremental-sync comparisons; it
/// is compared lexicographically and never parsed, so all documents in one
/// corpus must use the same timestamp layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier, stable across syncs.
    pub id: String,
    /// Indexed text field.
    #[serde(default)]
    pub title: String,
    /// Indexed text field (plaintext, not HTML).
    #[serde(default)]
    pub body: String,
    /// Carried through to results for rendering; not indexed.
    #[serde(default)]
    pub url: String,
    /// ISO-8601 timestamp of the last content change.
    pub updated_at: String,
    /// Access tier or similar; informational only, not indexed.
    #[serde(default)]
    pub visibility: String,
}
