//! Core traits for notebook abstractions.
//!
//! These define the pool-level read side of the repositories and the session
//! cache seam. Transaction-scoped writes are inherent methods on the
//! Postgres repositories, since they share the caller's transaction.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Note, NotePageQuery, Tag};

// =============================================================================
// NOTE REPOSITORY TRAITS
// =============================================================================

/// Read access to notes with their tag sets.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Fetch one note with its full tag set. `None` when no row matches.
    async fn fetch(&self, id: i64) -> Result<Option<Note>>;

    /// Fetch one page of notes.
    async fn list_page(&self, query: &NotePageQuery) -> Result<Vec<Note>>;

    /// Count distinct notes carrying `tag_id`; `0` counts every note.
    async fn count_by_tag(&self, tag_id: i64) -> Result<i64>;
}

// =============================================================================
// TAG REPOSITORY TRAITS
// =============================================================================

/// Tag aggregation and garbage collection.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Every tag in use, with the number of notes carrying it.
    async fn with_note_counts(&self) -> Result<Vec<Tag>>;

    /// Delete every tag without associated notes. Returns the number deleted.
    async fn delete_orphans(&self) -> Result<u64>;
}

// =============================================================================
// SESSION CACHE
// =============================================================================

/// Cache slot holding the single active session token.
///
/// Expiry is enforced by the store, not by callers.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// The active token, if any.
    async fn get(&self) -> Result<Option<String>>;

    /// Replace the active token, expiring after `ttl`.
    async fn set(&self, token: &str, ttl: Duration) -> Result<()>;

    /// Remove the active token. Succeeds when none is set.
    async fn delete(&self) -> Result<()>;
}
