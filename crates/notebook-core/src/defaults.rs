//! Centralized default constants for notebook.
//!
//! Every configurable value read by [`crate::config::NotebookConfig`] falls
//! back to one of these.

// =============================================================================
// NOTES
// =============================================================================

/// Runes of plain text kept in list-view digests.
pub const DIGEST_LENGTH: usize = 150;

/// Author stamped onto published notes.
pub const DEFAULT_AUTHOR: &str = "admin";

// =============================================================================
// PAGINATION
// =============================================================================

/// Notes per page in list views.
pub const PAGE_SIZE: i64 = 10;

/// Page numbers shown around the current page.
pub const PAGINATION_WINDOW_SIZE: i64 = 5;

// =============================================================================
// SESSION
// =============================================================================

/// Session token lifetime: three days.
pub const TOKEN_TTL_SECS: u64 = 3 * 24 * 3600;

/// Cache key holding the single active session token.
pub const TOKEN_KEY: &str = "notebook:token";

/// Cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "token";

/// Random bytes in a freshly generated session token.
pub const TOKEN_BYTES: usize = 32;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default bind address.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default database URL.
pub const DATABASE_URL: &str = "postgres://localhost/notebook";

/// Default Redis URL.
pub const REDIS_URL: &str = "redis://localhost:6379";

// =============================================================================
// BACKGROUND SWEEP
// =============================================================================

/// Pending sweep requests buffered before new requests are coalesced.
pub const SWEEP_QUEUE_CAPACITY: usize = 16;

/// Capacity of the sweep event broadcast channel.
pub const SWEEP_EVENT_CAPACITY: usize = 64;
