//! Service layer for business logic.

pub mod content_service;
pub mod session;
pub mod token_store;

pub use content_service::{ContentService, ContentSettings};
pub use session::{generate_token, hash_password, SessionGate};
pub use token_store::{MemoryTokenStore, RedisTokenStore};
