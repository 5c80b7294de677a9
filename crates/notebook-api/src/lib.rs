//! # notebook-api
//!
//! HTTP front end for the notebook service: the content service, the session
//! gate and the JSON routes that expose them.

pub mod handlers;
pub mod services;

pub use handlers::{router, AppState, Envelope};
pub use services::{ContentService, ContentSettings, MemoryTokenStore, RedisTokenStore, SessionGate};
