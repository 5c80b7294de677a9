//! # notebook-core
//!
//! Core types, traits, and pure logic for the notebook service.
//!
//! This crate provides the data model, the error and status taxonomy, the
//! pagination window arithmetic, plain-text extraction and the visibility
//! policy. Storage and caching live in the crates that implement the traits
//! defined here.

pub mod config;
pub mod defaults;
pub mod error;
pub mod models;
pub mod pagination;
pub mod status;
pub mod text;
pub mod traits;
pub mod visibility;

// Re-export commonly used types at crate root
pub use config::NotebookConfig;
pub use error::{Error, Result};
pub use models::*;
pub use pagination::compute_window;
pub use status::Status;
pub use text::{digest, rune_count, HtmlTextExtractor, PlainTextExtractor};
pub use traits::*;
