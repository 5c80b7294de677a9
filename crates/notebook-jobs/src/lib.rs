//! # notebook-jobs
//!
//! Background maintenance for the notebook service.
//!
//! Currently this is the orphan tag sweep: note writes schedule a sweep after
//! they commit, and a single worker task deletes tags no note refers to.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use notebook_db::Database;
//! use notebook_jobs::{SweepConfig, SweepWorker};
//!
//! let db = Database::connect("postgres://...").await?;
//! let handle = SweepWorker::new(Arc::new(db.tags.clone()), SweepConfig::default()).start();
//!
//! handle.schedule();
//!
//! let mut events = handle.events();
//! while let Ok(event) = events.recv().await {
//!     println!("Event: {:?}", event);
//! }
//!
//! handle.shutdown().await?;
//! ```

pub mod sweeper;
pub mod worker;

// Re-export core types
pub use notebook_core::*;

pub use sweeper::OrphanSweeper;
pub use worker::{SweepConfig, SweepEvent, SweepHandle, SweepWorker};
