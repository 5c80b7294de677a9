//! The unit of work run by the sweep worker.

use async_trait::async_trait;

use notebook_core::{Result, TagRepository};
use notebook_db::PgTagRepository;

/// Deletes tags that no note refers to.
#[async_trait]
pub trait OrphanSweeper: Send + Sync {
    /// Returns the number of tags deleted.
    async fn sweep_orphans(&self) -> Result<u64>;
}

#[async_trait]
impl OrphanSweeper for PgTagRepository {
    async fn sweep_orphans(&self) -> Result<u64> {
        self.delete_orphans().await
    }
}
