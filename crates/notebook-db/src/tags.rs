//! Tag repository implementation.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::{debug, info};

use notebook_core::{Error, Result, Tag, TagRepository};

/// PostgreSQL implementation of TagRepository.
#[derive(Clone)]
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    /// Create a new PgTagRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Create every tag in `names` that does not exist yet and row-lock the
    /// ones that do.
    ///
    /// The no-op update on conflict is what takes the lock: an existing
    /// orphan cannot be swept between this call and
    /// [`Self::lock_and_fetch_by_name_tx`]. Rows are visited in name order so
    /// overlapping writers queue instead of deadlocking.
    pub async fn upsert_by_name_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        names: &[String],
    ) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "INSERT INTO tag (name)
             SELECT DISTINCT n FROM UNNEST($1::TEXT[]) AS n ORDER BY n
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name",
        )
        .bind(names)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// Fetch the tags named in `names`, row-locked until the transaction ends.
    ///
    /// Locks are taken in name order so overlapping writers cannot deadlock.
    pub async fn lock_and_fetch_by_name_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        names: &[String],
    ) -> Result<Vec<Tag>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            "SELECT id, name FROM tag
             WHERE name = ANY($1)
             ORDER BY name
             FOR UPDATE",
        )
        .bind(names)
        .fetch_all(&mut **tx)
        .await
        .map_err(Error::Database)?;

        let tags: Vec<Tag> = rows
            .into_iter()
            .map(|row| Tag::new(row.get("id"), row.get::<String, _>("name")))
            .collect();

        if tags.len() != names.len() {
            return Err(Error::Internal(format!(
                "expected {} tags after upsert, found {}",
                names.len(),
                tags.len()
            )));
        }
        Ok(tags)
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn with_note_counts(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.name, COUNT(DISTINCT nt.note_id) AS tagged
            FROM tag t
            JOIN note_tag nt ON nt.tag_id = t.id
            GROUP BY t.id, t.name
            ORDER BY t.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let tags = rows
            .into_iter()
            .map(|row| Tag {
                id: row.get("id"),
                name: row.get("name"),
                tagged: row.get("tagged"),
            })
            .collect();

        Ok(tags)
    }

    async fn delete_orphans(&self) -> Result<u64> {
        let start = Instant::now();
        let result = sqlx::query(
            "DELETE FROM tag t
             WHERE NOT EXISTS (SELECT 1 FROM note_tag nt WHERE nt.tag_id = t.id)",
        )
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            info!(
                subsystem = "db",
                component = "tags",
                op = "delete_orphans",
                deleted,
                duration_ms = start.elapsed().as_millis() as u64,
                "Deleted orphan tags"
            );
        } else {
            debug!(
                subsystem = "db",
                component = "tags",
                op = "delete_orphans",
                duration_ms = start.elapsed().as_millis() as u64,
                "No orphan tags"
            );
        }
        Ok(deleted)
    }
}
