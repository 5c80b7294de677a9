//! Note repository implementation.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Transaction};
use tracing::debug;

use notebook_core::{Error, NewNote, Note, NotePageQuery, NoteRepository, NoteUpdate, Result, Tag};

/// One row of a note joined against its tag associations.
///
/// `tag_id` and `tag_name` are `NULL` for notes without tags, or when tags
/// were not requested.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NoteTagRow {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub content: String,
    pub plain_text: String,
    pub private: bool,
    pub words: i32,
    pub created_at: DateTime<Utc>,
    pub update_at: DateTime<Utc>,
    pub tag_id: Option<i64>,
    pub tag_name: Option<String>,
}

/// Fold joined rows into one `Note` per id.
///
/// Notes come back in first-seen order; tags are appended in row order and
/// duplicates of the same tag id are dropped.
pub fn fold_rows(rows: Vec<NoteTagRow>) -> Vec<Note> {
    let mut index: HashMap<i64, usize> = HashMap::new();
    let mut notes: Vec<Note> = Vec::new();

    for row in rows {
        let slot = *index.entry(row.id).or_insert_with(|| {
            notes.push(Note {
                id: row.id,
                title: row.title.clone(),
                author: row.author.clone(),
                content: row.content.clone(),
                plain_text: row.plain_text.clone(),
                private: row.private,
                words: row.words,
                tags: Vec::new(),
                created_at: row.created_at,
                updated_at: row.update_at,
            });
            notes.len() - 1
        });

        if let (Some(tag_id), Some(tag_name)) = (row.tag_id, row.tag_name) {
            let note = &mut notes[slot];
            if !note.tags.iter().any(|t| t.id == tag_id) {
                note.tags.push(Tag::new(tag_id, tag_name));
            }
        }
    }

    notes
}

/// Most recently updated first, newest id breaking ties.
pub fn sort_by_recency(notes: &mut [Note]) {
    notes.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

const NOTE_COLUMNS: &str =
    "n.id, n.title, n.author, n.content, n.plain_text, n.private, n.words, n.created_at, n.update_at";

fn order_clause(sort_by_recency: bool) -> &'static str {
    if sort_by_recency {
        "ORDER BY update_at DESC, id DESC"
    } else {
        "ORDER BY id"
    }
}

/// Build the page query. The inner select picks the page of notes, the
/// outer join pulls their tags.
fn build_page_sql(query: &NotePageQuery) -> String {
    let restriction = if query.tag_id != 0 {
        "WHERE EXISTS (SELECT 1 FROM note_tag f WHERE f.note_id = note.id AND f.tag_id = $3)"
    } else {
        ""
    };
    let page = format!(
        "SELECT * FROM note {restriction} {order} LIMIT $1 OFFSET $2",
        order = order_clause(query.sort_by_recency),
    );

    if query.include_tags {
        format!(
            "SELECT {NOTE_COLUMNS}, nt.tag_id, nt.tag_name
             FROM ({page}) n
             LEFT JOIN note_tag nt ON nt.note_id = n.id
             ORDER BY n.id, nt.tag_id"
        )
    } else {
        format!(
            "SELECT {NOTE_COLUMNS}, NULL::BIGINT AS tag_id, NULL::TEXT AS tag_name
             FROM ({page}) n"
        )
    }
}

/// PostgreSQL implementation of NoteRepository.
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn fetch(&self, id: i64) -> Result<Option<Note>> {
        let sql = format!(
            "SELECT {NOTE_COLUMNS}, nt.tag_id, nt.tag_name
             FROM note n
             LEFT JOIN note_tag nt ON nt.note_id = n.id
             WHERE n.id = $1
             ORDER BY nt.tag_id"
        );
        let rows: Vec<NoteTagRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(fold_rows(rows).into_iter().next())
    }

    async fn list_page(&self, query: &NotePageQuery) -> Result<Vec<Note>> {
        if query.page_size <= 0 {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let sql = build_page_sql(query);

        let mut q = sqlx::query_as::<_, NoteTagRow>(&sql)
            .bind(query.page_size)
            .bind(query.offset());
        if query.tag_id != 0 {
            q = q.bind(query.tag_id);
        }
        let rows = q.fetch_all(&self.pool).await.map_err(Error::Database)?;
        let row_count = rows.len();

        let mut notes = fold_rows(rows);
        if query.sort_by_recency {
            sort_by_recency(&mut notes);
        } else {
            notes.sort_by_key(|n| n.id);
        }

        debug!(
            subsystem = "db",
            component = "notes",
            op = "list_page",
            page = query.page,
            tag_id = query.tag_id,
            row_count,
            result_count = notes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Fetched note page"
        );
        Ok(notes)
    }

    async fn count_by_tag(&self, tag_id: i64) -> Result<i64> {
        let count = if tag_id == 0 {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM note")
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?
        } else {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(DISTINCT note_id) FROM note_tag WHERE tag_id = $1",
            )
            .bind(tag_id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?
        };
        Ok(count)
    }
}

// =============================================================================
// TRANSACTION-SCOPED WRITES
// =============================================================================

/// Writes composed by the content service inside a single transaction.
impl PgNoteRepository {
    /// Insert a note within an existing transaction. Returns the new id.
    pub async fn insert_tx(&self, tx: &mut Transaction<'_, Postgres>, note: &NewNote) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO note (title, author, content, plain_text, private, words)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(&note.title)
        .bind(&note.author)
        .bind(&note.content)
        .bind(&note.plain_text)
        .bind(note.private)
        .bind(note.words)
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(id)
    }

    /// Rewrite a note in place and bump `update_at`.
    pub async fn update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
        update: &NoteUpdate,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE note
             SET title = $2, content = $3, plain_text = $4, words = $5, private = $6,
                 update_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(&update.title)
        .bind(&update.content)
        .bind(&update.plain_text)
        .bind(update.words)
        .bind(update.private)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }

    pub async fn delete_tx(&self, tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM note WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }

    pub async fn delete_associations_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: i64,
    ) -> Result<u64> {
        let result = sqlx::query("DELETE FROM note_tag WHERE note_id = $1")
            .bind(note_id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }

    /// Link `tags` to a note, snapshotting each tag name.
    pub async fn insert_associations_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: i64,
        tags: &[Tag],
    ) -> Result<u64> {
        if tags.is_empty() {
            return Ok(0);
        }
        let ids: Vec<i64> = tags.iter().map(|t| t.id).collect();
        let names: Vec<String> = tags.iter().map(|t| t.name.clone()).collect();

        let result = sqlx::query(
            "INSERT INTO note_tag (note_id, tag_id, tag_name)
             SELECT $1, t.id, t.name FROM UNNEST($2::BIGINT[], $3::TEXT[]) AS t(id, name)",
        )
        .bind(note_id)
        .bind(&ids)
        .bind(&names)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}
