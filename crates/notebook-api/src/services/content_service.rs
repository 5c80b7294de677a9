//! Note publishing and retrieval.
//!
//! Every write runs in one transaction: the note row, its tags and its
//! associations commit together or not at all. Tags are created on demand
//! and row-locked before they are linked, so the orphan sweep scheduled
//! after updates and deletes can never remove a tag a concurrent writer is
//! about to reference.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use notebook_core::visibility::{apply_list_policy, apply_single_policy};
use notebook_core::{
    compute_window, rune_count, Error, HtmlTextExtractor, NewNote, Note, NoteList, NotePageQuery,
    NoteRepository, NoteUpdate, NotebookConfig, PlainTextExtractor, PublishNote, Result, Tag,
    TagRepository, UpdateNote,
};
use notebook_db::Database;
use notebook_jobs::SweepHandle;

use crate::services::session::SessionGate;

/// Settings the service reads on every request.
#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub digest_length: usize,
    pub default_author: String,
    pub page_size: i64,
    pub pagination_window_size: i64,
}

impl From<&NotebookConfig> for ContentSettings {
    fn from(config: &NotebookConfig) -> Self {
        Self {
            digest_length: config.digest_length,
            default_author: config.default_author.clone(),
            page_size: config.page_size,
            pagination_window_size: config.pagination_window_size,
        }
    }
}

/// A note draft that passed validation.
#[derive(Debug, Clone, PartialEq)]
struct Draft {
    title: String,
    content: String,
    private: bool,
    /// Trimmed, deduplicated, sorted.
    tags: Vec<String>,
}

fn validate_draft(title: &str, content: &str, private: bool, tags: &[String]) -> Result<Draft> {
    if title.trim().is_empty() {
        return Err(Error::Validation("title is required".to_string()));
    }
    if content.trim().is_empty() {
        return Err(Error::Validation("content is required".to_string()));
    }
    let mut names = BTreeSet::new();
    for tag in tags {
        let name = tag.trim();
        if name.is_empty() {
            return Err(Error::Validation("tag names must not be blank".to_string()));
        }
        names.insert(name.to_string());
    }
    if names.is_empty() {
        return Err(Error::Validation("at least one tag is required".to_string()));
    }
    Ok(Draft {
        title: title.to_string(),
        content: content.to_string(),
        private,
        tags: names.into_iter().collect(),
    })
}

/// Orchestrates note writes and reads over the repositories.
#[derive(Clone)]
pub struct ContentService {
    db: Database,
    session: SessionGate,
    sweeps: SweepHandle,
    extractor: Arc<dyn PlainTextExtractor>,
    settings: ContentSettings,
}

impl ContentService {
    pub fn new(
        db: Database,
        session: SessionGate,
        sweeps: SweepHandle,
        settings: ContentSettings,
    ) -> Self {
        Self {
            db,
            session,
            sweeps,
            extractor: Arc::new(HtmlTextExtractor::new()),
            settings,
        }
    }

    /// Replace the plain-text extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn PlainTextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn settings(&self) -> &ContentSettings {
        &self.settings
    }

    /// Plain text and its rune count. Extraction failures degrade to an
    /// empty digest.
    fn plain_text(&self, content: &str) -> (String, i32) {
        match self.extractor.extract(content) {
            Ok(text) => {
                let words = rune_count(&text);
                (text, words)
            }
            Err(e) => {
                warn!(
                    subsystem = "content",
                    error = %e,
                    "Plain text extraction failed, storing empty digest"
                );
                (String::new(), 0)
            }
        }
    }

    /// Upsert `names`, lock them, and link them to `note_id`.
    async fn link_tags(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        note_id: i64,
        names: &[String],
    ) -> Result<Vec<Tag>> {
        self.db.tags.upsert_by_name_tx(tx, names).await?;
        let tags = self.db.tags.lock_and_fetch_by_name_tx(tx, names).await?;
        self.db
            .notes
            .insert_associations_tx(tx, note_id, &tags)
            .await?;
        Ok(tags)
    }

    /// Publish a new note. Returns its id.
    #[instrument(skip(self, req), fields(subsystem = "content", op = "publish"))]
    pub async fn publish(&self, req: PublishNote) -> Result<i64> {
        let start = Instant::now();
        let draft = validate_draft(&req.title, &req.content, req.private, &req.tags)?;
        let (plain_text, words) = self.plain_text(&draft.content);

        let mut tx = self.db.begin().await?;
        let note_id = self
            .db
            .notes
            .insert_tx(
                &mut tx,
                &NewNote {
                    title: draft.title,
                    author: self.settings.default_author.clone(),
                    content: draft.content,
                    plain_text,
                    private: draft.private,
                    words,
                },
            )
            .await?;
        self.link_tags(&mut tx, note_id, &draft.tags).await?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            note_id,
            tag_count = draft.tags.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Note published"
        );
        Ok(note_id)
    }

    /// Replace a note's fields and tag set.
    #[instrument(skip(self, req), fields(subsystem = "content", op = "update"))]
    pub async fn update(&self, note_id: i64, req: UpdateNote) -> Result<()> {
        let start = Instant::now();
        let draft = validate_draft(&req.title, &req.content, req.private, &req.tags)?;
        let (plain_text, words) = self.plain_text(&draft.content);

        let mut tx = self.db.begin().await?;
        let updated = self
            .db
            .notes
            .update_tx(
                &mut tx,
                note_id,
                &NoteUpdate {
                    title: draft.title,
                    content: draft.content,
                    plain_text,
                    words,
                    private: draft.private,
                },
            )
            .await?;
        if updated == 0 {
            return Err(Error::NoteNotFound(note_id));
        }
        self.db.notes.delete_associations_tx(&mut tx, note_id).await?;
        self.link_tags(&mut tx, note_id, &draft.tags).await?;
        tx.commit().await.map_err(Error::Database)?;

        self.sweeps.schedule();
        info!(
            note_id,
            tag_count = draft.tags.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Note updated"
        );
        Ok(())
    }

    /// Delete a note and its associations.
    #[instrument(skip(self), fields(subsystem = "content", op = "delete"))]
    pub async fn delete(&self, note_id: i64) -> Result<()> {
        let mut tx = self.db.begin().await?;
        if self.db.notes.delete_tx(&mut tx, note_id).await? == 0 {
            return Err(Error::NoteNotFound(note_id));
        }
        let unlinked = self.db.notes.delete_associations_tx(&mut tx, note_id).await?;
        tx.commit().await.map_err(Error::Database)?;

        self.sweeps.schedule();
        info!(note_id, unlinked, "Note deleted");
        Ok(())
    }

    /// One page of notes, optionally restricted to `tag_id` (`0` for all).
    #[instrument(skip(self, token), fields(subsystem = "content", op = "list"))]
    pub async fn list(&self, page: i64, tag_id: i64, token: &str) -> Result<NoteList> {
        let total = self.db.notes.count_by_tag(tag_id).await?;
        let window = compute_window(
            page,
            self.settings.page_size,
            total,
            self.settings.pagination_window_size,
        );
        if window.is_empty() {
            debug!(page, tag_id, total, "Requested page is empty");
            return Ok(NoteList {
                notes: Vec::new(),
                page: window,
            });
        }

        let query = NotePageQuery::new(window.cur, self.settings.page_size).with_tag(tag_id);
        let mut notes = self.db.notes.list_page(&query).await?;

        let authenticated = self.session.is_authenticated(token).await;
        apply_list_policy(&mut notes, authenticated, self.settings.digest_length);

        Ok(NoteList {
            notes,
            page: window,
        })
    }

    /// A single note with its full body, redacted if private and the caller
    /// is not authenticated.
    #[instrument(skip(self, token), fields(subsystem = "content", op = "get"))]
    pub async fn get(&self, note_id: i64, token: &str) -> Result<Note> {
        let mut note = self
            .db
            .notes
            .fetch(note_id)
            .await?
            .ok_or(Error::NoteNotFound(note_id))?;
        let authenticated = self.session.is_authenticated(token).await;
        apply_single_policy(&mut note, authenticated);
        Ok(note)
    }

    /// Every tag in use, with its note count.
    pub async fn tags(&self) -> Result<Vec<Tag>> {
        self.db.tags.with_note_counts().await
    }

    pub async fn authenticate(&self, password: &str) -> Result<String> {
        self.session.authenticate(password).await
    }

    pub async fn is_authenticated(&self, token: &str) -> bool {
        self.session.is_authenticated(token).await
    }

    pub async fn logout(&self) -> Result<()> {
        self.session.logout().await
    }
}
