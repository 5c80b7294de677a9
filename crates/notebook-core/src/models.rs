//! Domain models shared by the repositories, the service layer and the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// NOTE
// =============================================================================

/// A note together with its tag set.
///
/// `words` is the rune count of `plain_text` at the last successful write.
/// `content` and `plain_text` may be cleared by the visibility policy before
/// the note leaves the service layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub content: String,
    pub plain_text: String,
    pub private: bool,
    pub words: i32,
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "update_at")]
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Names of the tags attached to this note, sorted.
    pub fn tag_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tags.iter().map(|t| t.name.clone()).collect();
        names.sort();
        names
    }
}

/// Row values for inserting a note. Derived fields are computed by the caller.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub title: String,
    pub author: String,
    pub content: String,
    pub plain_text: String,
    pub private: bool,
    pub words: i32,
}

/// Row values for updating a note in place.
#[derive(Debug, Clone)]
pub struct NoteUpdate {
    pub title: String,
    pub content: String,
    pub plain_text: String,
    pub words: i32,
    pub private: bool,
}

/// Parameters for fetching one page of notes.
#[derive(Debug, Clone)]
pub struct NotePageQuery {
    /// 1-based page number.
    pub page: i64,
    pub page_size: i64,
    /// Restrict to notes carrying this tag; `0` means no restriction.
    pub tag_id: i64,
    /// Order by `updated_at` descending.
    pub sort_by_recency: bool,
    /// Pull the full tag set of every returned note.
    pub include_tags: bool,
}

impl NotePageQuery {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page,
            page_size,
            tag_id: 0,
            sort_by_recency: true,
            include_tags: true,
        }
    }

    pub fn with_tag(mut self, tag_id: i64) -> Self {
        self.tag_id = tag_id;
        self
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.page_size
    }
}

// =============================================================================
// TAG
// =============================================================================

/// A tag. `tagged` is only populated by aggregation queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub tagged: i64,
}

impl Tag {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            tagged: 0,
        }
    }
}

// =============================================================================
// PAGINATION
// =============================================================================

/// Window of page numbers around the current page.
///
/// All fields are zero when there is nothing to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub left: i64,
    pub right: i64,
    pub cur: i64,
    pub total: i64,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.total <= 0
    }
}

// =============================================================================
// SERVICE REQUESTS AND RESPONSES
// =============================================================================

/// Input for publishing a new note.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishNote {
    pub title: String,
    pub content: String,
    pub private: bool,
    pub tags: Vec<String>,
}

/// Input for replacing an existing note.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateNote {
    pub title: String,
    pub content: String,
    pub private: bool,
    pub tags: Vec<String>,
}

/// One page of notes plus the pagination window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteList {
    pub notes: Vec<Note>,
    pub page: Page,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_note() -> Note {
        let now = Utc::now();
        Note {
            id: 7,
            title: "hello".to_string(),
            author: "admin".to_string(),
            content: "<p>hi</p>".to_string(),
            plain_text: "hi".to_string(),
            private: false,
            words: 2,
            tags: vec![Tag::new(2, "rust"), Tag::new(1, "go")],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_note_serializes_update_at_field() {
        let json = serde_json::to_value(sample_note()).unwrap();
        assert!(json.get("update_at").is_some());
        assert!(json.get("updated_at").is_none());
        assert_eq!(json["plain_text"], "hi");
    }

    #[test]
    fn test_tag_names_sorted() {
        assert_eq!(sample_note().tag_names(), vec!["go", "rust"]);
    }

    #[test]
    fn test_page_query_offset() {
        assert_eq!(NotePageQuery::new(1, 10).offset(), 0);
        assert_eq!(NotePageQuery::new(3, 10).offset(), 20);
        assert_eq!(NotePageQuery::new(0, 10).offset(), 0);
    }

    #[test]
    fn test_page_default_is_empty() {
        assert!(Page::default().is_empty());
    }

    #[test]
    fn test_update_note_missing_fields_are_empty() {
        let req: UpdateNote = serde_json::from_str("{}").unwrap();
        assert!(req.title.is_empty());
        assert!(req.content.is_empty());
    }

    #[test]
    fn test_publish_note_defaults() {
        let req: PublishNote =
            serde_json::from_str(r#"{"title":"t","content":"c"}"#).unwrap();
        assert!(!req.private);
        assert!(req.tags.is_empty());
    }
}
