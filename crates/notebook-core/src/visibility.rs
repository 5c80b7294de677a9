//! Visibility policy applied to notes before they leave the service layer.
//!
//! Private notes are redacted for unauthenticated viewers. List views
//! additionally cut every other note down to a plain-text digest, so list
//! responses never carry full HTML.

use crate::models::Note;
use crate::text::digest;

/// Clear the body of a note.
pub fn redact(note: &mut Note) {
    note.content.clear();
    note.plain_text.clear();
}

/// Reduce a note to its digest: the first `digest_length` runes of the plain
/// text, with the HTML content dropped.
pub fn truncate(note: &mut Note, digest_length: usize) {
    note.plain_text = digest(&note.plain_text, digest_length);
    note.content.clear();
}

/// Apply the list-view policy: redact private notes for unauthenticated
/// viewers, truncate everything else. Never both.
pub fn apply_list_policy(notes: &mut [Note], authenticated: bool, digest_length: usize) {
    for note in notes {
        if note.private && !authenticated {
            redact(note);
        } else {
            truncate(note, digest_length);
        }
    }
}

/// Apply the single-note policy: redact a private note for unauthenticated
/// viewers, otherwise leave it untouched.
pub fn apply_single_policy(note: &mut Note, authenticated: bool) {
    if note.private && !authenticated {
        redact(note);
    }
}
