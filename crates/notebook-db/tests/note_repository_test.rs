//! Integration tests for the note repository.
//!
//! **IMPORTANT**: These tests require a running PostgreSQL server reachable via
//! `DATABASE_URL` (or the default test URL). Each test migrates its own schema.

use notebook_db::test_fixtures::TestDatabase;
use notebook_db::{NotePageQuery, NoteRepository, NoteUpdate, TagRepository};

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_publish_then_fetch_round_trip() {
    let _ = dotenvy::dotenv();
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let id = test_db.seed_note("first", &["rust", "go", "rust"]).await;
    let note = db.notes.fetch(id).await.unwrap().expect("note exists");

    assert_eq!(note.id, id);
    assert_eq!(note.title, "first");
    assert_eq!(note.author, "admin");
    assert_eq!(note.tag_names(), vec!["go", "rust"]);
    assert!(note.created_at <= note.updated_at);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_fetch_missing_note_is_none() {
    let _ = dotenvy::dotenv();
    let test_db = TestDatabase::new().await;

    assert!(test_db.db.notes.fetch(424242).await.unwrap().is_none());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_list_page_and_tag_filter() {
    let _ = dotenvy::dotenv();
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let mut ids = Vec::new();
    for i in 0..12 {
        let tags: &[&str] = if i % 3 == 0 { &["even", "three"] } else { &["even"] };
        ids.push(test_db.seed_note(&format!("note {i}"), tags).await);
    }

    assert_eq!(db.notes.count_by_tag(0).await.unwrap(), 12);

    let first = db.notes.list_page(&NotePageQuery::new(1, 5)).await.unwrap();
    assert_eq!(first.len(), 5);
    // Newest first.
    assert_eq!(first[0].id, *ids.last().unwrap());
    assert!(first.windows(2).all(|w| w[0].updated_at >= w[1].updated_at));

    let last = db.notes.list_page(&NotePageQuery::new(3, 5)).await.unwrap();
    assert_eq!(last.len(), 2);

    let tags = db.tags.with_note_counts().await.unwrap();
    let three = tags.iter().find(|t| t.name == "three").expect("tag three");
    assert_eq!(three.tagged, 4);
    assert_eq!(db.notes.count_by_tag(three.id).await.unwrap(), 4);

    let filtered = db
        .notes
        .list_page(&NotePageQuery::new(1, 10).with_tag(three.id))
        .await
        .unwrap();
    assert_eq!(filtered.len(), 4);
    // Filtering by one tag still returns the full tag set.
    for note in &filtered {
        assert_eq!(note.tag_names(), vec!["even", "three"]);
    }

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_list_page_without_tags() {
    let _ = dotenvy::dotenv();
    let test_db = TestDatabase::new().await;
    test_db.seed_note("tagged", &["a", "b"]).await;

    let mut query = NotePageQuery::new(1, 10);
    query.include_tags = false;
    let notes = test_db.db.notes.list_page(&query).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].tags.is_empty());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_update_and_delete_report_rows() {
    let _ = dotenvy::dotenv();
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;
    let id = test_db.seed_note("draft", &["x"]).await;
    let before = db.notes.fetch(id).await.unwrap().unwrap();

    let update = NoteUpdate {
        title: "final".to_string(),
        content: "<p>final</p>".to_string(),
        plain_text: "final".to_string(),
        words: 5,
        private: true,
    };
    let mut tx = db.begin().await.unwrap();
    assert_eq!(db.notes.update_tx(&mut tx, id, &update).await.unwrap(), 1);
    assert_eq!(db.notes.update_tx(&mut tx, id + 1000, &update).await.unwrap(), 0);
    tx.commit().await.unwrap();

    let after = db.notes.fetch(id).await.unwrap().unwrap();
    assert_eq!(after.title, "final");
    assert!(after.private);
    assert!(after.updated_at >= before.updated_at);
    assert_eq!(after.created_at, before.created_at);

    let mut tx = db.begin().await.unwrap();
    assert_eq!(db.notes.delete_tx(&mut tx, id).await.unwrap(), 1);
    assert_eq!(db.notes.delete_associations_tx(&mut tx, id).await.unwrap(), 1);
    tx.commit().await.unwrap();

    assert!(db.notes.fetch(id).await.unwrap().is_none());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_rolled_back_insert_leaves_nothing() {
    let _ = dotenvy::dotenv();
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    {
        let mut tx = db.begin().await.unwrap();
        db.notes
            .insert_tx(
                &mut tx,
                &notebook_db::NewNote {
                    title: "gone".to_string(),
                    author: "admin".to_string(),
                    content: String::new(),
                    plain_text: String::new(),
                    private: false,
                    words: 0,
                },
            )
            .await
            .unwrap();
        // Dropped without commit.
    }

    assert_eq!(db.notes.count_by_tag(0).await.unwrap(), 0);

    test_db.cleanup().await;
}
