#![allow(dead_code)]

use chrono::{DateTime, Utc};
use puka::db::Database;
use puka::model::Bookmark;
use puka::storage::DocumentStore;
use tempfile::TempDir;

pub const FIXTURE_TOTAL: usize = 1000;
pub const FIXTURE_GO: usize = 370;

pub async fn open_store() -> (TempDir, DocumentStore) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("puka-test.db"), 4).await.unwrap();
    (dir, DocumentStore::new(db))
}

pub fn bookmark(title: &str, tags: &[&str]) -> Bookmark {
    Bookmark {
        id: None,
        title: title.to_string(),
        url: format!("https://example.com/{}", title.to_lowercase().replace(' ', "-")),
        description: format!("{title} description"),
        timestamp: Utc::now(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

/// 1000 bookmarks, 370 of them tagged "go".
pub fn fixture() -> Vec<Bookmark> {
    (0..FIXTURE_TOTAL)
        .map(|i| {
            let tags: &[&str] = if i % 100 < 37 { &["web", "go"] } else { &["rust"] };
            Bookmark {
                timestamp: DateTime::from_timestamp(1_480_000_000 + i as i64 * 60, 0).unwrap(),
                ..bookmark(&format!("Bookmark {i}"), tags)
            }
        })
        .collect()
}

pub async fn seeded_store() -> (TempDir, DocumentStore) {
    let (dir, store) = open_store().await;
    let mut bookmarks = fixture();
    store.bulk_insert(&mut bookmarks).await.unwrap();
    (dir, store)
}
