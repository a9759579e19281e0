use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use libsql::params::Params;
use libsql::{Row, Value};
use serde::Serialize;

use super::{Query, Storage};
use crate::db::Database;
use crate::error::StorageError;
use crate::model::{Bookmark, ObjectId};

/// Stored body of a bookmark; the id lives in its own `_id` column.
#[derive(Serialize)]
struct DocumentBody<'a> {
    title: &'a str,
    url: &'a str,
    description: &'a str,
    timestamp: DateTime<Utc>,
    tags: &'a [String],
}

impl<'a> DocumentBody<'a> {
    fn encode(bm: &'a Bookmark, timestamp: DateTime<Utc>) -> Result<String, StorageError> {
        let body = DocumentBody {
            title: &bm.title,
            url: &bm.url,
            description: &bm.description,
            timestamp,
            tags: &bm.tags,
        };
        Ok(serde_json::to_string(&body)?)
    }
}

/// Backend filter: a SQL boolean expression over `bookmarks` plus its
/// positional parameters.
struct Predicate {
    clause: &'static str,
    params: Vec<Value>,
}

impl Predicate {
    fn from_query(query: &Query) -> Self {
        match query.tag() {
            Some(tag) => Predicate {
                clause: "EXISTS (SELECT 1 FROM json_each(bookmarks.doc, '$.tags') AS t WHERE t.value = ?)",
                params: vec![Value::Text(tag.to_string())],
            },
            None => Predicate {
                clause: "1 = 1",
                params: vec![],
            },
        }
    }
}

pub struct DocumentStore {
    db: Database,
}

impl DocumentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn close(&self) {
        self.db.close();
    }

    fn parse_id(id: &str) -> Result<ObjectId, StorageError> {
        id.parse::<ObjectId>()
            .map_err(|_| StorageError::InvalidId(id.to_string()))
    }

    fn row_to_bookmark(row: &Row) -> Result<Option<Bookmark>, StorageError> {
        let raw_id: String = row.get(0)?;
        let doc: String = row.get(1)?;

        let id = match raw_id.parse::<ObjectId>() {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "skipping document with unusable id");
                return Ok(None);
            }
        };

        let mut bookmark: Bookmark = serde_json::from_str(&doc)?;
        bookmark.id = Some(id);
        Ok(Some(bookmark))
    }

    async fn select(&self, query: &Query, window: Option<(u64, u64)>) -> Result<Vec<Bookmark>, StorageError> {
        let session = self.db.session().await?;
        let predicate = Predicate::from_query(query);
        let mut params = predicate.params;

        let mut sql = format!(
            "SELECT _id, doc FROM bookmarks WHERE {} ORDER BY rowid",
            predicate.clause
        );
        if let Some((skip, limit)) = window {
            sql.push_str(" LIMIT ? OFFSET ?");
            // sqlite treats a negative limit as no limit, and a negative
            // offset as zero, so out-of-range values are clamped here
            let limit = match i64::try_from(limit) {
                Ok(0) | Err(_) => -1,
                Ok(limit) => limit,
            };
            params.push(Value::Integer(limit));
            params.push(Value::Integer(i64::try_from(skip).unwrap_or(i64::MAX)));
        }

        let mut rows = session.query(&sql, Params::Positional(params)).await?;
        let mut bookmarks = vec![];
        while let Some(row) = rows.next().await? {
            if let Some(bookmark) = Self::row_to_bookmark(&row)? {
                bookmarks.push(bookmark);
            }
        }

        Ok(bookmarks)
    }

    /// Administrative bulk load in a single transaction. Bookmarks that
    /// already carry an id keep it; the others get a new one.
    pub async fn bulk_insert(&self, bookmarks: &mut [Bookmark]) -> Result<usize, StorageError> {
        let session = self.db.session().await?;
        let tx = session.transaction().await?;

        for bookmark in bookmarks.iter_mut() {
            let id = bookmark.id.unwrap_or_else(ObjectId::new);
            let timestamp = bookmark.timestamp.trunc_subsecs(0);
            let doc = DocumentBody::encode(bookmark, timestamp)?;
            tx.execute(
                "INSERT INTO bookmarks (_id, doc) VALUES (?, ?)",
                libsql::params![id.to_hex(), doc],
            )
            .await?;
            bookmark.id = Some(id);
            bookmark.timestamp = timestamp;
        }

        tx.commit().await?;
        tracing::info!(count = bookmarks.len(), "bulk inserted bookmarks");
        Ok(bookmarks.len())
    }
}

#[async_trait]
impl Storage for DocumentStore {
    async fn get_all(&self, query: &Query) -> Result<Vec<Bookmark>, StorageError> {
        self.select(query, None).await
    }

    async fn get_page(&self, query: &Query, skip: u64, limit: u64) -> Result<Vec<Bookmark>, StorageError> {
        self.select(query, Some((skip, limit))).await
    }

    async fn count(&self, query: &Query) -> Result<u64, StorageError> {
        let session = self.db.session().await?;
        let predicate = Predicate::from_query(query);
        let sql = format!("SELECT COUNT(*) FROM bookmarks WHERE {}", predicate.clause);

        let mut rows = session.query(&sql, Params::Positional(predicate.params)).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? as u64),
            None => Ok(0),
        }
    }

    async fn get_one(&self, id: &str) -> Result<Bookmark, StorageError> {
        let oid = Self::parse_id(id)?;
        let session = self.db.session().await?;

        let mut rows = session
            .query(
                "SELECT _id, doc FROM bookmarks WHERE _id = ?",
                libsql::params![oid.to_hex()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::row_to_bookmark(&row)?.ok_or_else(|| StorageError::NotFound(id.to_string())),
            None => Err(StorageError::NotFound(id.to_string())),
        }
    }

    async fn insert(&self, bookmark: &mut Bookmark) -> Result<(), StorageError> {
        let session = self.db.session().await?;
        let id = ObjectId::new();
        let timestamp = bookmark.timestamp.trunc_subsecs(0);
        let doc = DocumentBody::encode(bookmark, timestamp)?;

        session
            .execute(
                "INSERT INTO bookmarks (_id, doc) VALUES (?, ?)",
                libsql::params![id.to_hex(), doc],
            )
            .await?;

        bookmark.id = Some(id);
        bookmark.timestamp = timestamp;
        tracing::debug!(id = %id, "inserted bookmark");
        Ok(())
    }

    async fn update(&self, bookmark: &mut Bookmark) -> Result<(), StorageError> {
        let id = bookmark.id.ok_or(StorageError::MissingId)?;
        let session = self.db.session().await?;
        let timestamp = Utc::now();
        let doc = DocumentBody::encode(bookmark, timestamp)?;

        let affected = session
            .execute(
                "UPDATE bookmarks SET doc = ? WHERE _id = ?",
                libsql::params![doc, id.to_hex()],
            )
            .await?;
        if affected == 0 {
            return Err(StorageError::NotFound(id.to_hex()));
        }

        bookmark.timestamp = timestamp;
        tracing::debug!(id = %id, "updated bookmark");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let oid = Self::parse_id(id)?;
        let session = self.db.session().await?;

        let affected = session
            .execute("DELETE FROM bookmarks WHERE _id = ?", libsql::params![oid.to_hex()])
            .await?;
        if affected == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }

        tracing::debug!(id = %oid, "deleted bookmark");
        Ok(())
    }
}
