//! Bookmark persistence.
//!
//! `Storage` is the contract the resource adapter talks to. `DocumentStore`
//! implements it on top of libsql, keeping each bookmark as a JSON document.
//! Test doubles implement the trait directly.

mod document;
mod query;

pub use document::DocumentStore;
pub use query::Query;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::model::Bookmark;

#[async_trait]
pub trait Storage: Send + Sync {
    /// All bookmarks matching `query`, in insertion order.
    async fn get_all(&self, query: &Query) -> Result<Vec<Bookmark>, StorageError>;

    /// A window of `get_all`. A `limit` of 0 puts no cap on the window.
    async fn get_page(&self, query: &Query, skip: u64, limit: u64) -> Result<Vec<Bookmark>, StorageError>;

    async fn count(&self, query: &Query) -> Result<u64, StorageError>;

    /// Fails with a not-found error for unknown or malformed ids.
    async fn get_one(&self, id: &str) -> Result<Bookmark, StorageError>;

    /// Assigns a fresh id and truncates the timestamp to whole seconds,
    /// both on `bookmark` itself.
    async fn insert(&self, bookmark: &mut Bookmark) -> Result<(), StorageError>;

    /// Overwrites the stored document with the same id and resets its
    /// timestamp to the current time.
    async fn update(&self, bookmark: &mut Bookmark) -> Result<(), StorageError>;

    /// Removing an id that does not exist is an error.
    async fn delete(&self, id: &str) -> Result<(), StorageError>;
}
