//! The bookmark resource adapter.
//!
//! Implements the five resource verbs (find-all, find-one, create, update,
//! delete) on top of a [`Storage`] and turns every outcome into something the
//! HTTP layer can render: a [`Response`] on success, a classified
//! [`ResourceError`] on failure. Both implement [`Responder`].

use axum::http::StatusCode;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::{decode_bookmark, decode_document};
use crate::error::{ErrorKind, ResourceError, StorageError};
use crate::model::{Bookmark, ObjectId};
use crate::pagination::Pagination;
use crate::storage::{Query, Storage};

pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Per-request context filled in by middleware.
#[derive(Debug, Clone, Default)]
pub struct Context {
    auth_failure: Option<String>,
}

impl Context {
    pub fn with_auth_failure(reason: impl Into<String>) -> Self {
        Context {
            auth_failure: Some(reason.into()),
        }
    }

    pub fn auth_failure(&self) -> Option<&str> {
        self.auth_failure.as_deref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Request {
    pub query_params: HashMap<String, Vec<String>>,
    pub context: Context,
}

impl Request {
    pub fn new(query_params: HashMap<String, Vec<String>>, context: Context) -> Self {
        Request { query_params, context }
    }

    pub fn wants_page(&self) -> bool {
        Pagination::is_requested(&self.query_params)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultData {
    Empty,
    One(Bookmark),
    Many(Vec<Bookmark>),
}

static EMPTY: ResultData = ResultData::Empty;

/// Uniform view over successful and failed adapter outcomes.
pub trait Responder {
    fn result(&self) -> &ResultData;
    fn status_code(&self) -> StatusCode;
}

#[derive(Debug, Clone)]
pub struct Response {
    result: ResultData,
    code: StatusCode,
    total: Option<u64>,
    pagination: Option<Pagination>,
}

impl Response {
    fn new(result: ResultData, code: StatusCode) -> Self {
        Response {
            result,
            code,
            total: None,
            pagination: None,
        }
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.pagination
    }
}

impl Responder for Response {
    fn result(&self) -> &ResultData {
        &self.result
    }

    fn status_code(&self) -> StatusCode {
        self.code
    }
}

impl Responder for ResourceError {
    fn result(&self) -> &ResultData {
        &EMPTY
    }

    fn status_code(&self) -> StatusCode {
        ResourceError::status_code(self)
    }
}

#[derive(Debug, Clone)]
pub struct ResourceConfig {
    pub default_page_size: u64,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        ResourceConfig {
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

pub struct BookmarkResource {
    storage: Arc<dyn Storage>,
    config: ResourceConfig,
}

impl BookmarkResource {
    pub fn new(storage: Arc<dyn Storage>, config: ResourceConfig) -> Self {
        BookmarkResource { storage, config }
    }

    fn authorize(&self, req: &Request) -> Result<(), ResourceError> {
        match req.context.auth_failure() {
            Some(reason) => {
                tracing::info!(reason, "rejecting unauthenticated request");
                Err(ResourceError::unauthorized(reason))
            }
            None => Ok(()),
        }
    }

    fn storage_failure(op: &str, err: StorageError) -> ResourceError {
        let err = ResourceError::from_storage(err);
        match err.kind() {
            ErrorKind::InternalError => tracing::error!(op, error = %err, "storage call failed"),
            _ => tracing::info!(op, error = %err, "storage call failed"),
        }
        err
    }

    pub async fn find_all(&self, req: &Request) -> Result<Response, ResourceError> {
        self.authorize(req)?;
        let query = Query::from_params(&req.query_params);

        let bookmarks = self
            .storage
            .get_all(&query)
            .await
            .map_err(|e| Self::storage_failure("find_all", e))?;

        Ok(Response::new(ResultData::Many(bookmarks), StatusCode::OK))
    }

    /// Like `find_all` but windowed by the request's page parameters, with
    /// the size of the whole matching set attached.
    pub async fn paginated_find_all(&self, req: &Request) -> Result<Response, ResourceError> {
        self.authorize(req)?;
        let query = Query::from_params(&req.query_params);
        let pagination = Pagination::from_params(&req.query_params, self.config.default_page_size)
            .map_err(ResourceError::bad_request)?
            .unwrap_or(Pagination::Number {
                number: 1,
                size: self.config.default_page_size,
            });

        let total = self
            .storage
            .count(&query)
            .await
            .map_err(|e| Self::storage_failure("paginated_find_all", e))?;
        let bookmarks = self
            .storage
            .get_page(&query, pagination.skip(), pagination.limit())
            .await
            .map_err(|e| Self::storage_failure("paginated_find_all", e))?;

        let mut response = Response::new(ResultData::Many(bookmarks), StatusCode::OK);
        response.total = Some(total);
        response.pagination = Some(pagination);
        Ok(response)
    }

    pub async fn find_one(&self, id: &str, req: &Request) -> Result<Response, ResourceError> {
        self.authorize(req)?;

        let bookmark = self
            .storage
            .get_one(id)
            .await
            .map_err(|e| Self::storage_failure("find_one", e))?;

        Ok(Response::new(ResultData::One(bookmark), StatusCode::OK))
    }

    pub async fn create(&self, payload: &JsonValue, req: &Request) -> Result<Response, ResourceError> {
        self.authorize(req)?;
        let (_, mut bookmark) = decode_bookmark(payload)?;

        self.storage
            .insert(&mut bookmark)
            .await
            .map_err(|e| Self::storage_failure("create", e))?;

        tracing::info!(id = ?bookmark.hex_id(), "created bookmark");
        Ok(Response::new(ResultData::One(bookmark), StatusCode::CREATED))
    }

    /// Applies the supplied attributes to the stored bookmark. Attributes
    /// absent from the payload keep their stored values.
    pub async fn update(&self, payload: &JsonValue, req: &Request) -> Result<Response, ResourceError> {
        self.authorize(req)?;
        let (id, attrs) = decode_document(payload)?;
        let id = match id {
            // a malformed id cannot name a stored bookmark
            Some(raw) => raw.parse::<ObjectId>().map_err(|e| ResourceError::not_found(e.to_string()))?,
            None => return Err(Self::storage_failure("update", StorageError::MissingId)),
        };

        let mut bookmark = self
            .storage
            .get_one(&id.to_hex())
            .await
            .map_err(|e| Self::storage_failure("update", e))?;
        attrs.apply_to(&mut bookmark);

        self.storage
            .update(&mut bookmark)
            .await
            .map_err(|e| Self::storage_failure("update", e))?;

        tracing::info!(id = %id, "updated bookmark");
        Ok(Response::new(ResultData::One(bookmark), StatusCode::OK))
    }

    pub async fn delete(&self, id: &str, req: &Request) -> Result<Response, ResourceError> {
        self.authorize(req)?;

        self.storage
            .delete(id)
            .await
            .map_err(|e| Self::storage_failure("delete", e))?;

        tracing::info!(id, "deleted bookmark");
        Ok(Response::new(ResultData::Empty, StatusCode::NO_CONTENT))
    }
}
