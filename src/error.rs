use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::{error::Error, fmt};

use crate::api::ErrorDocument;

/// Raw failures surfaced by a `Storage` backend. Carries no HTTP knowledge;
/// classification happens in the resource adapter.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid id: {0:?}")]
    InvalidId(String),
    #[error("bookmark has no id")]
    MissingId,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("backend error: {0}")]
    Backend(#[from] libsql::Error),
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::NotFound(_) | StorageError::InvalidId(_) | StorageError::MissingId
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Unauthorized,
    Conflict,
    InternalError,
}

impl ErrorKind {
    pub fn status_code(&self) -> StatusCode {
        use ErrorKind::*;
        match self {
            NotFound => StatusCode::NOT_FOUND,
            BadRequest => StatusCode::BAD_REQUEST,
            Unauthorized => StatusCode::UNAUTHORIZED,
            Conflict => StatusCode::CONFLICT,
            InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A classified failure produced by the resource adapter.
#[derive(Debug)]
pub struct ResourceError {
    kind: ErrorKind,
    message: String,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl ResourceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ResourceError {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }

    /// NotFound-class storage errors become 404, everything else 500.
    /// The storage message is kept as the error detail.
    pub fn from_storage(err: StorageError) -> Self {
        let kind = if err.is_not_found() {
            ErrorKind::NotFound
        } else {
            ErrorKind::InternalError
        };
        Self::new(kind, err.to_string()).with_source(err)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn document(&self) -> ErrorDocument {
        ErrorDocument::single(self.status_code(), &self.message)
    }
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ErrorKind::*;
        match self.kind {
            NotFound => write!(f, "NotFound: {}", self.message),
            BadRequest => write!(f, "BadRequest: {}", self.message),
            Unauthorized => write!(f, "Unauthorized: {}", self.message),
            Conflict => write!(f, "Conflict: {}", self.message),
            InternalError => write!(f, "InternalError: {}", self.message),
        }
    }
}

impl Error for ResourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl From<StorageError> for ResourceError {
    fn from(error: StorageError) -> Self {
        ResourceError::from_storage(error)
    }
}

impl IntoResponse for ResourceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, crate::api::json_api_headers(), Json(self.document())).into_response()
    }
}
