use axum::{
    extract::{Request, State},
    http::{Method, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::handler::parse_query_params;

/// Marker attached to requests that failed token authentication. The
/// resource adapter answers those with 401 before touching storage.
#[derive(Debug, Clone)]
pub struct AuthFailure(pub String);

#[derive(Debug, Clone, Default)]
pub struct Authenticator {
    token: Option<Arc<str>>,
}

impl Authenticator {
    pub fn new(token: Option<String>) -> Self {
        Authenticator {
            token: token.filter(|t| !t.is_empty()).map(Arc::from),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// Reads are open; writes need the token either as `?token=` or as a
    /// bearer credential.
    pub fn check(&self, method: &Method, query: Option<&str>, authorization: Option<&str>) -> Result<(), AuthFailure> {
        let Some(expected) = self.token.as_deref() else {
            return Ok(());
        };
        if [Method::GET, Method::HEAD, Method::OPTIONS].contains(method) {
            return Ok(());
        }

        let supplied = query
            .and_then(token_from_query)
            .or_else(|| authorization.and_then(|h| h.strip_prefix("Bearer ")).map(str::to_string));

        match supplied {
            Some(token) if token == expected => Ok(()),
            Some(_) => Err(AuthFailure("invalid token".to_string())),
            None => Err(AuthFailure("missing token".to_string())),
        }
    }
}

fn token_from_query(query: &str) -> Option<String> {
    parse_query_params(Some(query))
        .remove("token")
        .and_then(|values| values.into_iter().next())
}

pub async fn authenticate(State(auth): State<Authenticator>, mut req: Request, next: Next) -> Response {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let Err(failure) = auth.check(req.method(), req.uri().query(), authorization.as_deref()) {
        tracing::info!(method = %req.method(), path = %req.uri().path(), reason = %failure.0, "authentication failed");
        req.extensions_mut().insert(failure);
    }

    next.run(req).await
}
