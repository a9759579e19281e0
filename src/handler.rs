use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value as JsonValue;
use tracing::info;
use url::form_urlencoded;

use crate::api::{Document, json_api_headers};
use crate::auth::AuthFailure;
use crate::error::ResourceError;
use crate::resource::{self, BookmarkResource, Context, Responder, ResultData};

pub const API_PREFIX: &str = "/v0";

#[derive(Clone)]
pub struct AppState {
    pub resource: Arc<BookmarkResource>,
    pub base_url: String,
}

impl AppState {
    pub fn new(resource: Arc<BookmarkResource>, base_url: impl Into<String>) -> Self {
        AppState {
            resource,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}{}/bookmarks", self.base_url, API_PREFIX)
    }
}

/// Splits a raw query string into a multi-valued, percent-decoded map.
pub fn parse_query_params(raw: Option<&str>) -> HashMap<String, Vec<String>> {
    let mut params: HashMap<String, Vec<String>> = HashMap::new();
    for (key, value) in form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
        params.entry(key.into_owned()).or_default().push(value.into_owned());
    }
    params
}

fn build_request(raw_query: Option<String>, auth: Option<Extension<AuthFailure>>) -> resource::Request {
    let context = match auth {
        Some(Extension(AuthFailure(reason))) => Context::with_auth_failure(reason),
        None => Context::default(),
    };
    resource::Request::new(parse_query_params(raw_query.as_deref()), context)
}

/// Unreadable bodies become `null`, which the adapter rejects as a bad
/// request once authentication has been checked.
fn parse_body(body: &Bytes) -> JsonValue {
    serde_json::from_slice(body).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "request body is not json");
        JsonValue::Null
    })
}

fn render(outcome: Result<resource::Response, ResourceError>, state: &AppState, req: &resource::Request) -> Response {
    let response = match outcome {
        Ok(response) => response,
        Err(err) => return err.into_response(),
    };

    let status = response.status_code();
    if status == StatusCode::NO_CONTENT {
        return status.into_response();
    }

    let mut document = match response.result() {
        ResultData::One(bm) => Document::one(bm),
        ResultData::Many(bms) => Document::many(bms),
        ResultData::Empty => return status.into_response(),
    };

    if let (Some(total), Some(pagination)) = (response.total(), response.pagination()) {
        let query = crate::storage::Query::from_params(&req.query_params);
        document.meta = Some(crate::api::Meta { total });
        document.links = Some(pagination.links(&state.endpoint(), query.tag(), total));
    }

    (status, json_api_headers(), Json(document)).into_response()
}

pub async fn healthcheck() -> impl IntoResponse {
    info!("got healthcheck request");
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn list_bookmarks(
    State(state): State<AppState>,
    auth: Option<Extension<AuthFailure>>,
    RawQuery(raw_query): RawQuery,
) -> Response {
    let req = build_request(raw_query, auth);
    let outcome = if req.wants_page() {
        state.resource.paginated_find_all(&req).await
    } else {
        state.resource.find_all(&req).await
    };
    render(outcome, &state, &req)
}

pub async fn get_bookmark(
    State(state): State<AppState>,
    auth: Option<Extension<AuthFailure>>,
    Path(id): Path<String>,
    RawQuery(raw_query): RawQuery,
) -> Response {
    let req = build_request(raw_query, auth);
    let outcome = state.resource.find_one(&id, &req).await;
    render(outcome, &state, &req)
}

pub async fn create_bookmark(
    State(state): State<AppState>,
    auth: Option<Extension<AuthFailure>>,
    RawQuery(raw_query): RawQuery,
    body: Bytes,
) -> Response {
    let req = build_request(raw_query, auth);
    let payload = parse_body(&body);
    let outcome = state.resource.create(&payload, &req).await;
    render(outcome, &state, &req)
}

pub async fn update_bookmark(
    State(state): State<AppState>,
    auth: Option<Extension<AuthFailure>>,
    Path(id): Path<String>,
    RawQuery(raw_query): RawQuery,
    body: Bytes,
) -> Response {
    let req = build_request(raw_query, auth);
    let outcome = match with_path_id(parse_body(&body), &id) {
        Ok(payload) => state.resource.update(&payload, &req).await,
        Err(e) => Err(e),
    };
    render(outcome, &state, &req)
}

pub async fn delete_bookmark(
    State(state): State<AppState>,
    auth: Option<Extension<AuthFailure>>,
    Path(id): Path<String>,
    RawQuery(raw_query): RawQuery,
) -> Response {
    let req = build_request(raw_query, auth);
    let outcome = state.resource.delete(&id, &req).await;
    render(outcome, &state, &req)
}

/// The path id is authoritative; a different id in the body is a conflict.
fn with_path_id(mut payload: JsonValue, id: &str) -> Result<JsonValue, ResourceError> {
    let Some(data) = payload.get_mut("data").and_then(JsonValue::as_object_mut) else {
        return Ok(payload);
    };

    match data.get("id").and_then(JsonValue::as_str) {
        Some(body_id) if !body_id.is_empty() && body_id != id => {
            return Err(ResourceError::conflict(format!(
                "body id {body_id:?} does not match path id {id:?}"
            )));
        }
        _ => {
            data.insert("id".to_string(), JsonValue::String(id.to_string()));
        }
    }
    Ok(payload)
}
