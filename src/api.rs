use axum::http::{StatusCode, header};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::ResourceError;
use crate::model::Bookmark;

pub const JSON_API_CONTENT_TYPE: &str = "application/vnd.api+json";
pub const RESOURCE_TYPE: &str = "bookmarks";

pub fn json_api_headers() -> [(header::HeaderName, &'static str); 1] {
    [(header::CONTENT_TYPE, JSON_API_CONTENT_TYPE)]
}

/// Bookmark attributes as they travel over the wire. Absent fields stay
/// `None` so a partial update can leave them untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Attributes {
    /// Overlays the supplied fields onto `bm`. The timestamp is not
    /// copied; storage stamps it on update.
    pub fn apply_to(self, bm: &mut Bookmark) {
        if let Some(title) = self.title {
            bm.title = title;
        }
        if let Some(url) = self.url {
            bm.url = url;
        }
        if let Some(description) = self.description {
            bm.description = description;
        }
        if let Some(tags) = self.tags {
            bm.tags = tags;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub attributes: Attributes,
}

impl From<&Bookmark> for ResourceObject {
    fn from(bm: &Bookmark) -> Self {
        ResourceObject {
            kind: RESOURCE_TYPE.to_string(),
            id: bm.hex_id(),
            attributes: Attributes {
                title: Some(bm.title.clone()),
                url: Some(bm.url.clone()),
                description: Some(bm.description.clone()),
                timestamp: Some(bm.timestamp),
                tags: Some(bm.tags.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PrimaryData {
    One(ResourceObject),
    Many(Vec<ResourceObject>),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Links {
    #[serde(rename = "self", skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub total: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub data: PrimaryData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
}

impl Document {
    pub fn one(bm: &Bookmark) -> Self {
        Document {
            data: PrimaryData::One(bm.into()),
            meta: None,
            links: None,
        }
    }

    pub fn many(bms: &[Bookmark]) -> Self {
        Document {
            data: PrimaryData::Many(bms.iter().map(ResourceObject::from).collect()),
            meta: None,
            links: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorObject {
    pub status: String,
    pub title: String,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub errors: Vec<ErrorObject>,
}

impl ErrorDocument {
    pub fn single(status: StatusCode, detail: &str) -> Self {
        ErrorDocument {
            errors: vec![ErrorObject {
                status: status.as_u16().to_string(),
                title: status.canonical_reason().unwrap_or("Error").to_string(),
                detail: detail.to_string(),
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct IncomingDocument {
    data: ResourceObject,
}

/// Checks that `payload` is a single `bookmarks` resource document and
/// returns its raw id (empty ids count as absent) and attributes.
pub fn decode_document(payload: &JsonValue) -> Result<(Option<String>, Attributes), ResourceError> {
    if !payload.is_object() {
        return Err(ResourceError::bad_request("payload is not a bookmark document"));
    }
    let doc: IncomingDocument = serde_json::from_value(payload.clone())
        .map_err(|e| ResourceError::bad_request(format!("invalid bookmark document: {e}")))?;
    let resource = doc.data;

    if resource.kind != RESOURCE_TYPE {
        return Err(ResourceError::bad_request(format!(
            "unsupported resource type {:?}",
            resource.kind
        )));
    }

    Ok((resource.id.filter(|id| !id.is_empty()), resource.attributes))
}

/// Like `decode_document`, but builds a complete `Bookmark` with defaults
/// for every absent attribute. A missing timestamp defaults to now.
pub fn decode_bookmark(payload: &JsonValue) -> Result<(Option<String>, Bookmark), ResourceError> {
    let (id, attrs) = decode_document(payload)?;
    let bookmark = Bookmark {
        id: None,
        title: attrs.title.unwrap_or_default(),
        url: attrs.url.unwrap_or_default(),
        description: attrs.description.unwrap_or_default(),
        timestamp: attrs.timestamp.unwrap_or_else(Utc::now),
        tags: attrs.tags.unwrap_or_default(),
    };
    Ok((id, bookmark))
}
