use std::collections::HashMap;

const TAG_FILTER: &str = "filter[tag]";

/// Backend-agnostic filter built from request filter parameters.
///
/// Only `filter[tag]` is understood; every other key is ignored. An empty
/// query matches all bookmarks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    tag: Option<String>,
}

impl Query {
    pub fn all() -> Self {
        Query::default()
    }

    pub fn with_tag(tag: impl Into<String>) -> Self {
        Query { tag: Some(tag.into()) }
    }

    /// Uses the first non-empty value of `filter[tag]` when several are given.
    pub fn from_params(params: &HashMap<String, Vec<String>>) -> Self {
        let tag = params
            .get(TAG_FILTER)
            .and_then(|values| values.iter().find(|v| !v.is_empty()))
            .cloned();
        Query { tag }
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.tag.is_none()
    }
}
