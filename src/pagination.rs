use std::collections::HashMap;

use crate::api::Links;

const PAGE_NUMBER: &str = "page[number]";
const PAGE_SIZE: &str = "page[size]";
const PAGE_OFFSET: &str = "page[offset]";
const PAGE_LIMIT: &str = "page[limit]";

// skip + limit has to fit a sqlite INTEGER
const MAX_WINDOW_END: u64 = i64::MAX as u64;

/// The two JSON-API paging styles accepted on list requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    Number { number: u64, size: u64 },
    Offset { offset: u64, limit: u64 },
}

fn first_value<'a>(params: &'a HashMap<String, Vec<String>>, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|vs| vs.first()).map(String::as_str)
}

fn parse_param(params: &HashMap<String, Vec<String>>, key: &str) -> Result<Option<u64>, String> {
    match first_value(params, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|_| format!("{key} must be a non-negative integer, got {raw:?}")),
    }
}

impl Pagination {
    pub fn is_requested(params: &HashMap<String, Vec<String>>) -> bool {
        [PAGE_NUMBER, PAGE_SIZE, PAGE_OFFSET, PAGE_LIMIT]
            .iter()
            .any(|k| params.contains_key(*k))
    }

    /// Returns `Ok(None)` when no page parameter is present. Number/size
    /// takes precedence over offset/limit when both are sent.
    pub fn from_params(params: &HashMap<String, Vec<String>>, default_size: u64) -> Result<Option<Self>, String> {
        let number = parse_param(params, PAGE_NUMBER)?;
        let size = parse_param(params, PAGE_SIZE)?;
        let offset = parse_param(params, PAGE_OFFSET)?;
        let limit = parse_param(params, PAGE_LIMIT)?;

        if number.is_some() || size.is_some() {
            let number = number.unwrap_or(1);
            let size = size.unwrap_or(default_size);
            if number == 0 {
                return Err(format!("{PAGE_NUMBER} starts at 1"));
            }
            if size == 0 {
                return Err(format!("{PAGE_SIZE} must be at least 1"));
            }
            return Pagination::Number { number, size }.checked();
        }

        if offset.is_some() || limit.is_some() {
            let offset = offset.unwrap_or(0);
            let limit = limit.unwrap_or(default_size);
            if limit == 0 {
                return Err(format!("{PAGE_LIMIT} must be at least 1"));
            }
            return Pagination::Offset { offset, limit }.checked();
        }

        Ok(None)
    }

    /// Rejects windows whose end does not fit a signed 64-bit row count.
    fn checked(self) -> Result<Option<Self>, String> {
        let skip = match self {
            Pagination::Number { number, size } => (number - 1).checked_mul(size),
            Pagination::Offset { offset, .. } => Some(offset),
        };
        match skip.and_then(|s| s.checked_add(self.limit())) {
            Some(end) if end <= MAX_WINDOW_END => Ok(Some(self)),
            _ => Err("requested page is out of range".to_string()),
        }
    }

    pub fn skip(&self) -> u64 {
        match *self {
            Pagination::Number { number, size } => number.saturating_sub(1).saturating_mul(size),
            Pagination::Offset { offset, .. } => offset,
        }
    }

    pub fn limit(&self) -> u64 {
        match *self {
            Pagination::Number { size, .. } => size,
            Pagination::Offset { limit, .. } => limit,
        }
    }

    /// Builds self/first/prev/next/last links against `endpoint`, keeping
    /// the tag filter (if any) on every link.
    pub fn links(&self, endpoint: &str, tag: Option<&str>, total: u64) -> Links {
        let filter = tag
            .map(|t| format!("&filter[tag]={}", urlencoding::encode(t)))
            .unwrap_or_default();

        match *self {
            Pagination::Number { number, size } => {
                let last = total.div_ceil(size).max(1);
                let link = |n: u64| format!("{endpoint}?{PAGE_NUMBER}={n}&{PAGE_SIZE}={size}{filter}");
                Links {
                    self_link: Some(link(number)),
                    first: Some(link(1)),
                    prev: (number > 1).then(|| link((number - 1).min(last))),
                    next: (number < last).then(|| link(number + 1)),
                    last: Some(link(last)),
                }
            }
            Pagination::Offset { offset, limit } => {
                let last = if total == 0 { 0 } else { (total - 1) / limit * limit };
                let link = |o: u64| format!("{endpoint}?{PAGE_OFFSET}={o}&{PAGE_LIMIT}={limit}{filter}");
                Links {
                    self_link: Some(link(offset)),
                    first: Some(link(0)),
                    prev: (offset > 0).then(|| link(offset.saturating_sub(limit))),
                    next: offset
                        .checked_add(limit)
                        .filter(|next| *next < total)
                        .map(&link),
                    last: Some(link(last)),
                }
            }
        }
    }
}
