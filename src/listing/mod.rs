pub mod client;
pub mod error_content;

use std::future::Future;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::pages::PageSize;

pub use client::{ClientError, ClientOptions, HttpListingClient};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub start: u64,
    pub count: PageSize,
    pub sort: Option<String>,
    pub sort_desc: Option<bool>,
}

impl PageRequest {
    /// Query pairs in the order the listing endpoint documents them. Sort
    /// parameters are only sent when a sort column is set.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut out = vec![
            ("start", self.start.to_string()),
            ("count", self.count.as_count().to_string()),
        ];
        if let Some(sort) = self.sort.as_ref() {
            out.push(("sort", sort.clone()));
            out.push(("sort-desc", self.sort_desc.unwrap_or(false).to_string()));
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PageResponse {
    pub start: u64,
    pub total_count: u64,
    pub items: Vec<Value>,
    pub sort: Option<String>,
    pub sort_desc: Option<bool>,
}

// `count` on the wire is the total number of items, not the page length.
#[derive(Debug, Deserialize)]
struct WireResponse {
    start: u64,
    count: u64,
    #[serde(default)]
    sort: Option<String>,
    #[serde(rename = "sort-desc", default)]
    sort_desc: Option<bool>,
    #[serde(default)]
    items: Vec<Value>,
}

impl From<WireResponse> for PageResponse {
    fn from(wire: WireResponse) -> Self {
        Self {
            start: wire.start,
            total_count: wire.count,
            items: wire.items,
            sort: wire.sort,
            sort_desc: wire.sort_desc,
        }
    }
}

/// Decodes a listing body and trims any items beyond what was requested.
pub fn decode_page(body: &str, request: &PageRequest) -> Result<PageResponse, ListingFailure> {
    let wire: WireResponse = serde_json::from_str(body)
        .map_err(|e| ListingFailure::InvalidResponse(e.to_string()))?;
    let mut page = PageResponse::from(wire);
    let pages = crate::pages::page_count(page.total_count, request.count);
    if pages > crate::pages::MAX_PAGES {
        return Err(ListingFailure::InvalidResponse(format!(
            "total count {} needs {pages} pages of {}, more than {}",
            page.total_count,
            request.count,
            crate::pages::MAX_PAGES
        )));
    }
    if let Some(limit) = request.count.limit() {
        let limit = limit as usize;
        if page.items.len() > limit {
            tracing::warn!(
                returned = page.items.len(),
                requested = limit,
                "listing returned more items than requested, truncating"
            );
            page.items.truncate(limit);
        }
    }
    Ok(page)
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ListingFailure {
    #[error("session is not authorized (HTTP 401)")]
    Unauthorized,

    #[error("server error (HTTP {status})")]
    ServerError { status: u16, body: String },

    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid listing response: {0}")]
    InvalidResponse(String),
}

impl ListingFailure {
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => Self::Unauthorized,
            500..=599 => Self::ServerError { status, body },
            _ => Self::Status { status },
        }
    }
}

/// Fetches one page from a listing endpoint. Implementations must not retry.
pub trait ListingTransport {
    fn list(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<PageResponse, ListingFailure>> + Send;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Hands out one token per issued request; only the most recent token is
/// current.
#[derive(Clone, Debug, Default)]
pub struct RequestSequence {
    latest: u64,
}

impl RequestSequence {
    pub fn issue(&mut self) -> RequestToken {
        self.latest += 1;
        RequestToken(self.latest)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.latest
    }

    pub fn latest(&self) -> Option<RequestToken> {
        (self.latest > 0).then_some(RequestToken(self.latest))
    }
}
