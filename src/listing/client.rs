use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use super::{decode_page, ListingFailure, ListingTransport, PageRequest, PageResponse};

#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub timeout_seconds: u64,
    pub proxy: Option<String>,
    pub header: Option<String>,
    /// Fixed query parameters sent with every listing request.
    pub params: Vec<(String, String)>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            proxy: None,
            header: None,
            params: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("invalid header '{header}', expected 'Name: Value'")]
    InvalidHeader { header: String },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Listing client backed by `reqwest`. One GET per `list` call, no retries.
#[derive(Clone, Debug)]
pub struct HttpListingClient {
    client: reqwest::Client,
    url: reqwest::Url,
    params: Vec<(String, String)>,
}

impl HttpListingClient {
    pub fn new(url: &str, options: ClientOptions) -> Result<Self, ClientError> {
        let url = reqwest::Url::parse(url).map_err(|_| ClientError::InvalidUrl {
            url: url.to_string(),
        })?;
        let client = build_client(&options)?;
        Ok(Self {
            client,
            url,
            params: options.params,
        })
    }

    pub fn url(&self) -> &reqwest::Url {
        &self.url
    }
}

impl ListingTransport for HttpListingClient {
    async fn list(&self, request: &PageRequest) -> Result<PageResponse, ListingFailure> {
        debug!(url = %self.url, start = request.start, count = %request.count, "listing");
        let response = self
            .client
            .get(self.url.clone())
            .query(&self.params)
            .query(&request.query_pairs())
            .send()
            .await
            .map_err(|e| ListingFailure::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ListingFailure::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(ListingFailure::from_status(status.as_u16(), body));
        }
        decode_page(&body, request)
    }
}

pub(crate) fn parse_header(raw: &str) -> Result<(String, String), ClientError> {
    let invalid = || ClientError::InvalidHeader {
        header: raw.to_string(),
    };
    let (name, value) = raw.split_once(':').ok_or_else(invalid)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid());
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn build_client(options: &ClientOptions) -> Result<reqwest::Client, ClientError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static("application/json"),
    );
    if let Some(raw) = options.header.as_deref().filter(|h| !h.trim().is_empty()) {
        let (name, value) = parse_header(raw)?;
        let invalid = || ClientError::InvalidHeader {
            header: raw.to_string(),
        };
        let name =
            reqwest::header::HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let value = reqwest::header::HeaderValue::from_str(&value).map_err(|_| invalid())?;
        headers.insert(name, value);
    }

    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(options.timeout_seconds.max(1)));

    if let Some(proxy) = options.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| ClientError::ProxySetup {
            proxy: proxy.to_string(),
            source: e,
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ClientError::HttpClientBuild { source: e })
}
