//! HTTP fetcher implementation
//!
//! This module handles all plain HTTP requests for the crawler, including:
//! - Building HTTP clients from the `[http]` configuration
//! - Streaming GET requests with a response size limit
//! - Error classification into `FetchError`
//!
//! Non-2xx responses are not errors here; the caller decides what a status
//! means. Retries live in the `retry` module.

use crate::config::{CrawlConfig, HttpConfig};
use crate::state::RenderMode;
use crate::{ConfigError, FetchError, LensError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::{redirect::Policy, Client, Proxy};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use url::Url;

/// Maximum redirect hops followed when `follow-redirects` is on
const MAX_REDIRECTS: usize = 10;

/// A response received from a fetch strategy
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// URL after redirects
    pub final_url: Url,

    /// HTTP status code
    pub status: u16,

    /// Response headers, names lowercased
    pub headers: HashMap<String, String>,

    /// Content-Type header value
    pub content_type: Option<String>,

    /// Decoded body (lossy UTF-8)
    pub body: String,

    /// Body size in bytes as received
    pub size_bytes: u64,

    /// Time from request to last body byte
    pub response_time_ms: u64,

    pub render_mode: RenderMode,
}

impl FetchResult {
    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Looks up a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// A strategy for retrieving a page
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches a page with this strategy
    async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError>;

    /// Fetches a resource without rendering (robots.txt and similar)
    async fn fetch_plain(&self, url: &Url) -> Result<FetchResult, FetchError> {
        self.fetch(url).await
    }

    /// How pages fetched by `fetch` are produced
    fn render_mode(&self) -> RenderMode {
        RenderMode::Plain
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The `[http]` configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(LensError)` - A header, proxy or TLS setting was rejected
pub fn build_http_client(config: &HttpConfig) -> Result<Client, LensError> {
    let mut headers = HeaderMap::new();
    let accept_language = HeaderValue::from_str(&config.accept_language).map_err(|_| {
        ConfigError::Validation(format!(
            "invalid accept-language header value: {}",
            config.accept_language
        ))
    })?;
    headers.insert(ACCEPT_LANGUAGE, accept_language);

    for (name, value) in &config.custom_headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::Validation(format!("invalid header name: {}", name)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| ConfigError::Validation(format!("invalid value for header {}", name)))?;
        headers.insert(header_name, header_value);
    }

    let timeout = Duration::from_secs(config.timeout);
    let redirect = if config.follow_redirects {
        Policy::limited(MAX_REDIRECTS)
    } else {
        Policy::none()
    };

    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(redirect)
        .cookie_store(config.allow_cookies)
        .gzip(true)
        .brotli(true);

    if let Some(proxy_url) = &config.proxy_url {
        builder = builder.proxy(Proxy::all(proxy_url.as_str())?);
    }

    Ok(builder.build()?)
}

/// Maps a transport error onto the fetch error taxonomy
pub(crate) fn classify_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Connection(error.to_string())
    }
}

/// Collects response headers with lowercased names
pub(crate) fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

/// Reads a response body chunk by chunk, failing once it exceeds `limit`
pub(crate) async fn read_body_limited(
    response: &mut reqwest::Response,
    limit: u64,
) -> Result<Vec<u8>, FetchError> {
    if let Some(length) = response.content_length() {
        if length > limit {
            return Err(FetchError::TooLarge {
                size: length,
                limit,
            });
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(classify_error)? {
        let size = (body.len() + chunk.len()) as u64;
        if size > limit {
            return Err(FetchError::TooLarge { size, limit });
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

/// Plain HTTP GET fetch strategy
pub struct HttpFetcher {
    client: Client,
    max_file_size: u64,
}

impl HttpFetcher {
    /// Creates a fetcher from the crawl configuration
    pub fn new(config: &CrawlConfig) -> Result<Self, LensError> {
        Ok(Self {
            client: build_http_client(&config.http)?,
            max_file_size: config.crawler.max_file_size,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let started = Instant::now();
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = collect_headers(response.headers());
        let content_type = headers.get("content-type").cloned();

        let body = read_body_limited(&mut response, self.max_file_size).await?;
        let response_time_ms = started.elapsed().as_millis() as u64;

        tracing::debug!(
            "GET {} -> {} ({} bytes, {} ms)",
            url,
            status,
            body.len(),
            response_time_ms
        );

        Ok(FetchResult {
            final_url,
            status,
            headers,
            content_type,
            size_bytes: body.len() as u64,
            body: String::from_utf8_lossy(&body).into_owned(),
            response_time_ms,
            render_mode: RenderMode::Plain,
        })
    }
}
