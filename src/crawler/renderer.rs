//! Headless-browser render service fetch strategy
//!
//! Pages are rendered by an external service that accepts a JSON render
//! request and answers with the serialized DOM. At most
//! `max-concurrent-pages` renders are outstanding at once; robots.txt and
//! other plain resources bypass the service through the inner fetcher.

use crate::config::{CrawlConfig, JavascriptConfig};
use crate::crawler::fetcher::{
    classify_error, collect_headers, read_body_limited, FetchResult, Fetcher, HttpFetcher,
};
use crate::state::RenderMode;
use crate::{ConfigError, FetchError, LensError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use url::Url;

/// Header carrying the status the rendered page was served with
const STATUS_HEADER: &str = "x-response-code";

/// Header carrying the page URL after in-browser redirects
const FINAL_URL_HEADER: &str = "x-final-url";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderRequest<'a> {
    url: &'a str,
    wait_for_timeout: u64,
    viewport: Viewport,
    goto_options: GotoOptions,
    user_agent: &'a str,
}

#[derive(Debug, Serialize)]
struct Viewport {
    width: u32,
    height: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GotoOptions {
    wait_until: &'static str,
    timeout: u64,
}

/// Resolves the `content` endpoint below the configured service URL
fn render_endpoint(service_url: &str) -> Result<Url, ConfigError> {
    let invalid = |e: url::ParseError| ConfigError::InvalidUrl(format!("{}: {}", service_url, e));
    let mut base = Url::parse(service_url).map_err(invalid)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("content").map_err(invalid)
}

/// Fetch strategy backed by the render service
pub struct RenderServiceFetcher {
    client: Client,
    endpoint: Url,
    settings: JavascriptConfig,
    slots: Semaphore,
    max_file_size: u64,
    plain: HttpFetcher,
}

impl RenderServiceFetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self, LensError> {
        let settings = config.javascript.clone();
        let endpoint = render_endpoint(&settings.service_url)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            slots: Semaphore::new(settings.max_concurrent_pages.max(1)),
            settings,
            max_file_size: config.crawler.max_file_size,
            plain: HttpFetcher::new(config)?,
        })
    }

    /// Renders `url`; the caller holds a render slot
    async fn render(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let started = Instant::now();
        let request = RenderRequest {
            url: url.as_str(),
            wait_for_timeout: self.settings.wait_time,
            viewport: Viewport {
                width: self.settings.viewport_width,
                height: self.settings.viewport_height,
            },
            goto_options: GotoOptions {
                wait_until: "domcontentloaded",
                timeout: self.settings.timeout * 1000,
            },
            user_agent: &self.settings.user_agent,
        };

        let mut response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(classify_error)?;

        if !response.status().is_success() {
            return Err(FetchError::Render(format!(
                "render service returned {} for {}",
                response.status(),
                url
            )));
        }

        let headers = collect_headers(response.headers());
        let status = headers
            .get(STATUS_HEADER)
            .and_then(|value| value.trim().parse::<u16>().ok())
            .unwrap_or(200);
        let final_url = headers
            .get(FINAL_URL_HEADER)
            .and_then(|value| Url::parse(value).ok())
            .unwrap_or_else(|| url.clone());

        let body = read_body_limited(&mut response, self.max_file_size).await?;
        let response_time_ms = started.elapsed().as_millis() as u64;

        tracing::debug!(
            "Rendered {} -> {} ({} bytes, {} ms)",
            url,
            status,
            body.len(),
            response_time_ms
        );

        Ok(FetchResult {
            final_url,
            status,
            headers,
            content_type: Some("text/html".to_string()),
            size_bytes: body.len() as u64,
            body: String::from_utf8_lossy(&body).into_owned(),
            response_time_ms,
            render_mode: RenderMode::Rendered,
        })
    }
}

#[async_trait]
impl Fetcher for RenderServiceFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let _slot = self
            .slots
            .acquire()
            .await
            .map_err(|_| FetchError::Render("render slots closed".to_string()))?;

        // The slot wait is not part of the render timeout
        let limit = Duration::from_secs(self.settings.timeout);
        match tokio::time::timeout(limit, self.render(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        }
    }

    async fn fetch_plain(&self, url: &Url) -> Result<FetchResult, FetchError> {
        self.plain.fetch(url).await
    }

    fn render_mode(&self) -> RenderMode {
        RenderMode::Rendered
    }
}
