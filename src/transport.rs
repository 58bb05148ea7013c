//! One HTTP GET against the upstream API, bounded by a deadline and classified into
//! [`FetchError`] before the body is parsed.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, redirect, Client};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::FetchError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(6000);
const MAX_REDIRECTS: usize = 10;
const CROSS_ORIGIN: &str = "redirect crossed origins";

/// Seam between the request facade and the network, so the facade can be driven by a
/// scripted transport in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `endpoint` (path plus query, relative to the API base) and return the parsed body.
    async fn perform(&self, endpoint: &str) -> std::result::Result<Value, FetchError>;
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        // No cookie store is configured, so no credentials ever leave the client.
        let client = Client::builder()
            .user_agent(concat!("maxmovies/", env!("CARGO_PKG_VERSION")))
            .redirect(same_origin_redirects())
            .build()
            .context("building HTTP client")?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), timeout })
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn fetch(&self, url: &str) -> std::result::Result<Value, FetchError> {
        let resp = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(classify_request_error)?;
        check_status(resp.status().as_u16())?;
        let body = resp.bytes().await.map_err(classify_request_error)?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn perform(&self, endpoint: &str) -> std::result::Result<Value, FetchError> {
        let url = self.url(endpoint);
        debug!(%url, "GET");
        // The deadline future is dropped together with the request when the request wins.
        match tokio::time::timeout(self.timeout, self.fetch(&url)).await {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(e)) => {
                warn!(%url, error = %e, "request failed");
                Err(e)
            }
            Err(_) => {
                let ms = self.timeout.as_millis() as u64;
                warn!(%url, timeout_ms = ms, "request timed out");
                Err(FetchError::Timeout(ms))
            }
        }
    }
}

/// Follow redirects only while they stay on the origin of the original request. A
/// cross-origin hop surfaces as a redirect error, which is classified as `Blocked`.
fn same_origin_redirects() -> redirect::Policy {
    redirect::Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        let crossed = attempt
            .previous()
            .first()
            .is_some_and(|first| first.origin() != attempt.url().origin());
        if crossed { attempt.error(CROSS_ORIGIN) } else { attempt.follow() }
    })
}

/// Status gate applied before any body parsing.
pub fn check_status(status: u16) -> std::result::Result<(), FetchError> {
    match status {
        0 => Err(FetchError::Blocked("response carried no status".into())),
        200..=299 => Ok(()),
        s => Err(FetchError::Http(s)),
    }
}

fn classify_request_error(e: reqwest::Error) -> FetchError {
    if e.is_redirect() {
        FetchError::Blocked(e.to_string())
    } else if e.is_timeout() {
        FetchError::Timeout(0)
    } else if e.is_decode() {
        FetchError::Network(format!("reading body: {e}"))
    } else {
        FetchError::Network(e.to_string())
    }
}
