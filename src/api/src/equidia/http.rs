//! HTTP access to the API with the browser header set it expects.

use anyhow::{Context, Result};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_TYPE,
    ORIGIN, PRAGMA, REFERER,
};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/117.0";

/// Why a single request produced no payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid response body: {0}")]
    InvalidBody(String),
}

impl FetchFailure {
    /// HTTP status code, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchFailure::Status(code) => Some(*code),
            _ => None,
        }
    }
}

/// Source of JSON documents addressed by URL
#[allow(async_fn_in_trait)]
pub trait JsonSource {
    /// GET `url`; anything but 200 with a JSON body is a failure
    async fn get_json(&self, url: &str) -> Result<Value, FetchFailure>;
}

/// reqwest-backed client for the equidia.fr API
pub struct EquidiaClient {
    client: reqwest::Client,
}

impl EquidiaClient {
    /// Build a client with the default header set and request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(default_headers())
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("de,en-US;q=0.7,en;q=0.3"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://www.equidia.fr"));
    headers.insert(REFERER, HeaderValue::from_static("https://www.equidia.fr/"));
    headers.insert(HeaderName::from_static("dnt"), HeaderValue::from_static("1"));
    headers.insert(HeaderName::from_static("sec-fetch-dest"), HeaderValue::from_static("empty"));
    headers.insert(HeaderName::from_static("sec-fetch-mode"), HeaderValue::from_static("cors"));
    headers.insert(HeaderName::from_static("sec-fetch-site"), HeaderValue::from_static("same-site"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    // Accept-Encoding is left to reqwest so it can decompress the body
    headers
}

impl JsonSource for EquidiaClient {
    async fn get_json(&self, url: &str) -> Result<Value, FetchFailure> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchFailure::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchFailure::InvalidBody(e.to_string()))
    }
}
