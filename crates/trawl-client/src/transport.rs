//! # Scroll Transport
//!
//! The wire side of the scroll protocol. [`ScrollTransport`] is the seam the
//! engine drives; [`HttpTransport`] is the real implementation speaking the
//! OpenSearch-compatible HTTP API.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::SearchConfig;
use crate::error::{Error, Result};

/// One page of scroll results: the cursor id to continue from, and the raw
/// hit documents of this fetch. An empty `hits` signals exhaustion.
#[derive(Debug, Clone)]
pub struct ScrollPage {
    pub scroll_id: String,
    pub hits: Vec<Value>,
}

/// The three scroll protocol operations.
///
/// `open` and `fetch_next` fail loudly; `release` is best effort and only
/// reports whether the server acknowledged it. The cursor id returned by
/// each call may differ from the one passed in, so callers must always
/// continue from the latest.
#[async_trait]
pub trait ScrollTransport: Send + Sync {
    /// Issue the initial search with scrolling enabled. Returns the first
    /// page (possibly empty) and the cursor id.
    async fn open(
        &self,
        query: &Value,
        size: usize,
        terminate_after: u64,
        ttl: &str,
    ) -> Result<ScrollPage>;

    /// Fetch the next page for an open cursor.
    async fn fetch_next(&self, scroll_id: &str, ttl: &str) -> Result<ScrollPage>;

    /// Release the server-side scroll context. Never fails the caller:
    /// the server expires abandoned contexts after their ttl anyway.
    async fn release(&self, scroll_id: &str) -> bool;
}

/// HTTP implementation of the scroll protocol plus the one-shot
/// by-query operations.
pub struct HttpTransport {
    http: reqwest::Client,
    /// `{base}/{index}/{record_type}/_search`
    search_url: String,
    /// `{base}/_search/scroll`
    scroll_url: String,
}

impl HttpTransport {
    pub fn new(config: &SearchConfig) -> Self {
        let base = config.base_url.trim_end_matches('/');
        Self {
            http: reqwest::Client::new(),
            search_url: format!(
                "{}/{}/{}/_search",
                base, config.index, config.record_type
            ),
            scroll_url: format!("{}/_search/scroll", base),
        }
    }

    pub fn search_url(&self) -> &str {
        &self.search_url
    }

    /// POST `{search_url}/_update_by_query` with a prebuilt body.
    pub async fn update_by_query(&self, body: &Value) -> Result<()> {
        let url = format!("{}/_update_by_query", self.search_url);
        let response = self.http.post(&url).json(body).send().await?;
        check_status(response).await
    }

    /// POST `{search_url}/_delete_by_query` with a prebuilt body.
    pub async fn delete_by_query(&self, body: &Value) -> Result<()> {
        let url = format!("{}/_delete_by_query", self.search_url);
        let response = self.http.post(&url).json(body).send().await?;
        check_status(response).await
    }
}

#[async_trait]
impl ScrollTransport for HttpTransport {
    async fn open(
        &self,
        query: &Value,
        size: usize,
        terminate_after: u64,
        ttl: &str,
    ) -> Result<ScrollPage> {
        let url = format!(
            "{}?scroll={}&terminate_after={}&size={}",
            self.search_url, ttl, terminate_after, size
        );
        tracing::info!("search query: {}", query);
        tracing::info!("search url: {}", url);
        let response = self.http.post(&url).json(query).send().await?;
        read_scroll_page(response).await
    }

    async fn fetch_next(&self, scroll_id: &str, ttl: &str) -> Result<ScrollPage> {
        let body = serde_json::json!({ "scroll": ttl, "scroll_id": scroll_id });
        let response = self.http.post(&self.scroll_url).json(&body).send().await?;
        read_scroll_page(response).await
    }

    async fn release(&self, scroll_id: &str) -> bool {
        let body = serde_json::json!({ "scroll_id": [scroll_id] });
        match self.http.delete(&self.scroll_url).json(&body).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(
                    "failed to clear scroll {}: status {}",
                    scroll_id,
                    response.status()
                );
                false
            }
            Err(e) => {
                tracing::warn!("failed to clear scroll {}: {}", scroll_id, e);
                false
            }
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Backend {
            status: status.as_u16(),
            body,
        });
    }
    Ok(())
}

async fn read_scroll_page(response: reqwest::Response) -> Result<ScrollPage> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(Error::Backend {
            status: status.as_u16(),
            body,
        });
    }
    parse_scroll_page(&body)
}

fn parse_scroll_page(body: &str) -> Result<ScrollPage> {
    let doc: Value = serde_json::from_str(body)
        .map_err(|e| Error::malformed(format!("response body is not JSON: {e}")))?;
    let scroll_id = doc
        .get("_scroll_id")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::malformed("response lacks _scroll_id"))?
        .to_string();
    let hits = doc
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| Error::malformed("response lacks hits.hits"))?;
    Ok(ScrollPage { scroll_id, hits })
}
