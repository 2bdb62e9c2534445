//! # Scroll — Lazy Page Sequence
//!
//! Pull-based iteration over one server-side scroll context. Each call to
//! [`Scroll::next_page`] performs at most one network fetch, continuing from
//! the cursor id returned by the previous response (the backend may reissue
//! a new id on every page).
//!
//! The server-side context is released exactly once, on the first exit path
//! taken: exhaustion (first empty page), a failed fetch, an explicit
//! [`Scroll::finish`], or drop of an unfinished scroll. The drop path spawns
//! a best-effort release task; when no runtime is available the server-side
//! ttl is the cleanup backstop.

use std::sync::Arc;

use serde_json::Value;

use crate::config;
use crate::error::Result;
use crate::transport::ScrollTransport;

/// One page of raw hit documents.
pub type Page = Vec<Value>;

/// Parameters of one scroll session.
#[derive(Debug, Clone)]
pub struct ScrollParams {
    /// Results per page.
    pub size: usize,
    /// Backend early-termination hint, forwarded verbatim; 0 scans
    /// everything. Never alters the pagination loop itself.
    pub terminate_after: u64,
    /// Scroll context ttl requested by the initial search.
    pub initial_ttl: String,
    /// Scroll context ttl requested by continuation fetches.
    pub continue_ttl: String,
}

impl Default for ScrollParams {
    fn default() -> Self {
        Self {
            size: config::default_page_size(),
            terminate_after: 0,
            initial_ttl: config::default_initial_ttl(),
            continue_ttl: config::default_continue_ttl(),
        }
    }
}

/// An open scroll over one query's result set.
///
/// Pages already yielded stay yielded when a later fetch fails, and callers
/// can tell normal exhaustion (`Ok(None)`) from error termination (`Err`).
pub struct Scroll {
    transport: Arc<dyn ScrollTransport>,
    /// Latest cursor id; `None` once the context has been released.
    scroll_id: Option<String>,
    /// First page, buffered by `open` until the first `next_page` call.
    first: Option<Page>,
    continue_ttl: String,
    done: bool,
    pages: usize,
    records: usize,
}

impl Scroll {
    /// Issue the initial search and wrap the returned cursor.
    ///
    /// A failed open propagates as `Err`: there is no cursor to release at
    /// that point, and callers must not mistake the failure for an empty
    /// result set.
    pub async fn open(
        transport: Arc<dyn ScrollTransport>,
        query: Value,
        params: ScrollParams,
    ) -> Result<Self> {
        let page = transport
            .open(&query, params.size, params.terminate_after, &params.initial_ttl)
            .await?;
        Ok(Self {
            transport,
            scroll_id: Some(page.scroll_id),
            first: Some(page.hits),
            continue_ttl: params.continue_ttl,
            done: false,
            pages: 0,
            records: 0,
        })
    }

    /// Yield the next non-empty page, or `Ok(None)` once the result set is
    /// exhausted. The first empty page ends iteration and releases the
    /// cursor; so does a failed fetch, after which the error is returned.
    /// Calling again after either outcome keeps returning `Ok(None)`.
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        if self.done {
            return Ok(None);
        }

        let hits = match self.first.take() {
            Some(hits) => hits,
            None => match self.scroll_id.clone() {
                None => {
                    self.done = true;
                    return Ok(None);
                }
                Some(id) => match self.transport.fetch_next(&id, &self.continue_ttl).await {
                    Ok(page) => {
                        // Always continue from the latest id.
                        self.scroll_id = Some(page.scroll_id);
                        page.hits
                    }
                    Err(e) => {
                        self.done = true;
                        self.release_now().await;
                        return Err(e);
                    }
                },
            },
        };

        if hits.is_empty() {
            self.done = true;
            self.release_now().await;
            tracing::debug!(
                "scroll exhausted after {} pages, {} records",
                self.pages,
                self.records
            );
            return Ok(None);
        }

        self.pages += 1;
        self.records += hits.len();
        Ok(Some(hits))
    }

    /// Stop iterating and release the cursor immediately. Returns whether
    /// the server acknowledged the release (`true` when there was nothing
    /// left to release).
    pub async fn finish(mut self) -> bool {
        self.done = true;
        match self.scroll_id.take() {
            Some(id) => self.transport.release(&id).await,
            None => true,
        }
    }

    /// Adapt the pull loop into a stream of pages. Dropping the stream
    /// before exhaustion releases the cursor through the drop path.
    pub fn into_stream(self) -> impl futures::Stream<Item = Result<Page>> {
        futures::stream::try_unfold(self, |mut scroll| async move {
            Ok(scroll.next_page().await?.map(|page| (page, scroll)))
        })
    }

    async fn release_now(&mut self) {
        if let Some(id) = self.scroll_id.take() {
            self.transport.release(&id).await;
        }
    }
}

impl Drop for Scroll {
    fn drop(&mut self) {
        if let Some(id) = self.scroll_id.take() {
            let transport = Arc::clone(&self.transport);
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        transport.release(&id).await;
                    });
                }
                Err(_) => {
                    tracing::warn!(
                        "scroll {} abandoned outside a runtime; relying on ttl expiry",
                        id
                    );
                }
            }
        }
    }
}
