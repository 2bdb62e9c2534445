//! # Error Taxonomy
//!
//! One enum for every way a query can go wrong. Open and continuation
//! failures are terminal to the query that hit them; release failures are
//! absorbed by the transport and never show up here.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The search backend answered with a non-success HTTP status.
    /// The response body is carried verbatim for diagnostics.
    #[error("search backend returned status {status}: {body}")]
    Backend { status: u16, body: String },

    /// The response did not carry the expected `_scroll_id` / `hits.hits`
    /// structure. Same severity as a backend failure.
    #[error("malformed search response: {context}")]
    MalformedResponse { context: String },

    /// The HTTP exchange itself failed (connect, timeout, body read).
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Client configuration rejected at construction time.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn malformed(context: impl Into<String>) -> Self {
        Error::MalformedResponse {
            context: context.into(),
        }
    }
}
