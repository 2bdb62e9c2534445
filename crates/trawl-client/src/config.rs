//! # Client Configuration
//!
//! Explicit connection settings for the search backend. Everything the
//! client needs arrives through this struct; nothing is read from the
//! process environment.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Connection settings for an OpenSearch-compatible backend.
///
/// `base_url` and `index` must be supplied; every other field carries the
/// backend's conventional default.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Base URL of the search backend, e.g. `http://localhost:9200`.
    /// A trailing slash is tolerated and stripped.
    pub base_url: String,

    /// Index to search.
    pub index: String,

    /// Document type segment of the search path.
    #[serde(default = "default_record_type")]
    pub record_type: String,

    /// Results per scroll page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Scroll context ttl requested by the initial search.
    #[serde(default = "default_initial_ttl")]
    pub initial_ttl: String,

    /// Scroll context ttl requested by continuation fetches.
    #[serde(default = "default_continue_ttl")]
    pub continue_ttl: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            index: String::new(),
            record_type: default_record_type(),
            page_size: default_page_size(),
            initial_ttl: default_initial_ttl(),
            continue_ttl: default_continue_ttl(),
        }
    }
}

impl SearchConfig {
    /// Reject configurations the client cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("base_url must not be empty".into()));
        }
        if self.index.trim().is_empty() {
            return Err(Error::Config("index must not be empty".into()));
        }
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be at least 1".into()));
        }
        Ok(())
    }
}

fn default_record_type() -> String {
    "granule".into()
}
pub(crate) fn default_page_size() -> usize {
    10_000
}
pub(crate) fn default_initial_ttl() -> String {
    "5m".into()
}
pub(crate) fn default_continue_ttl() -> String {
    "10m".into()
}
