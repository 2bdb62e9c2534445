//! # Search Client
//!
//! The caller-facing facade. Owns the HTTP transport (and with it the
//! connection pool shared across queries) and turns a [`ScrollSpec`] into an
//! open [`Scroll`] or a fully drained [`ResultSet`].

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::SearchConfig;
use crate::error::Result;
use crate::query;
use crate::scroll::{Scroll, ScrollParams};
use crate::transport::{HttpTransport, ScrollTransport};

/// What to scroll: a prebuilt query document, or a constraint mapping that
/// gets translated through [`query::filter_query`]. When both are set the
/// prebuilt document wins. Neither set scans the whole index.
#[derive(Debug, Clone, Default)]
pub struct ScrollSpec {
    /// Full query body, used verbatim when present.
    pub query: Option<Value>,
    /// Exact-match constraints, used only when `query` is absent.
    pub terms: Option<Map<String, Value>>,
    /// Page size override; falls back to the configured page size.
    pub size: Option<usize>,
    /// Early-termination hint forwarded to the backend; 0 scans everything.
    pub terminate_after: u64,
}

impl ScrollSpec {
    /// Scroll everything the query matches.
    pub fn with_query(query: Value) -> Self {
        Self {
            query: Some(query),
            ..Default::default()
        }
    }

    /// Scroll everything matching the given field constraints.
    pub fn matching(terms: Map<String, Value>) -> Self {
        Self {
            terms: Some(terms),
            ..Default::default()
        }
    }

    fn into_query(self) -> Value {
        match self.query {
            Some(query) => query,
            None => query::filter_query(&self.terms.unwrap_or_default()),
        }
    }
}

/// A drained scroll: every yielded page flattened in order.
#[derive(Debug)]
pub struct ResultSet {
    pub records: Vec<Value>,
    pub pages: usize,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Client for one search backend index.
#[derive(Clone)]
pub struct SearchClient {
    config: SearchConfig,
    transport: Arc<HttpTransport>,
}

impl SearchClient {
    /// Validate the configuration and build the HTTP transport.
    pub fn new(config: SearchConfig) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::new(&config));
        Ok(Self { config, transport })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Open a scroll for the spec. A failed initial search returns `Err`;
    /// it is never folded into an empty result set.
    pub async fn scroll(&self, spec: ScrollSpec) -> Result<Scroll> {
        let params = ScrollParams {
            size: spec.size.unwrap_or(self.config.page_size),
            terminate_after: spec.terminate_after,
            initial_ttl: self.config.initial_ttl.clone(),
            continue_ttl: self.config.continue_ttl.clone(),
        };
        let transport: Arc<dyn ScrollTransport> = self.transport.clone();
        Scroll::open(transport, spec.into_query(), params).await
    }

    /// Drain a scroll to exhaustion and return the flattened records.
    pub async fn scroll_all(&self, spec: ScrollSpec) -> Result<ResultSet> {
        let mut scroll = self.scroll(spec).await?;
        let mut records = Vec::new();
        let mut pages = 0;
        while let Some(page) = scroll.next_page().await? {
            pages += 1;
            records.extend(page);
        }
        Ok(ResultSet { records, pages })
    }

    /// Assign `updates` on every document matching the phrase constraints,
    /// through the backend's update-by-query endpoint.
    pub async fn update_by_query(
        &self,
        constraints: &Map<String, Value>,
        updates: &Map<String, Value>,
    ) -> Result<()> {
        let mut body = query::match_query(constraints);
        if let (Value::Object(map), Value::Object(script)) =
            (&mut body, query::inline_script(updates))
        {
            map.extend(script);
        }
        self.transport.update_by_query(&body).await
    }

    /// Delete every document matched by the prebuilt query.
    pub async fn delete_by_query(&self, query: &Value) -> Result<()> {
        self.transport.delete_by_query(query).await
    }

    /// Delete every document matching the phrase constraints.
    pub async fn delete_matching(&self, constraints: &Map<String, Value>) -> Result<()> {
        self.delete_by_query(&query::match_query(constraints)).await
    }
}
