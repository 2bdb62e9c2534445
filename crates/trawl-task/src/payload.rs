//! # Task Payload
//!
//! The JSON document a task invocation carries: `{"config": {...}}`. Search
//! parameters may sit directly in `config` or one level down in
//! `config.opensearch_config`; the nested block, when present, replaces the
//! outer fields for everything except `workflow_name`, which is always read
//! from the outer level.

use serde::Deserialize;
use serde_json::{Map, Value};

use trawl_client::ScrollSpec;

/// Top-level task payload.
#[derive(Debug, Deserialize)]
pub struct TaskPayload {
    pub config: TaskConfig,
}

/// The `config` block of a payload.
#[derive(Debug, Deserialize)]
pub struct TaskConfig {
    /// Nested search parameters from a workflow invocation.
    pub opensearch_config: Option<SearchParams>,

    /// Search parameters given directly on the config, used when no
    /// nested block is present.
    #[serde(flatten)]
    pub search: SearchParams,

    /// Selects the output consumer; always the outer config's value.
    pub workflow_name: Option<String>,
}

/// The search parameters a payload can carry.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    /// Document type segment of the search path.
    pub record_type: Option<String>,

    /// Early-termination hint; 0 scans everything.
    #[serde(default)]
    pub terminate_after: u64,

    /// Prebuilt query document, used verbatim when present.
    pub query: Option<Value>,

    /// Field constraints, used only when `query` is absent.
    pub query_terms: Option<Map<String, Value>>,
}

impl TaskConfig {
    /// The effective search parameters.
    pub fn search_params(&self) -> &SearchParams {
        self.opensearch_config.as_ref().unwrap_or(&self.search)
    }

    /// Build the scroll spec these parameters describe.
    pub fn scroll_spec(&self) -> ScrollSpec {
        let params = self.search_params();
        ScrollSpec {
            query: params.query.clone(),
            terms: params.query_terms.clone(),
            terminate_after: params.terminate_after,
            ..Default::default()
        }
    }
}
