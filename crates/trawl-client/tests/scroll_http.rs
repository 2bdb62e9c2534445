//! Scroll protocol end to end: the real HTTP transport driven against an
//! in-process fake backend that scripts its pages and records every call.

use std::collections::VecDeque;
use std::future::IntoFuture;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use trawl_client::{Error, ScrollSpec, SearchClient, SearchConfig};

/// One captured initial-search call.
struct SearchCall {
    scroll: String,
    terminate_after: u64,
    size: usize,
    body: Value,
}

/// Scripted backend: `pages` answers the search and then each continuation
/// in order; a `None` entry answers with a 500. Every request is recorded.
#[derive(Default)]
struct Backend {
    pages: Mutex<VecDeque<Option<Vec<Value>>>>,
    searches: Mutex<Vec<SearchCall>>,
    continuations: Mutex<Vec<Value>>,
    releases: Mutex<Vec<Value>>,
    by_query: Mutex<Vec<(String, Value)>>,
    issued: Mutex<u32>,
}

impl Backend {
    fn serve_page(&self) -> Result<Json<Value>, StatusCode> {
        match self.pages.lock().unwrap().pop_front() {
            Some(Some(hits)) => {
                let mut issued = self.issued.lock().unwrap();
                let id = format!("cursor-{}", *issued);
                *issued += 1;
                Ok(Json(json!({
                    "_scroll_id": id,
                    "hits": { "total": { "value": hits.len() }, "hits": hits }
                })))
            }
            _ => Err(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    fn released_ids(&self) -> Vec<Value> {
        self.releases
            .lock()
            .unwrap()
            .iter()
            .map(|body| body["scroll_id"].clone())
            .collect()
    }
}

#[derive(Deserialize)]
struct SearchParams {
    scroll: String,
    terminate_after: u64,
    size: usize,
}

async fn search(
    State(backend): State<Arc<Backend>>,
    Query(params): Query<SearchParams>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    backend.searches.lock().unwrap().push(SearchCall {
        scroll: params.scroll,
        terminate_after: params.terminate_after,
        size: params.size,
        body,
    });
    backend.serve_page()
}

async fn continue_scroll(
    State(backend): State<Arc<Backend>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    backend.continuations.lock().unwrap().push(body);
    backend.serve_page()
}

async fn release_scroll(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> Json<Value> {
    backend.releases.lock().unwrap().push(body);
    Json(json!({ "succeeded": true, "num_freed": 1 }))
}

async fn update_by_query(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> Json<Value> {
    backend
        .by_query
        .lock()
        .unwrap()
        .push(("update".to_string(), body));
    Json(json!({ "updated": 1 }))
}

async fn delete_by_query(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> Json<Value> {
    backend
        .by_query
        .lock()
        .unwrap()
        .push(("delete".to_string(), body));
    Json(json!({ "deleted": 1 }))
}

/// Bind the fake backend on an ephemeral port and build a client for it,
/// with a page size of 3 so small scripts span several pages.
async fn start(pages: Vec<Option<Vec<Value>>>) -> (Arc<Backend>, SearchClient) {
    let backend = Arc::new(Backend {
        pages: Mutex::new(pages.into()),
        ..Default::default()
    });
    let app = Router::new()
        .route("/cumulus/granule/_search", post(search))
        .route("/cumulus/granule/_search/_update_by_query", post(update_by_query))
        .route("/cumulus/granule/_search/_delete_by_query", post(delete_by_query))
        .route("/_search/scroll", post(continue_scroll).delete(release_scroll))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(axum::serve(listener, app).into_future());

    let client = SearchClient::new(SearchConfig {
        base_url: format!("http://{addr}"),
        index: "cumulus".into(),
        page_size: 3,
        ..Default::default()
    })
    .unwrap();
    (backend, client)
}

fn granules(ids: std::ops::Range<usize>) -> Vec<Value> {
    ids.map(|i| json!({ "_id": format!("g{i}"), "_source": { "status": "completed" } }))
        .collect()
}

fn term_constraints(field: &str, value: Value) -> Map<String, Value> {
    let mut constraints = Map::new();
    constraints.insert(field.to_string(), value);
    constraints
}

#[tokio::test]
async fn test_scroll_drains_all_pages_and_clears_cursor() {
    let (backend, client) = start(vec![
        Some(granules(0..3)),
        Some(granules(3..5)),
        Some(Vec::new()),
    ])
    .await;

    let results = client
        .scroll_all(ScrollSpec::matching(term_constraints(
            "status",
            json!("completed"),
        )))
        .await
        .unwrap();

    assert_eq!(results.len(), 5);
    assert_eq!(results.pages, 2);
    assert_eq!(results.records[0]["_id"], json!("g0"));
    assert_eq!(results.records[4]["_id"], json!("g4"));

    let searches = backend.searches.lock().unwrap();
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0].scroll, "5m");
    assert_eq!(searches[0].terminate_after, 0);
    assert_eq!(searches[0].size, 3);
    assert_eq!(
        searches[0].body,
        json!({ "query": { "bool": { "must": [
            { "term": { "status.keyword": "completed" } }
        ] } } })
    );

    // Each continuation carries the latest reissued cursor id and the
    // continuation ttl.
    let continuations = backend.continuations.lock().unwrap();
    assert_eq!(continuations.len(), 2);
    assert_eq!(
        continuations[0],
        json!({ "scroll": "10m", "scroll_id": "cursor-0" })
    );
    assert_eq!(
        continuations[1],
        json!({ "scroll": "10m", "scroll_id": "cursor-1" })
    );

    // Released exactly once, with the id issued alongside the empty page.
    assert_eq!(backend.released_ids(), vec![json!(["cursor-2"])]);
}

#[tokio::test]
async fn test_immediately_empty_result_set_still_releases() {
    let (backend, client) = start(vec![Some(Vec::new())]).await;

    let results = client.scroll_all(ScrollSpec::default()).await.unwrap();

    assert!(results.is_empty());
    assert_eq!(results.pages, 0);
    assert!(backend.continuations.lock().unwrap().is_empty());
    assert_eq!(backend.released_ids(), vec![json!(["cursor-0"])]);
}

#[tokio::test]
async fn test_overrides_reach_the_search_request() {
    let (backend, client) = start(vec![Some(Vec::new())]).await;

    let spec = ScrollSpec {
        size: Some(500),
        terminate_after: 100,
        ..Default::default()
    };
    client.scroll_all(spec).await.unwrap();

    let searches = backend.searches.lock().unwrap();
    assert_eq!(searches[0].size, 500);
    assert_eq!(searches[0].terminate_after, 100);
}

#[tokio::test]
async fn test_prebuilt_query_sent_verbatim() {
    let (backend, client) = start(vec![Some(Vec::new())]).await;

    let prebuilt = json!({ "query": { "match": { "status": "running" } } });
    let spec = ScrollSpec {
        query: Some(prebuilt.clone()),
        terms: Some(term_constraints("status", json!("ignored"))),
        ..Default::default()
    };
    client.scroll_all(spec).await.unwrap();

    assert_eq!(backend.searches.lock().unwrap()[0].body, prebuilt);
}

#[tokio::test]
async fn test_mid_stream_failure_keeps_yielded_pages() {
    let (backend, client) = start(vec![Some(granules(0..4)), None]).await;

    let mut scroll = client.scroll(ScrollSpec::default()).await.unwrap();
    let mut drained = Vec::new();
    let err = loop {
        match scroll.next_page().await {
            Ok(Some(page)) => drained.extend(page),
            Ok(None) => panic!("scroll ended without surfacing the failure"),
            Err(e) => break e,
        }
    };

    assert_eq!(drained.len(), 4);
    assert!(matches!(err, Error::Backend { status: 500, .. }));
    assert_eq!(backend.released_ids(), vec![json!(["cursor-0"])]);
}

#[tokio::test]
async fn test_failed_open_is_an_error_not_an_empty_result() {
    let (backend, client) = start(vec![None]).await;

    let err = client.scroll_all(ScrollSpec::default()).await.unwrap_err();

    assert!(matches!(err, Error::Backend { status: 500, .. }));
    // No cursor was ever issued, so nothing gets released.
    assert!(backend.released_ids().is_empty());
}

#[tokio::test]
async fn test_abandoned_scroll_released_on_drop() {
    let (backend, client) = start(vec![Some(granules(0..3)), Some(granules(3..6))]).await;

    let mut scroll = client.scroll(ScrollSpec::default()).await.unwrap();
    assert!(scroll.next_page().await.unwrap().is_some());
    drop(scroll);

    for _ in 0..100 {
        if !backend.released_ids().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(backend.released_ids(), vec![json!(["cursor-0"])]);
}

#[tokio::test]
async fn test_update_by_query_merges_script_into_query() {
    let (backend, client) = start(Vec::new()).await;

    client
        .update_by_query(
            &term_constraints("granuleId", json!("G1")),
            &term_constraints("status", json!("queued")),
        )
        .await
        .unwrap();

    let by_query = backend.by_query.lock().unwrap();
    assert_eq!(by_query.len(), 1);
    let (op, body) = &by_query[0];
    assert_eq!(op, "update");
    assert_eq!(
        body["query"]["bool"]["must"][0]["match_phrase"]["granuleId"],
        json!("G1")
    );
    assert_eq!(
        body["script"]["inline"],
        json!("ctx._source.status=params.status")
    );
    assert_eq!(body["script"]["params"]["status"], json!("queued"));
}

#[tokio::test]
async fn test_delete_matching_posts_match_query() {
    let (backend, client) = start(Vec::new()).await;

    client
        .delete_matching(&term_constraints("collectionId", json!("MOD09___006")))
        .await
        .unwrap();

    let by_query = backend.by_query.lock().unwrap();
    assert_eq!(by_query.len(), 1);
    let (op, body) = &by_query[0];
    assert_eq!(op, "delete");
    assert_eq!(
        body["query"]["bool"]["must"][0]["match_phrase"]["collectionId"],
        json!("MOD09___006")
    );
}
