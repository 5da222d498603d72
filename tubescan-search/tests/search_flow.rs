//! End-to-end flows over a scripted transport: first-page search,
//! continuation chains, budget stops, descriptor resume, and the
//! filters-only path.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tubescan_search::{
    ContinuationDescriptor, SearchClient, SearchError, SearchOptions, Transport,
    TransportOptions,
};

/// Hands back scripted bodies in order, regardless of method, and keeps
/// a log of what was requested.
struct ScriptedTransport {
    bodies: Mutex<VecDeque<String>>,
    gets: Mutex<Vec<String>>,
    posts: Mutex<Vec<(String, Value)>>,
}

impl ScriptedTransport {
    fn new(bodies: Vec<String>) -> Self {
        Self {
            bodies: Mutex::new(bodies.into()),
            gets: Mutex::new(Vec::new()),
            posts: Mutex::new(Vec::new()),
        }
    }

    fn next_body(&self) -> Result<String, SearchError> {
        self.bodies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| SearchError::Upstream("script exhausted".to_string()))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str, _opts: &TransportOptions) -> Result<String, SearchError> {
        self.gets.lock().unwrap().push(url.to_string());
        self.next_body()
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        _opts: &TransportOptions,
    ) -> Result<String, SearchError> {
        self.posts
            .lock()
            .unwrap()
            .push((url.to_string(), body.clone()));
        self.next_body()
    }
}

fn video(id: &str) -> Value {
    json!({"videoRenderer": {"videoId": id}})
}

fn marker(token: &str) -> Value {
    json!({"continuationItemRenderer": {
        "continuationEndpoint": {"continuationCommand": {"token": token}}
    }})
}

fn sectioned_document(items: Vec<Value>, token: Option<&str>) -> Value {
    let mut contents = vec![json!({"itemSectionRenderer": {"contents": items}})];
    if let Some(token) = token {
        contents.push(marker(token));
    }
    json!({
        "estimatedResults": "12345",
        "refinements": ["funny cats", "cats compilation"],
        "contents": {"twoColumnSearchResultsRenderer": {"primaryContents": {
            "sectionListRenderer": {"contents": contents}
        }}}
    })
}

fn page_body(document: &Value) -> String {
    format!(
        "<html><script>var ytInitialData = {document};</script>\
         \"INNERTUBE_API_KEY\":\"test-key\",\
         \"INNERTUBE_CONTEXT_CLIENT_VERSION\":\"2.20240620.01.00\"</html>"
    )
}

fn continuation_body(items: Vec<Value>, token: Option<&str>) -> String {
    let mut entries = vec![json!({"itemSectionRenderer": {"contents": items}})];
    if let Some(token) = token {
        entries.push(marker(token));
    }
    json!({
        "onResponseReceivedCommands": [{
            "appendContinuationItemsAction": {"continuationItems": entries}
        }]
    })
    .to_string()
}

fn ids(items: &[Value]) -> Vec<&str> {
    items
        .iter()
        .filter_map(|item| item["raw"]["videoId"].as_str())
        .collect()
}

#[tokio::test]
async fn item_limit_truncates_and_withholds_descriptor() {
    let document = sectioned_document(
        (0..8).map(|i| video(&format!("v{i}"))).collect(),
        Some("tok-next"),
    );
    let transport = ScriptedTransport::new(vec![page_body(&document)]);
    let client = SearchClient::with_transport(transport);

    let options = SearchOptions {
        limit: Some(5),
        ..SearchOptions::default()
    };
    let results = client.search("cats", &options).await.unwrap();

    assert_eq!(ids(&results.items), ["v0", "v1", "v2", "v3", "v4"]);
    assert_eq!(results.original_query, "cats");
    assert_eq!(results.results, 12345);
    assert_eq!(results.refinements.len(), 2);
    // Item-limited chains never hand out a resumable descriptor.
    assert!(results.continuation.is_none());
}

#[tokio::test]
async fn item_budget_spans_continuation_pages() {
    let first = sectioned_document(vec![video("a"), video("b")], Some("tok-1"));
    let transport = Arc::new(ScriptedTransport::new(vec![
        page_body(&first),
        continuation_body(vec![video("c"), video("d")], Some("tok-2")),
        continuation_body(vec![video("e"), video("f")], Some("tok-3")),
    ]));
    let client = SearchClient::with_transport(transport.clone());

    let options = SearchOptions {
        limit: Some(5),
        ..SearchOptions::default()
    };
    let results = client.search("cats", &options).await.unwrap();

    assert_eq!(ids(&results.items), ["a", "b", "c", "d", "e"]);
    assert!(results.continuation.is_none());
    // The second continuation page filled the budget; tok-3 stays unused.
    assert_eq!(transport.posts.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn page_budget_stops_and_emits_descriptor() {
    let first = sectioned_document(vec![video("a"), video("b")], Some("tok-1"));
    let transport = Arc::new(ScriptedTransport::new(vec![page_body(&first)]));
    let client = SearchClient::with_transport(transport.clone());

    let options = SearchOptions {
        pages: Some(1),
        ..SearchOptions::default()
    };
    let results = client.search("cats", &options).await.unwrap();

    assert_eq!(ids(&results.items), ["a", "b"]);
    assert_eq!(transport.posts.lock().unwrap().len(), 0);
    let descriptor = results.continuation.expect("descriptor");
    assert_eq!(descriptor.api_key, "test-key");
    assert_eq!(descriptor.token, "tok-1");
    assert_eq!(descriptor.context.client.client_version, "2.20240620.01.00");
    assert!(descriptor.options.budget.items.is_none());
}

#[tokio::test]
async fn resume_fetches_one_page_and_chains() {
    let first = sectioned_document(vec![video("a")], Some("tok-1"));
    let transport = ScriptedTransport::new(vec![
        page_body(&first),
        continuation_body(vec![video("b"), video("c")], Some("tok-2")),
        continuation_body(vec![video("d")], None),
    ]);
    let client = SearchClient::with_transport(transport);

    let options = SearchOptions {
        pages: Some(1),
        ..SearchOptions::default()
    };
    let descriptor = client
        .search("cats", &options)
        .await
        .unwrap()
        .continuation
        .expect("descriptor");

    // Round-trip through JSON, as a caller persisting it would.
    let stored = serde_json::to_value(&descriptor).unwrap();
    let descriptor = ContinuationDescriptor::from_value(&stored).unwrap();

    let step = client.resume(&descriptor).await.unwrap();
    assert_eq!(ids(&step.items), ["b", "c"]);
    let descriptor = step.continuation.expect("stream continues");
    assert_eq!(descriptor.token, "tok-2");

    let step = client.resume(&descriptor).await.unwrap();
    assert_eq!(ids(&step.items), ["d"]);
    assert!(step.continuation.is_none());
}

#[tokio::test]
async fn resume_rejects_item_limited_descriptor() {
    let client = SearchClient::with_transport(ScriptedTransport::new(vec![]));
    let descriptor = {
        let first = sectioned_document(vec![video("a")], Some("tok"));
        let transport = ScriptedTransport::new(vec![page_body(&first)]);
        let helper = SearchClient::with_transport(transport);
        let options = SearchOptions {
            pages: Some(1),
            ..SearchOptions::default()
        };
        helper
            .search("cats", &options)
            .await
            .unwrap()
            .continuation
            .expect("descriptor")
    };

    let mut tampered = descriptor;
    tampered.options.budget.items = Some(10);
    assert!(matches!(
        client.resume(&tampered).await,
        Err(SearchError::BudgetMismatch)
    ));
}

#[tokio::test]
async fn malformed_continuation_body_ends_stream_cleanly() {
    let first = sectioned_document(vec![video("a")], Some("tok-1"));
    let transport = ScriptedTransport::new(vec![
        page_body(&first),
        "<html>not json at all</html>".to_string(),
    ]);
    let client = SearchClient::with_transport(transport);

    let options = SearchOptions {
        pages: Some(3),
        ..SearchOptions::default()
    };
    let results = client.search("cats", &options).await.unwrap();
    assert_eq!(ids(&results.items), ["a"]);
    assert!(results.continuation.is_none());
}

#[tokio::test]
async fn missing_envelope_ends_stream_cleanly() {
    let first = sectioned_document(vec![video("a")], Some("tok-1"));
    let transport = ScriptedTransport::new(vec![
        page_body(&first),
        json!({"responseContext": {}}).to_string(),
    ]);
    let client = SearchClient::with_transport(transport);

    let options = SearchOptions {
        pages: Some(2),
        ..SearchOptions::default()
    };
    let results = client.search("cats", &options).await.unwrap();
    assert_eq!(ids(&results.items), ["a"]);
    assert!(results.continuation.is_none());
}

#[tokio::test]
async fn alert_page_surfaces_upstream_error() {
    let document = json!({
        "alerts": [{"alertRenderer": {
            "type": "ERROR",
            "text": {"simpleText": "This search is unavailable."}
        }}]
    });
    let transport = ScriptedTransport::new(vec![page_body(&document)]);
    let client = SearchClient::with_transport(transport);

    match client.search("cats", &SearchOptions::default()).await {
        Err(SearchError::Upstream(message)) => {
            assert_eq!(message, "This search is unavailable.");
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn documentless_pages_exhaust_the_refetch_cap() {
    let blank = "<html>no embedded state</html>".to_string();
    let transport = ScriptedTransport::new(vec![blank.clone(), blank.clone(), blank]);
    let client = SearchClient::with_transport(transport);

    match client.search("cats", &SearchOptions::default()).await {
        Err(SearchError::NoDocumentFound(attempts)) => assert_eq!(attempts, 3),
        other => panic!("expected no-document error, got {other:?}"),
    }
}

#[tokio::test]
async fn filters_retry_past_documentless_pages() {
    let document = json!({
        "header": {"searchHeaderRenderer": {"searchFilterButton": {"buttonRenderer": {
            "command": {"openPopupAction": {"popup": {
                "searchFilterOptionsDialogRenderer": {"groups": [
                    {"searchFilterGroupRenderer": {
                        "title": {"simpleText": "Type"},
                        "filters": [{"searchFilterRenderer": {
                            "label": {"simpleText": "Video"},
                            "tooltip": "Search for Video"
                        }}]
                    }}
                ]}
            }}}
        }}}}
    });
    let transport = ScriptedTransport::new(vec![
        "<html>no embedded state</html>".to_string(),
        "<html>still nothing</html>".to_string(),
        page_body(&document),
    ]);
    let client = SearchClient::with_transport(transport);

    let catalog = client
        .filters("cats", &SearchOptions::default())
        .await
        .unwrap();
    let group = catalog.get("Type").expect("Type group");
    assert_eq!(group.active().expect("active").name, "Video");
}

#[tokio::test]
async fn empty_query_fails_before_any_request() {
    let transport = ScriptedTransport::new(vec![]);
    let client = SearchClient::with_transport(transport);
    assert!(matches!(
        client.search("  ", &SearchOptions::default()).await,
        Err(SearchError::MissingQuery)
    ));
}
