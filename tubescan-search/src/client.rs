//! The pagination engine: first-page search, continuation fetches,
//! descriptor resume, and the filters-only path.
//!
//! One logical search is a strictly sequential chain: fetch, decode,
//! adapt, map, then follow the continuation token with POST calls until
//! the token runs out or a budget does. Budgets travel as immutable
//! snapshots; each page hands back the next snapshot.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::form_urlencoded;

use crate::adapt::{adapt_continuation, adapt_first_page, PageBatch};
use crate::decode::{decode_response, dig, render_text, ExecutionContext};
use crate::error::SearchError;
use crate::filters::{parse_filters, Filter, FilterCatalog};
use crate::items::{ItemMapper, KindTagMapper};
use crate::options::{
    normalize_request, Budget, ContinuationDescriptor, RequestSpec, SearchOptions,
    BASE_SEARCH_URL,
};
use crate::transport::{NetTransport, Transport};

const BASE_API_URL: &str = "https://www.youtube.com/youtubei/v1/search?key=";

/// How often the first page is refetched when it embeds no document.
pub const FIRST_PAGE_ATTEMPTS: usize = 3;

/// Accumulated outcome of one top-level search call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub original_query: String,
    pub corrected_query: String,
    /// Platform-estimated total result count.
    pub results: u64,
    pub active_filters: Vec<Filter>,
    pub refinements: Vec<String>,
    pub items: Vec<Value>,
    /// Present only when a token remains and the call was not
    /// item-limited; persist it to pick up where this call stopped.
    pub continuation: Option<ContinuationDescriptor>,
}

/// Outcome of resuming from a persisted descriptor: one further page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationResults {
    pub items: Vec<Value>,
    pub continuation: Option<ContinuationDescriptor>,
}

/// Search client driving fetch/decode/adapt cycles over a [`Transport`].
pub struct SearchClient<T> {
    transport: T,
    mapper: Box<dyn ItemMapper>,
}

impl SearchClient<NetTransport> {
    pub fn new() -> Result<Self, SearchError> {
        Ok(Self::with_transport(NetTransport::new()?))
    }
}

impl<T: Transport> SearchClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            mapper: Box::new(KindTagMapper),
        }
    }

    /// Swap the item mapper (the default only tags renderer kinds).
    pub fn with_mapper(mut self, mapper: Box<dyn ItemMapper>) -> Self {
        self.mapper = mapper;
        self
    }

    /// Run a search and follow continuations within the option budgets.
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResults, SearchError> {
        let spec = normalize_request(query, options)?;
        let (document, api_key, context) = self.fetch_first_page(&spec).await?;
        ensure_no_alert(&document)?;

        let catalog = parse_filters(&document);
        let mut results = SearchResults {
            original_query: spec.search_term().to_string(),
            corrected_query: spec.search_term().to_string(),
            results: document
                .get("estimatedResults")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            active_filters: catalog.active_filters().into_iter().cloned().collect(),
            refinements: document
                .get("refinements")
                .and_then(Value::as_array)
                .map(|refinements| {
                    refinements
                        .iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            items: Vec::new(),
            continuation: None,
        };

        let primary = dig(
            &document,
            &["contents", "twoColumnSearchResultsRenderer", "primaryContents"],
        );
        let batch = primary.map(adapt_first_page).unwrap_or_default();
        let kept = self.map_page(&batch.raw_items, Some(&mut results), &spec.budget);
        let budget = spec.budget.after_page(kept.len());
        tracing::debug!(
            target: "search",
            query = %results.original_query,
            items = kept.len(),
            estimated = results.results,
            has_token = batch.continuation.is_some(),
            "first page adapted"
        );
        results.items = kept;

        let (more, budget, leftover) = self
            .drain_continuations(&api_key, batch.continuation, &context, &spec, budget)
            .await?;
        results.items.extend(more);
        results.continuation = package_descriptor(&api_key, leftover, &context, &spec, budget);
        Ok(results)
    }

    /// Resume from a persisted descriptor: fetch the next page and hand
    /// back a fresh descriptor when the stream continues.
    pub async fn resume(
        &self,
        descriptor: &ContinuationDescriptor,
    ) -> Result<ContinuationResults, SearchError> {
        if descriptor.options.budget.items.is_some() {
            return Err(SearchError::BudgetMismatch);
        }
        // Each resume call grants exactly one further page; item budgets
        // never ride along in a descriptor.
        let budget = Budget {
            items: None,
            pages: Some(1),
        };
        let (items, budget, leftover) = self
            .drain_continuations(
                &descriptor.api_key,
                Some(descriptor.token.clone()),
                &descriptor.context,
                &descriptor.options,
                budget,
            )
            .await?;
        Ok(ContinuationResults {
            items,
            continuation: package_descriptor(
                &descriptor.api_key,
                leftover,
                &descriptor.context,
                &descriptor.options,
                budget,
            ),
        })
    }

    /// Fetch only the filter taxonomy for a query.
    ///
    /// Unlike [`SearchClient::search`], a missing embedded document here
    /// refetches without a cap; the asymmetry is deliberate upstream
    /// behavior we reproduce rather than unify.
    pub async fn filters(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<FilterCatalog, SearchError> {
        let spec = normalize_request(query, options)?;
        let url = search_url(&spec);
        loop {
            let body = self.transport.get(&url, &spec.transport).await?;
            let decoded = decode_response(&body, &spec);
            match decoded.document {
                Some(document) => return Ok(parse_filters(&document)),
                None => tracing::warn!(
                    target: "search",
                    "page embedded no document; refetching filter page"
                ),
            }
        }
    }

    async fn fetch_first_page(
        &self,
        spec: &RequestSpec,
    ) -> Result<(Value, String, ExecutionContext), SearchError> {
        let url = search_url(spec);
        for attempt in 1..=FIRST_PAGE_ATTEMPTS {
            let body = self.transport.get(&url, &spec.transport).await?;
            let decoded = decode_response(&body, spec);
            match decoded.document {
                Some(document) => return Ok((document, decoded.api_key, decoded.context)),
                None => tracing::warn!(
                    target: "search",
                    attempt,
                    max = FIRST_PAGE_ATTEMPTS,
                    "page embedded no document; refetching"
                ),
            }
        }
        Err(SearchError::NoDocumentFound(FIRST_PAGE_ATTEMPTS))
    }

    /// Follow continuation tokens until the stream or a budget ends.
    /// Returns the collected items (in page order), the final budget
    /// snapshot, and any unconsumed token.
    async fn drain_continuations(
        &self,
        api_key: &str,
        mut token: Option<String>,
        context: &ExecutionContext,
        spec: &RequestSpec,
        mut budget: Budget,
    ) -> Result<(Vec<Value>, Budget, Option<String>), SearchError> {
        let mut collected = Vec::new();
        while let Some(current) = token.take() {
            if budget.exhausted() {
                token = Some(current);
                break;
            }
            let batch = self
                .continuation_page(api_key, &current, context, spec)
                .await?;
            let kept = self.map_page(&batch.raw_items, None, &budget);
            budget = budget.after_page(kept.len());
            tracing::debug!(
                target: "search",
                items = kept.len(),
                has_token = batch.continuation.is_some(),
                "continuation page adapted"
            );
            collected.extend(kept);
            token = batch.continuation;
        }
        Ok((collected, budget, token))
    }

    /// One continuation POST. A missing or malformed command envelope —
    /// including an unparseable body — is a legitimate end of stream,
    /// not an error.
    async fn continuation_page(
        &self,
        api_key: &str,
        token: &str,
        context: &ExecutionContext,
        spec: &RequestSpec,
    ) -> Result<PageBatch, SearchError> {
        let url = format!("{BASE_API_URL}{api_key}");
        let payload = json!({ "context": context, "continuation": token });
        let body = self
            .transport
            .post_json(&url, &payload, &spec.transport)
            .await?;
        let Ok(response) = serde_json::from_str::<Value>(&body) else {
            tracing::debug!(target: "search", "continuation body not JSON; end of stream");
            return Ok(PageBatch::default());
        };
        let entries = response
            .get("onResponseReceivedCommands")
            .and_then(Value::as_array)
            .and_then(|commands| commands.first())
            .and_then(|command| {
                dig(command, &["appendContinuationItemsAction", "continuationItems"])
            })
            .and_then(Value::as_array);
        match entries {
            Some(entries) => Ok(adapt_continuation(entries)),
            None => {
                tracing::debug!(target: "search", "continuation envelope absent; end of stream");
                Ok(PageBatch::default())
            }
        }
    }

    fn map_page(
        &self,
        raw_items: &[Value],
        mut accumulator: Option<&mut SearchResults>,
        budget: &Budget,
    ) -> Vec<Value> {
        let mut mapped = Vec::new();
        for raw in raw_items {
            let acc = accumulator.as_mut().map(|results| &mut **results);
            if let Some(item) = self.mapper.map_item(raw, acc) {
                mapped.push(item);
            }
        }
        mapped.truncate(budget.take(mapped.len()));
        mapped
    }
}

fn search_url(spec: &RequestSpec) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(spec.query.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish();
    format!("{BASE_SEARCH_URL}?{query}")
}

/// A descriptor exists only when a token remains and the chain was never
/// item-limited; it is the sole artifact for resuming later.
fn package_descriptor(
    api_key: &str,
    token: Option<String>,
    context: &ExecutionContext,
    spec: &RequestSpec,
    budget: Budget,
) -> Option<ContinuationDescriptor> {
    let token = token?;
    if budget.items.is_some() {
        return None;
    }
    Some(ContinuationDescriptor {
        api_key: api_key.to_string(),
        token,
        context: context.clone(),
        options: RequestSpec {
            budget,
            ..spec.clone()
        },
    })
}

/// A document with alerts but no results container is the platform
/// reporting an error in-band.
fn ensure_no_alert(document: &Value) -> Result<(), SearchError> {
    if document.get("contents").is_some() {
        return Ok(());
    }
    let Some(alerts) = document.get("alerts").and_then(Value::as_array) else {
        return Ok(());
    };
    let error = alerts.iter().find(|alert| {
        dig(alert, &["alertRenderer", "type"]).and_then(Value::as_str) == Some("ERROR")
    });
    if let Some(alert) = error {
        let message = alert
            .get("alertRenderer")
            .and_then(|renderer| renderer.get("text"))
            .map(|text| render_text(text, "* no message *"))
            .unwrap_or_else(|| "* no message *".to_string());
        return Err(SearchError::Upstream(message));
    }
    Ok(())
}
