//! Argument normalization and the serializable request/budget state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::decode::ExecutionContext;
use crate::error::SearchError;

/// Default item budget when the caller bounds neither items nor pages.
pub const DEFAULT_ITEM_LIMIT: u64 = 100;

pub(crate) const BASE_SEARCH_URL: &str = "https://www.youtube.com/results";

// Opaque provider convention for safe search; preserved byte-for-byte.
const SAFE_SEARCH_COOKIE: &str = "PREF=f2=8000000";

/// Caller-facing options for one top-level search call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum items to collect. Ignored when `pages` is set; defaults
    /// to [`DEFAULT_ITEM_LIMIT`] when neither limit is given.
    pub limit: Option<u64>,
    /// Maximum pages to fetch. Setting this lifts the item limit.
    pub pages: Option<u64>,
    pub safe_search: bool,
    pub gl: Option<String>,
    pub hl: Option<String>,
    pub utc_offset_minutes: Option<i64>,
    #[serde(default)]
    pub request: TransportOptions,
}

/// Raw transport knobs threaded through every request of a chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportOptions {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub retries: Option<usize>,
}

/// Remaining fetch budget. `None` means unbounded. Snapshots are
/// immutable: each page produces the next snapshot via [`Budget::after_page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub items: Option<u64>,
    pub pages: Option<u64>,
}

impl Budget {
    pub fn items_exhausted(&self) -> bool {
        self.items == Some(0)
    }

    pub fn pages_exhausted(&self) -> bool {
        self.pages == Some(0)
    }

    pub fn exhausted(&self) -> bool {
        self.items_exhausted() || self.pages_exhausted()
    }

    /// How many of `offered` items fit in the remaining item budget.
    pub fn take(&self, offered: usize) -> usize {
        match self.items {
            Some(limit) => offered.min(limit as usize),
            None => offered,
        }
    }

    /// Budget after a page that kept `kept` items.
    pub fn after_page(self, kept: usize) -> Budget {
        Budget {
            items: self.items.map(|i| i.saturating_sub(kept as u64)),
            pages: self.pages.map(|p| p.saturating_sub(1)),
        }
    }
}

/// Normalized request state: derived once per top-level call and carried
/// through every continuation step, budget snapshot aside, unchanged.
/// Plain nested values only, so it can ride inside a persisted
/// continuation descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpec {
    /// Query-string pairs for the search GET, in order.
    pub query: Vec<(String, String)>,
    pub budget: Budget,
    pub safe_search: bool,
    pub gl: Option<String>,
    pub hl: Option<String>,
    pub utc_offset_minutes: Option<i64>,
    #[serde(default)]
    pub transport: TransportOptions,
}

impl RequestSpec {
    /// The plain search term inside the query map.
    pub fn search_term(&self) -> &str {
        self.query
            .iter()
            .find(|(k, _)| k == "search_query")
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }
}

/// The minimal serializable state needed to fetch the next page in a
/// later, independent invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationDescriptor {
    pub api_key: String,
    pub token: String,
    pub context: ExecutionContext,
    pub options: RequestSpec,
}

impl ContinuationDescriptor {
    /// Validate the four-part descriptor shape from untyped input.
    pub fn from_value(value: &Value) -> Result<Self, SearchError> {
        let obj = value
            .as_object()
            .ok_or(SearchError::InvalidDescriptor("descriptor must be an object"))?;

        let api_key = obj
            .get("apiKey")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(SearchError::InvalidDescriptor(
                "apiKey must be a non-empty string",
            ))?;
        let token = obj
            .get("token")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(SearchError::InvalidDescriptor(
                "token must be a non-empty string",
            ))?;
        let context = obj
            .get("context")
            .filter(|v| v.is_object())
            .ok_or(SearchError::InvalidDescriptor("context must be an object"))?;
        let options = obj
            .get("options")
            .filter(|v| v.is_object())
            .ok_or(SearchError::InvalidDescriptor("options must be an object"))?;

        let context: ExecutionContext = serde_json::from_value(context.clone())
            .map_err(|_| SearchError::InvalidDescriptor("context is not an execution context"))?;
        let options: RequestSpec = serde_json::from_value(options.clone())
            .map_err(|_| SearchError::InvalidDescriptor("options are not a request spec"))?;

        Ok(Self {
            api_key: api_key.to_string(),
            token: token.to_string(),
            context,
            options,
        })
    }
}

/// Validate an untyped query value. Typed callers pass `&str` straight
/// into [`normalize_request`]; this seam exists for front-ends handing
/// in JSON.
pub fn query_from_value(raw: &Value) -> Result<&str, SearchError> {
    match raw {
        Value::Null => Err(SearchError::MissingQuery),
        Value::String(s) if s.trim().is_empty() => Err(SearchError::MissingQuery),
        Value::String(s) => Ok(s),
        _ => Err(SearchError::InvalidQueryType),
    }
}

/// Normalize a raw query and options bag into a [`RequestSpec`].
///
/// Budget pairing: a user-set page count lifts the item limit; otherwise
/// the item limit (user's or the default) applies and pages are
/// unbounded. Exactly one of the two ends up finite.
pub fn normalize_request(
    query: &str,
    options: &SearchOptions,
) -> Result<RequestSpec, SearchError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(SearchError::MissingQuery);
    }

    let budget = match options.pages {
        Some(pages) if pages > 0 => Budget {
            items: None,
            pages: Some(pages),
        },
        _ => Budget {
            items: Some(match options.limit {
                Some(limit) if limit > 0 => limit,
                _ => DEFAULT_ITEM_LIMIT,
            }),
            pages: None,
        },
    };

    let query_pairs = if query.starts_with(BASE_SEARCH_URL) {
        decompose_filter_link(query)?
    } else {
        vec![("search_query".to_string(), query.to_string())]
    };

    let mut transport = options.request.clone();
    if options.safe_search {
        inject_safe_search_cookie(&mut transport.headers);
    }

    Ok(RequestSpec {
        query: query_pairs,
        budget,
        safe_search: options.safe_search,
        gl: options.gl.clone(),
        hl: options.hl.clone(),
        utc_offset_minutes: options.utc_offset_minutes,
        transport,
    })
}

/// A query that is itself a platform results link carries its search
/// term and refinement parameters in the query string; keep them all.
fn decompose_filter_link(link: &str) -> Result<Vec<(String, String)>, SearchError> {
    let url = Url::parse(link).map_err(|_| SearchError::MissingSearchTermInFilterLink)?;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let has_term = pairs
        .iter()
        .any(|(k, v)| k == "search_query" && !v.is_empty());
    if !has_term {
        return Err(SearchError::MissingSearchTermInFilterLink);
    }
    Ok(pairs)
}

fn inject_safe_search_cookie(headers: &mut BTreeMap<String, String>) {
    let existing = headers
        .keys()
        .find(|k| k.eq_ignore_ascii_case("cookie"))
        .cloned();
    match existing {
        Some(key) => {
            let joined = format!("{}; {}", headers[&key], SAFE_SEARCH_COOKIE);
            headers.insert(key, joined);
        }
        None => {
            headers.insert("cookie".to_string(), SAFE_SEARCH_COOKIE.to_string());
        }
    }
}
