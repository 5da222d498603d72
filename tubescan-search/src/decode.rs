//! Turning a raw search-page body into the decoded response record.
//!
//! A response body is an HTML page that embeds the state document, a
//! session api key, and the client version the page was served with.
//! Decoding never fails: a malformed body simply produces a record with
//! no document, which the engine treats as "fetch a fresh response".

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extract::{between, json_after};
use crate::options::RequestSpec;

pub(crate) const BASE_URL: &str = "https://www.youtube.com/";

const DOCUMENT_ANCHORS: [&str; 2] = ["var ytInitialData = ", "window[\"ytInitialData\"] = "];
const API_KEY_ANCHORS: [&str; 2] = ["INNERTUBE_API_KEY\":\"", "innertubeApiKey\":\""];
const VERSION_ANCHORS: [&str; 2] = [
    "INNERTUBE_CONTEXT_CLIENT_VERSION\":\"",
    "innertube_context_client_version\":\"",
];

// Used until the page tells us the version it was actually served with.
const FALLBACK_CLIENT_VERSION: &str = "2.20240620.05.00";

/// Client half of the execution context sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContext {
    pub utc_offset_minutes: i64,
    pub gl: String,
    pub hl: String,
    pub client_name: String,
    pub client_version: String,
}

/// User half of the execution context; only carries the safety flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_safety_mode: Option<bool>,
}

/// Per-session locale/client descriptor. One instance is built at decode
/// time and carried unchanged through an entire pagination chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub client: ClientContext,
    #[serde(default)]
    pub user: UserContext,
    #[serde(default)]
    pub request: serde_json::Map<String, Value>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            client: ClientContext {
                utc_offset_minutes: 0,
                gl: "US".to_string(),
                hl: "en".to_string(),
                client_name: "WEB".to_string(),
                client_version: FALLBACK_CLIENT_VERSION.to_string(),
            },
            user: UserContext::default(),
            request: serde_json::Map::new(),
        }
    }
}

/// Everything recovered from one raw response body.
#[derive(Debug, Clone)]
pub struct DecodedResponse {
    /// The embedded state document, or `None` when extraction failed.
    pub document: Option<Value>,
    /// Session api key; empty string when the page did not embed one.
    pub api_key: String,
    /// Context to send with follow-up requests.
    pub context: ExecutionContext,
}

/// Decode a raw response body. Infallible by contract: every degradation
/// is encoded in the output shape.
pub fn decode_response(body: &str, spec: &RequestSpec) -> DecodedResponse {
    let document = DOCUMENT_ANCHORS
        .iter()
        .find_map(|anchor| json_after(body, anchor));

    let api_key = first_scraped(body, &API_KEY_ANCHORS);
    let client_version = first_scraped(body, &VERSION_ANCHORS);

    let mut context = ExecutionContext::default();
    if !client_version.is_empty() {
        context.client.client_version = client_version;
    }
    if let Some(gl) = &spec.gl {
        context.client.gl = gl.clone();
    }
    if let Some(hl) = &spec.hl {
        context.client.hl = hl.clone();
    }
    if let Some(offset) = spec.utc_offset_minutes {
        context.client.utc_offset_minutes = offset;
    }
    if spec.safe_search {
        context.user.enable_safety_mode = Some(true);
    }

    if document.is_none() {
        tracing::debug!(
            target: "search",
            body_len = body.len(),
            has_api_key = !api_key.is_empty(),
            "response body carried no embedded document"
        );
    }

    DecodedResponse {
        document,
        api_key,
        context,
    }
}

// Both embedding variants close the value with a bare quote.
fn first_scraped(body: &str, anchors: &[&str; 2]) -> String {
    anchors
        .iter()
        .map(|anchor| between(body, anchor, "\""))
        .find(|s| !s.is_empty())
        .unwrap_or("")
        .to_string()
}

/// Render a platform text node: `simpleText`, or `runs[].text` joined,
/// or the fallback.
pub(crate) fn render_text(txt: &Value, fallback: &str) -> String {
    if let Some(s) = txt.get("simpleText").and_then(Value::as_str) {
        return s.to_string();
    }
    if let Some(runs) = txt.get("runs").and_then(Value::as_array) {
        let joined: String = runs
            .iter()
            .filter_map(|run| run.get("text").and_then(Value::as_str))
            .collect();
        if !joined.is_empty() {
            return joined;
        }
    }
    fallback.to_string()
}

/// Walk a chain of object keys, `None` as soon as one is missing.
pub(crate) fn dig<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cursor = value;
    for key in path {
        cursor = cursor.get(key)?;
    }
    Some(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{normalize_request, SearchOptions};
    use serde_json::json;

    fn spec() -> RequestSpec {
        normalize_request("cats", &SearchOptions::default()).unwrap()
    }

    fn page(document: &Value) -> String {
        format!(
            "<html><script>var ytInitialData = {document};</script>\
             \"INNERTUBE_API_KEY\":\"key-123\",\
             \"INNERTUBE_CONTEXT_CLIENT_VERSION\":\"2.20990101.00.00\"</html>"
        )
    }

    #[test]
    fn decodes_document_key_and_version() {
        let doc = json!({"contents": {"x": 1}});
        let decoded = decode_response(&page(&doc), &spec());
        assert_eq!(decoded.document, Some(doc));
        assert_eq!(decoded.api_key, "key-123");
        assert_eq!(decoded.context.client.client_version, "2.20990101.00.00");
    }

    #[test]
    fn missing_anchor_yields_none_document_without_error() {
        let decoded = decode_response("<html>nothing embedded</html>", &spec());
        assert!(decoded.document.is_none());
        assert_eq!(decoded.api_key, "");
    }

    #[test]
    fn lowercase_anchor_variants_are_scraped() {
        let body = "\"innertubeApiKey\":\"alt-key\" \
                    \"innertube_context_client_version\":\"1.23\"";
        let decoded = decode_response(body, &spec());
        assert_eq!(decoded.api_key, "alt-key");
        assert_eq!(decoded.context.client.client_version, "1.23");
    }

    #[test]
    fn context_overlays_locale_and_safety() {
        let options = SearchOptions {
            gl: Some("DE".to_string()),
            hl: Some("de".to_string()),
            utc_offset_minutes: Some(120),
            safe_search: true,
            ..SearchOptions::default()
        };
        let spec = normalize_request("cats", &options).unwrap();
        let decoded = decode_response("<html></html>", &spec);
        assert_eq!(decoded.context.client.gl, "DE");
        assert_eq!(decoded.context.client.hl, "de");
        assert_eq!(decoded.context.client.utc_offset_minutes, 120);
        assert_eq!(decoded.context.user.enable_safety_mode, Some(true));
    }

    #[test]
    fn context_serializes_with_platform_key_casing() {
        let context = ExecutionContext::default();
        let value = serde_json::to_value(&context).unwrap();
        assert!(value["client"]["clientVersion"].is_string());
        assert_eq!(value["client"]["clientName"], "WEB");
        assert_eq!(value["user"], json!({}));
        assert_eq!(value["request"], json!({}));
    }

    #[test]
    fn render_text_prefers_simple_text_then_runs() {
        assert_eq!(render_text(&json!({"simpleText": "hi"}), "x"), "hi");
        assert_eq!(
            render_text(&json!({"runs": [{"text": "a"}, {"text": "b"}]}), "x"),
            "ab"
        );
        assert_eq!(render_text(&json!({}), "* no message *"), "* no message *");
    }
}
