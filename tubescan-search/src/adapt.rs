//! Normalizing the platform's drifting page layouts into one shape.
//!
//! Two generations of the search page ship concurrently: an older
//! sectioned layout and a newer grid layout. Follow-up calls return a
//! third, flat "continuation items" shape. Everything funnels into
//! [`PageBatch`] so the pagination engine only ever sees one format.

use serde_json::Value;

/// One page's worth of raw items plus the token for the next page.
#[derive(Debug, Clone, Default)]
pub struct PageBatch {
    pub raw_items: Vec<Value>,
    pub continuation: Option<String>,
}

/// First-page layout, resolved exactly once per response.
enum PageLayout<'a> {
    /// List of heterogeneous sections; exactly one holds the item list.
    Sectioned(&'a Value),
    /// Flat list of entries, each an item or a continuation marker.
    Grid(&'a Value),
}

impl<'a> PageLayout<'a> {
    fn classify(primary: &'a Value) -> Option<Self> {
        if let Some(list) = primary.get("sectionListRenderer") {
            return Some(PageLayout::Sectioned(list));
        }
        if let Some(grid) = primary.get("richGridRenderer") {
            return Some(PageLayout::Grid(grid));
        }
        None
    }
}

/// Shape of one entry in a continuation response, resolved per entry.
enum ContinuationEntry<'a> {
    /// Old-style section wrapping a whole inner item list.
    LegacySection(&'a Value),
    /// Grid item or grid section; contributes itself.
    GridEntry,
    /// Marker carrying the next-page token.
    Marker,
    Unknown,
}

impl<'a> ContinuationEntry<'a> {
    fn classify(entry: &'a Value) -> Self {
        if let Some(section) = entry.get("itemSectionRenderer") {
            ContinuationEntry::LegacySection(section)
        } else if entry.get("richItemRenderer").is_some()
            || entry.get("richSectionRenderer").is_some()
        {
            ContinuationEntry::GridEntry
        } else if entry.get("continuationItemRenderer").is_some() {
            ContinuationEntry::Marker
        } else {
            ContinuationEntry::Unknown
        }
    }
}

/// Adapt the top-level results container of a first page.
pub fn adapt_first_page(primary: &Value) -> PageBatch {
    match PageLayout::classify(primary) {
        Some(PageLayout::Sectioned(list)) => {
            let contents = list
                .get("contents")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let raw_items = contents
                .iter()
                .find_map(|entry| {
                    entry
                        .get("itemSectionRenderer")
                        .and_then(|s| s.get("contents"))
                        .and_then(Value::as_array)
                })
                .cloned()
                .unwrap_or_default();
            let continuation = contents.iter().find_map(continuation_token);
            PageBatch {
                raw_items,
                continuation,
            }
        }
        Some(PageLayout::Grid(grid)) => {
            let contents = grid
                .get("contents")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let raw_items = contents
                .iter()
                .filter(|entry| entry.get("continuationItemRenderer").is_none())
                .cloned()
                .collect();
            let continuation = contents.iter().find_map(continuation_token);
            PageBatch {
                raw_items,
                continuation,
            }
        }
        None => {
            tracing::trace!(target: "search", "unrecognized first-page layout; empty batch");
            PageBatch::default()
        }
    }
}

/// Adapt the heterogeneous entry list of a continuation response.
/// Unknown shapes are skipped; a later marker replaces an earlier one.
pub fn adapt_continuation(entries: &[Value]) -> PageBatch {
    let mut batch = PageBatch::default();
    for entry in entries {
        match ContinuationEntry::classify(entry) {
            ContinuationEntry::LegacySection(section) => {
                if let Some(contents) = section.get("contents").and_then(Value::as_array) {
                    batch.raw_items.extend(contents.iter().cloned());
                }
            }
            ContinuationEntry::GridEntry => batch.raw_items.push(entry.clone()),
            ContinuationEntry::Marker => batch.continuation = continuation_token(entry),
            ContinuationEntry::Unknown => {
                tracing::trace!(target: "search", "skipping unrecognized continuation entry");
            }
        }
    }
    batch
}

/// Token inside a continuation marker, if the marker carries one.
fn continuation_token(entry: &Value) -> Option<String> {
    entry
        .get("continuationItemRenderer")?
        .get("continuationEndpoint")?
        .get("continuationCommand")?
        .get("token")?
        .as_str()
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn marker(token: &str) -> Value {
        json!({
            "continuationItemRenderer": {
                "continuationEndpoint": {"continuationCommand": {"token": token}}
            }
        })
    }

    #[test]
    fn sectioned_layout_yields_items_and_token() {
        let primary = json!({
            "sectionListRenderer": {
                "contents": [
                    {"heroRenderer": {}},
                    {"itemSectionRenderer": {"contents": [
                        {"videoRenderer": {"videoId": "a"}},
                        {"videoRenderer": {"videoId": "b"}}
                    ]}},
                    marker("tok-1")
                ]
            }
        });
        let batch = adapt_first_page(&primary);
        assert_eq!(batch.raw_items.len(), 2);
        assert_eq!(batch.continuation.as_deref(), Some("tok-1"));
    }

    #[test]
    fn grid_layout_filters_markers_from_items() {
        let primary = json!({
            "richGridRenderer": {
                "contents": [
                    {"richItemRenderer": {"content": {"videoRenderer": {"videoId": "a"}}}},
                    {"richItemRenderer": {"content": {"videoRenderer": {"videoId": "b"}}}},
                    {"richItemRenderer": {"content": {"videoRenderer": {"videoId": "c"}}}},
                    marker("tok-2")
                ]
            }
        });
        let batch = adapt_first_page(&primary);
        assert_eq!(batch.raw_items.len(), 3);
        assert_eq!(batch.continuation.as_deref(), Some("tok-2"));
    }

    #[test]
    fn grid_layout_without_marker_has_no_continuation() {
        let primary = json!({
            "richGridRenderer": {
                "contents": [
                    {"richItemRenderer": {"content": {"videoRenderer": {"videoId": "a"}}}}
                ]
            }
        });
        let batch = adapt_first_page(&primary);
        assert_eq!(batch.raw_items.len(), 1);
        assert!(batch.continuation.is_none());
    }

    #[test]
    fn unknown_first_page_layout_is_empty() {
        let batch = adapt_first_page(&json!({"futureLayoutRenderer": {}}));
        assert!(batch.raw_items.is_empty());
        assert!(batch.continuation.is_none());
    }

    #[test]
    fn continuation_entries_route_by_shape() {
        let entries = vec![
            json!({"itemSectionRenderer": {"contents": [
                {"videoRenderer": {"videoId": "a"}},
                {"videoRenderer": {"videoId": "b"}}
            ]}}),
            json!({"richItemRenderer": {"content": {"videoRenderer": {"videoId": "c"}}}}),
            json!({"richSectionRenderer": {"content": {}}}),
            json!({"someFutureRenderer": {}}),
            marker("tok-3"),
        ];
        let batch = adapt_continuation(&entries);
        assert_eq!(batch.raw_items.len(), 4);
        assert_eq!(batch.continuation.as_deref(), Some("tok-3"));
    }

    #[test]
    fn later_marker_wins() {
        let entries = vec![marker("first"), marker("second")];
        let batch = adapt_continuation(&entries);
        assert!(batch.raw_items.is_empty());
        assert_eq!(batch.continuation.as_deref(), Some("second"));
    }

    #[test]
    fn tokenless_marker_yields_no_continuation() {
        let entries = vec![json!({"continuationItemRenderer": {}})];
        let batch = adapt_continuation(&entries);
        assert!(batch.continuation.is_none());
    }
}
