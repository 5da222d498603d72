//! The item-mapping seam between raw renderer entries and caller items.
//!
//! The engine routes raw entries through an [`ItemMapper`] and never
//! inspects the mapped output. The default mapper only decides which
//! renderer kinds are worth keeping; detailed per-field mapping belongs
//! to downstream consumers.

use serde_json::{json, Value};

use crate::client::SearchResults;
use crate::decode::render_text;

/// Maps one raw renderer entry to a presentable item, or `None` when the
/// entry is unrepresentable (ads, promos, corrections). First-page calls
/// hand over the in-progress accumulator so mappers can fold page-level
/// context (e.g. a corrected query) into it.
pub trait ItemMapper: Send + Sync {
    fn map_item(&self, raw: &Value, accumulator: Option<&mut SearchResults>) -> Option<Value>;
}

// Renderer kinds that represent actual results.
const KEPT_KINDS: [&str; 8] = [
    "videoRenderer",
    "channelRenderer",
    "playlistRenderer",
    "shelfRenderer",
    "movieRenderer",
    "gridMovieRenderer",
    "radioRenderer",
    "showRenderer",
];

// Ad and promo renderers the platform mixes into result lists.
const DROPPED_KINDS: [&str; 7] = [
    "adSlotRenderer",
    "carouselAdRenderer",
    "promotedSparklesTextSearchRenderer",
    "promotedSparklesWebRenderer",
    "promotedVideoRenderer",
    "searchPyvRenderer",
    "backgroundPromoRenderer",
];

/// Default mapper: keeps known result kinds as `{type, raw}` records,
/// drops ads, captures query corrections into the accumulator, and skips
/// anything it has never seen (the platform adds kinds without notice).
pub struct KindTagMapper;

impl ItemMapper for KindTagMapper {
    fn map_item(&self, raw: &Value, accumulator: Option<&mut SearchResults>) -> Option<Value> {
        // Grid entries wrap the real renderer one level down.
        let entry = raw
            .get("richItemRenderer")
            .or_else(|| raw.get("richSectionRenderer"))
            .and_then(|wrapper| wrapper.get("content"))
            .unwrap_or(raw);
        let (kind, inner) = entry.as_object()?.iter().next()?;

        match kind.as_str() {
            kind if KEPT_KINDS.contains(&kind) => Some(json!({"type": kind, "raw": inner})),
            "showingResultsForRenderer" | "didYouMeanRenderer" => {
                if let (Some(results), Some(corrected)) = (accumulator, inner.get("correctedQuery"))
                {
                    let corrected = render_text(corrected, "");
                    if !corrected.is_empty() {
                        results.corrected_query = corrected;
                    }
                }
                None
            }
            kind if DROPPED_KINDS.contains(&kind) => None,
            other => {
                tracing::trace!(target: "search", kind = other, "skipping unknown renderer kind");
                None
            }
        }
    }
}
