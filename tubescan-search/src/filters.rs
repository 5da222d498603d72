//! Extraction of the refinement/filter taxonomy from a decoded document.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::decode::{dig, render_text, BASE_URL};

/// One refinement option. Active means "currently selected": the
/// platform drops the navigation target from the selected option, so
/// `url` is `None` exactly when `active` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    pub active: bool,
    pub url: Option<String>,
    pub description: String,
}

/// Ordered options of one filter category, with at most one active.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    pub name: String,
    options: Vec<Filter>,
    active: Option<usize>,
}

impl FilterGroup {
    pub fn options(&self) -> &[Filter] {
        &self.options
    }

    pub fn get(&self, name: &str) -> Option<&Filter> {
        self.options.iter().find(|f| f.name == name)
    }

    /// The currently selected option, if any.
    pub fn active(&self) -> Option<&Filter> {
        self.active.and_then(|idx| self.options.get(idx))
    }

    // Name collisions replace in place, keeping the original position;
    // the last active entry wins the active slot.
    fn push(&mut self, filter: Filter) {
        let idx = match self.options.iter().position(|f| f.name == filter.name) {
            Some(idx) => {
                self.options[idx] = filter;
                idx
            }
            None => {
                self.options.push(filter);
                self.options.len() - 1
            }
        };
        if self.options[idx].active {
            self.active = Some(idx);
        } else if self.active == Some(idx) {
            self.active = None;
        }
    }
}

/// Ordered mapping from category name to its options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCatalog {
    groups: Vec<FilterGroup>,
}

impl FilterCatalog {
    pub fn groups(&self) -> &[FilterGroup] {
        &self.groups
    }

    pub fn get(&self, name: &str) -> Option<&FilterGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The active option of every group that has one, in group order.
    pub fn active_filters(&self) -> Vec<&Filter> {
        self.groups.iter().filter_map(FilterGroup::active).collect()
    }
}

// The group collection lives in one of two tree positions depending on
// the page layout; the submenu spot exists under two key spellings.
const GROUP_PATHS: [&[&str]; 3] = [
    &[
        "header",
        "searchHeaderRenderer",
        "searchFilterButton",
        "buttonRenderer",
        "command",
        "openPopupAction",
        "popup",
        "searchFilterOptionsDialogRenderer",
        "groups",
    ],
    &[
        "contents",
        "twoColumnSearchResultsRenderer",
        "primaryContents",
        "sectionListRenderer",
        "subMenu",
        "searchSubMenuRenderer",
        "groups",
    ],
    &[
        "contents",
        "twoColumnSearchResultsRenderer",
        "primaryContents",
        "sectionListRenderer",
        "submenu",
        "searchSubMenuRenderer",
        "groups",
    ],
];

/// Parse the filter taxonomy out of a decoded document. Absence at every
/// known location yields an empty catalog, never an error.
pub fn parse_filters(document: &Value) -> FilterCatalog {
    let groups = GROUP_PATHS
        .iter()
        .find_map(|path| dig(document, path).and_then(Value::as_array));
    let Some(groups) = groups else {
        return FilterCatalog::default();
    };

    let mut catalog = FilterCatalog::default();
    for group in groups {
        let Some(renderer) = group.get("searchFilterGroupRenderer") else {
            continue;
        };
        let mut parsed = FilterGroup {
            name: renderer
                .get("title")
                .map(|t| render_text(t, ""))
                .unwrap_or_default(),
            ..FilterGroup::default()
        };
        let filters = renderer
            .get("filters")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for filter in filters {
            let Some(filter) = filter.get("searchFilterRenderer") else {
                continue;
            };
            parsed.push(parse_filter(filter));
        }
        catalog.groups.push(parsed);
    }
    catalog
}

fn parse_filter(renderer: &Value) -> Filter {
    let target = dig(
        renderer,
        &[
            "navigationEndpoint",
            "commandMetadata",
            "webCommandMetadata",
            "url",
        ],
    )
    .and_then(Value::as_str);
    // The selected refinement is the one without a navigation target.
    let active = renderer.get("navigationEndpoint").is_none();
    let url = target.and_then(|path| {
        Url::parse(BASE_URL)
            .ok()?
            .join(path)
            .ok()
            .map(String::from)
    });
    Filter {
        name: renderer
            .get("label")
            .map(|l| render_text(l, ""))
            .unwrap_or_default(),
        active,
        url,
        description: renderer
            .get("tooltip")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}
