//! Search-page scraping core: extract the state document a results page
//! embeds in its HTML, then walk the continuation chain the platform's
//! internal API exposes, normalizing both page-layout generations into
//! one stream of raw items.
//!
//! The crate exposes three operations on [`SearchClient`]: `search`
//! (first page plus continuations within a budget), `resume` (one
//! further page from a persisted [`ContinuationDescriptor`]), and
//! `filters` (the refinement taxonomy only). Everything network-shaped
//! sits behind the [`Transport`] trait so tests can script responses.

mod adapt;
mod client;
mod decode;
mod error;
mod extract;
mod filters;
mod items;
mod options;
mod transport;

pub use client::{ContinuationResults, SearchClient, SearchResults, FIRST_PAGE_ATTEMPTS};
pub use decode::{decode_response, ClientContext, DecodedResponse, ExecutionContext, UserContext};
pub use error::SearchError;
pub use extract::{between, cut_balanced};
pub use filters::{Filter, FilterCatalog, FilterGroup};
pub use items::{ItemMapper, KindTagMapper};
pub use options::{
    query_from_value, Budget, ContinuationDescriptor, RequestSpec, SearchOptions,
    TransportOptions, DEFAULT_ITEM_LIMIT,
};
pub use transport::{NetTransport, Transport};
