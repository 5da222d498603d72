use thiserror::Error;

/// Error types surfaced by the search library.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Embedded JSON extraction found something other than an array or object.
    #[error("embedded JSON must begin with '[' or '{{' (got {0:?})")]
    UnsupportedRoot(Option<char>),

    /// Embedded JSON extraction ran out of input before the structure closed.
    #[error("embedded JSON ended before its brackets balanced")]
    UnterminatedStructure,

    /// The page never yielded an embedded result document.
    #[error("no embedded result document found after {0} attempts")]
    NoDocumentFound(usize),

    /// The platform itself reported an error instead of results.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// A resumption descriptor did not match the expected four-part shape.
    #[error("invalid continuation descriptor: {0}")]
    InvalidDescriptor(&'static str),

    /// Resuming is only valid when the original call was not item-limited.
    #[error("continuation is only valid for page-limited or unlimited searches")]
    BudgetMismatch,

    /// The search query was missing or empty.
    #[error("search query is mandatory")]
    MissingQuery,

    /// The search query was not a string.
    #[error("search query must be of type string")]
    InvalidQueryType,

    /// A filter link was passed as the query but carried no search term.
    #[error("filter links have to include a search term")]
    MissingSearchTermInFilterLink,

    #[error(transparent)]
    Http(#[from] tubescan_http::HttpError),
}
