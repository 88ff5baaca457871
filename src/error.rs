//! Unified error types for Byline.
//!
//! Defines [`BylineError`] using `thiserror` for `Display` and `Error`
//! derives. Errors can only arise while constructing a layer from
//! configuration; the per-request path is infallible.

use http::header::InvalidHeaderName;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BylineError {
    #[error("invalid {field} '{name}': {source}")]
    InvalidHeaderName {
        field: &'static str,
        name: String,
        #[source]
        source: InvalidHeaderName,
    },
}
