//! Serde data structures for attribution configuration.
//!
//! [`AttributionConfig`] controls which headers the middleware reads
//! and whether proxy headers are trusted. Derives `Serialize` and
//! `Deserialize` with `deny_unknown_fields` for strict parsing, so a
//! config block embedded in a larger application file fails loudly on
//! typos.

use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_FORWARDED_HEADER: &str = "x-forwarded-for";
pub(crate) const DEFAULT_REQUEST_ID_HEADER: &str = "x-request-id";

fn default_forwarded_header() -> String {
    DEFAULT_FORWARDED_HEADER.to_string()
}

fn default_request_id_header() -> String {
    DEFAULT_REQUEST_ID_HEADER.to_string()
}

const fn default_true() -> bool {
    true
}

fn is_default_forwarded_header(v: &str) -> bool {
    v == DEFAULT_FORWARDED_HEADER
}

fn is_default_request_id_header(v: &str) -> bool {
    v == DEFAULT_REQUEST_ID_HEADER
}

fn is_true(v: &bool) -> bool {
    *v
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AttributionConfig {
    /// Header carrying the proxy chain, leftmost entry being the
    /// original client.
    #[serde(
        default = "default_forwarded_header",
        skip_serializing_if = "is_default_forwarded_header"
    )]
    pub forwarded_header: String,

    /// Header whose value is reused as the request id when present;
    /// a UUID is generated otherwise.
    #[serde(
        default = "default_request_id_header",
        skip_serializing_if = "is_default_request_id_header"
    )]
    pub request_id_header: String,

    /// Whether the forwarded-for header is read at all. Disable when
    /// no trusted proxy fronts the service; the socket peer address is
    /// used instead.
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub trust_forwarded: bool,

    /// Whether a client address is collected at all. Disable to keep
    /// network addresses out of the attribution context entirely.
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub collect_remote_addr: bool,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            forwarded_header: default_forwarded_header(),
            request_id_header: default_request_id_header(),
            trust_forwarded: default_true(),
            collect_remote_addr: default_true(),
        }
    }
}
