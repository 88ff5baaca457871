//! Client address extraction from proxy headers.
//!
//! [`client_addr`] resolves the "from where" half of an attribution:
//! the leftmost entry of the forwarded-for chain when a trusted proxy
//! is in front, the socket peer address otherwise. [`strip_port`]
//! removes a trailing port from `x.x.x.x:p` and `[v6]:p` forms.

use std::net::SocketAddr;

use axum::http::{HeaderMap, HeaderName};

/// Resolve the client address for a request.
///
/// When `trust_forwarded` is set and `forwarded_header` carries a
/// usable value, the leftmost comma-separated entry wins (the original
/// client in a proxy chain) and any trailing port is stripped. In
/// every other case -- header absent, unreadable, empty, or not
/// trusted -- the peer socket's IP is used. Returns `None` only when
/// neither source is available.
#[must_use]
pub fn client_addr(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    forwarded_header: &HeaderName,
    trust_forwarded: bool,
) -> Option<String> {
    let forwarded = if trust_forwarded {
        headers
            .get(forwarded_header)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
    } else {
        None
    };

    match forwarded {
        Some(entry) => Some(strip_port(entry).to_string()),
        None => peer.map(|p| p.ip().to_string()),
    }
}

/// Strip a trailing `:port` from an address string.
///
/// Handles the shapes seen in forwarded-for entries:
/// - `x.x.x.x:p` (IPv4 or hostname with port, exactly one colon)
/// - `[v6]:p` and `[v6]` (bracketed IPv6)
///
/// Plain IPv4, plain IPv6, and IPv4-mapped IPv6 (`::ffff:x.x.x.x`,
/// which contains both dots and multiple colons) pass through
/// unchanged.
#[must_use]
pub fn strip_port(addr: &str) -> &str {
    if let Some(inner) = addr.strip_prefix('[') {
        return inner.split(']').next().unwrap_or(inner);
    }
    if addr.contains('.') && addr.bytes().filter(|b| *b == b':').count() == 1 {
        return addr.split(':').next().unwrap_or(addr);
    }
    addr
}
