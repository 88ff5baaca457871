//! Byline couples HTTP requests to audit-trail attribution.
//!
//! An audit system answers "who changed this, and from where?". Byline
//! contributes the request-lifecycle half of that answer: a tower
//! middleware that extracts the client's network address, defers
//! resolution of the acting user, and publishes both into a
//! request-scoped [`Attribution`] that change-logging code reads when
//! it records a change. The scope is torn down exactly once per
//! request, even when the handler fails or panics.
//!
//! Actor resolution is deliberately lazy. Authentication middleware
//! usually runs *after* outer layers, so the acting user is unknown
//! when the attribution scope opens. The scope therefore carries an
//! empty write-once [`ActorCell`] that auth code fills later; the
//! first read resolves and caches it.
//!
//! # Architecture
//!
//! - [`addr`] -- Client address extraction: leftmost forwarded-for
//!   entry when a proxy is in front, socket peer address otherwise,
//!   with `:port` suffix stripping.
//! - [`actor`] -- The [`Actor`] identity, the write-once [`ActorCell`],
//!   and deferred resolution via [`LazyActor`].
//! - [`config`] -- Serde configuration for header names and proxy
//!   trust.
//! - [`context`] -- The task-local attribution scope: enter/exit with
//!   guaranteed teardown, nesting, and audit suppression.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`middleware`] -- The tower layer/service pair that opens the
//!   scope around every request.
//!
//! # Example
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use byline::{context, AttributionLayer};
//!
//! async fn handler() -> String {
//!     let who = context::current_actor().map_or_else(|| "anonymous".into(), |a| a.id);
//!     let from = context::current_remote_addr().unwrap_or_else(|| "-".into());
//!     format!("{who} @ {from}")
//! }
//!
//! let app: Router = Router::new()
//!     .route("/", get(handler))
//!     .layer(AttributionLayer::default());
//! ```

pub mod addr;
pub mod actor;
pub mod config;
pub mod context;
pub mod error;
pub mod middleware;

pub use actor::{Actor, ActorCell, LazyActor};
pub use config::AttributionConfig;
pub use context::Attribution;
pub use error::BylineError;
pub use middleware::{AttributionLayer, AttributionService};
