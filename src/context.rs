//! Request-scoped attribution context.
//!
//! The attribution for a request -- actor, client address, request id --
//! lives in a task-local [`Attribution`] installed by
//! [`AttributionLayer`](crate::middleware::AttributionLayer) and read
//! by audit code through [`current`] and friends. The scope follows an
//! enter/exit contract: it is torn down exactly once when the wrapped
//! future finishes, even if the future fails or unwinds.
//!
//! Scopes nest. An inner [`scope`] shadows the outer attribution until
//! its future completes, after which the outer one is visible again.
//! Outside any scope the accessors return `None` instead of panicking,
//! so audit code can run unchanged in background jobs and tests.

use std::future::Future;

use tokio::task::futures::TaskLocalFuture;

use crate::actor::{Actor, ActorCell, LazyActor};

tokio::task_local! {
    static CURRENT: Attribution;
    static SUPPRESSED: bool;
}

/// Attribution for the request being handled: who acts, from where,
/// and under which request id.
#[derive(Clone, Debug)]
pub struct Attribution {
    request_id: String,
    remote_addr: Option<String>,
    actor: LazyActor,
}

impl Attribution {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            remote_addr: None,
            actor: LazyActor::default(),
        }
    }

    #[must_use]
    pub fn with_remote_addr(mut self, remote_addr: Option<String>) -> Self {
        self.remote_addr = remote_addr;
        self
    }

    #[must_use]
    pub fn with_actor_cell(mut self, cell: ActorCell) -> Self {
        self.actor = LazyActor::new(cell);
        self
    }

    /// Attribute to a known actor up front. Useful outside requests,
    /// e.g. background jobs acting on behalf of a system account.
    #[must_use]
    pub fn with_actor(self, actor: Actor) -> Self {
        let cell = ActorCell::new();
        cell.fill(actor);
        self.with_actor_cell(cell)
    }

    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    #[must_use]
    pub fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }

    /// The acting identity. The first call resolves the underlying
    /// cell and caches the outcome; later calls -- including calls on
    /// clones -- return the same answer.
    #[must_use]
    pub fn actor(&self) -> Option<Actor> {
        self.actor.get()
    }

    #[must_use]
    pub fn actor_cell(&self) -> &ActorCell {
        self.actor.cell()
    }
}

/// Run `f` with `attribution` installed as the current scope.
pub fn scope<F>(attribution: Attribution, f: F) -> TaskLocalFuture<Attribution, F>
where
    F: Future,
{
    CURRENT.scope(attribution, f)
}

/// Synchronous variant of [`scope`] for non-async call trees.
pub fn sync_scope<F, R>(attribution: Attribution, f: F) -> R
where
    F: FnOnce() -> R,
{
    CURRENT.sync_scope(attribution, f)
}

/// The innermost active attribution, or `None` outside any scope.
#[must_use]
pub fn current() -> Option<Attribution> {
    CURRENT.try_with(Clone::clone).ok()
}

#[must_use]
pub fn current_actor() -> Option<Actor> {
    CURRENT.try_with(Attribution::actor).ok().flatten()
}

#[must_use]
pub fn current_remote_addr() -> Option<String> {
    CURRENT.try_with(|a| a.remote_addr.clone()).ok().flatten()
}

#[must_use]
pub fn current_request_id() -> Option<String> {
    CURRENT.try_with(|a| a.request_id.clone()).ok()
}

/// Record `actor` as the acting identity of the current scope.
///
/// Returns whether the write took effect: `false` when no scope is
/// active or the cell was already filled. A write that lands after
/// the actor was first read is accepted but not observed, since reads
/// cache.
pub fn record_actor(actor: Actor) -> bool {
    CURRENT
        .try_with(|a| a.actor_cell().fill(actor))
        .unwrap_or(false)
}

/// Run `f` with audit recording suppressed.
///
/// The flag is scoped like an attribution: it holds for the wrapped
/// future only and is released when the future finishes. The audit
/// system checks [`is_suppressed`] before recording a change.
pub fn suppress<F>(f: F) -> TaskLocalFuture<bool, F>
where
    F: Future,
{
    SUPPRESSED.scope(true, f)
}

/// Synchronous variant of [`suppress`].
pub fn sync_suppress<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    SUPPRESSED.sync_scope(true, f)
}

#[must_use]
pub fn is_suppressed() -> bool {
    SUPPRESSED.try_with(|s| *s).unwrap_or(false)
}
