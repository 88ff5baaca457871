//! Actor identity and deferred resolution.
//!
//! The [`Actor`] attributed to a change is rarely known when the
//! attribution scope opens: authentication middleware runs later in
//! the stack. The middleware therefore plants an empty [`ActorCell`]
//! (a shared write-once slot) and audit code reads it through a
//! [`LazyActor`], which resolves on first read and caches the outcome
//! so every record produced within one request names the same actor.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

/// The identity attributed to a change for audit purposes.
///
/// Absence of an actor (an unfilled cell) means the change was made
/// anonymously or by an unauthenticated caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable identifier, e.g. a user id or service-account name.
    pub id: String,

    /// Optional human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({name})", self.id),
            None => f.write_str(&self.id),
        }
    }
}

/// Shared write-once slot for the acting identity.
///
/// The attribution middleware creates the cell empty and stores a
/// clone in the request extensions; authentication code fills it once
/// the caller is known. Clones share the slot.
#[derive(Clone, Debug, Default)]
pub struct ActorCell(Arc<OnceLock<Actor>>);

impl ActorCell {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the cell. The first write wins; returns whether this call
    /// was the one that filled it.
    pub fn fill(&self, actor: Actor) -> bool {
        self.0.set(actor).is_ok()
    }

    #[must_use]
    pub fn get(&self) -> Option<Actor> {
        self.0.get().cloned()
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.0.get().is_some()
    }
}

/// Lazily-evaluated read handle over an [`ActorCell`].
///
/// The cell is consulted only on the first [`get`](Self::get), never
/// eagerly, and the outcome is cached: a fill that lands after the
/// first read is not observed. Clones share both the cell and the
/// cache.
#[derive(Clone, Debug, Default)]
pub struct LazyActor {
    cell: ActorCell,
    read: Arc<OnceLock<Option<Actor>>>,
}

impl LazyActor {
    #[must_use]
    pub fn new(cell: ActorCell) -> Self {
        Self {
            cell,
            read: Arc::new(OnceLock::new()),
        }
    }

    /// Resolve the actor, caching the first outcome.
    #[must_use]
    pub fn get(&self) -> Option<Actor> {
        self.read.get_or_init(|| self.cell.get()).clone()
    }

    #[must_use]
    pub fn cell(&self) -> &ActorCell {
        &self.cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fill_wins() {
        let cell = ActorCell::new();
        assert!(cell.fill(Actor::new("alice")));
        assert!(!cell.fill(Actor::new("bob")));
        assert_eq!(cell.get(), Some(Actor::new("alice")));
    }

    #[test]
    fn fill_before_read_is_observed() {
        let lazy = LazyActor::new(ActorCell::new());
        lazy.cell().fill(Actor::new("alice"));
        assert_eq!(lazy.get(), Some(Actor::new("alice")));
    }

    #[test]
    fn read_before_fill_caches_anonymous() {
        let lazy = LazyActor::new(ActorCell::new());
        assert_eq!(lazy.get(), None);
        lazy.cell().fill(Actor::new("alice"));
        // The first read already resolved this request as anonymous.
        assert_eq!(lazy.get(), None);
    }

    #[test]
    fn clones_share_the_cache() {
        let lazy = LazyActor::new(ActorCell::new());
        let clone = lazy.clone();
        assert_eq!(lazy.get(), None);
        clone.cell().fill(Actor::new("alice"));
        assert_eq!(clone.get(), None);
    }

    #[test]
    fn display_prefers_id_with_optional_label() {
        assert_eq!(Actor::new("svc-backup").to_string(), "svc-backup");
        assert_eq!(
            Actor::named("u-17", "Alice Example").to_string(),
            "u-17 (Alice Example)"
        );
    }
}
