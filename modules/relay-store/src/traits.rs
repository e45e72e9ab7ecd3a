//! Core traits for the store.

use std::fmt::Debug;

use anyhow::Result;
use async_trait::async_trait;
use relay_bridge::ActionSource;

use crate::journal::JournalEntry;
use crate::store::StoreContext;

/// Actions carry a type string and know how to serialize for the journal.
pub trait ActionLike: Clone + Debug + Send + Sync + 'static {
    /// The action type string recorded in the journal.
    fn action_type_str(&self) -> String;

    /// Serialize this action for the journal payload.
    fn to_journal_payload(&self) -> serde_json::Value;
}

/// Pure state updates. No I/O, no side effects.
///
/// Called for every action before any middleware sees it.
pub trait Reducer<A: ActionLike, S>: Send + Sync {
    fn reduce(&self, state: &mut S, action: &A);
}

/// Observes actions after they are reduced. May dispatch further actions
/// through the dispatcher it was handed in [`attach`](Middleware::attach).
#[async_trait]
pub trait Middleware<A: ActionLike, S: Send + Sync>: Send + Sync {
    /// Called once when the middleware is added to a store.
    fn attach(&self, _context: &StoreContext<A, S>) {}

    /// `state` is the snapshot produced by reducing `action`.
    async fn after_reduce(&self, action: &A, source: &ActionSource, state: &S) -> Result<()>;
}

/// Records every action the store processes.
///
/// Implemented by MemoryJournal (tests, debugging) and NoJournal.
/// Also implemented for `Arc<J>` so a journal can be shared for assertions.
#[async_trait]
pub trait ActionJournal: Send + Sync {
    async fn record(&self, entry: &JournalEntry) -> Result<()>;
}
