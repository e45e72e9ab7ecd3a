//! Host store for action bridges.
//!
//! A serial dispatch loop: journal → reduce → middleware → repeat until
//! settled. Middleware run after the reducer and may dispatch further actions
//! through the store's channel; those are processed before `dispatch`
//! returns, and journaled as children of the action that caused them.
//!
//! Consumers define their domain by implementing `Reducer` (pure state
//! updates) and `Middleware`, or by registering bridges on a
//! `relay_bridge::BridgeEngine` and attaching it with `BridgeMiddleware`.

pub mod bridge;
pub mod config;
pub mod error;
pub mod journal;
pub mod store;
pub mod telemetry;
pub mod traits;

pub use bridge::BridgeMiddleware;
pub use config::StoreConfig;
pub use error::StoreError;
pub use journal::{JournalEntry, MemoryJournal, NoJournal};
pub use store::{DispatchReport, Dispatcher, Store, StoreContext};
pub use traits::{ActionJournal, ActionLike, Middleware, Reducer};
