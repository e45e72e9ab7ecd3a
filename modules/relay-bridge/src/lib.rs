//! Action bridges between independently written middleware.
//!
//! A bridge watches one middleware's actions, optionally checks the state the
//! reducer just produced, and dispatches an action another middleware
//! understands. Neither side knows the other's types; only the bridge does.
//!
//! host dispatch → reduce → [`BridgeEngine::handle`] → derived actions back
//! into the host's channel, each tagged with the trigger's [`ActionSource`]
//! plus a trace line naming the bridge.
//!
//! [`lift`] turns an engine written for one list element into an engine over
//! the whole list, addressing elements by stable id.

pub mod engine;
pub mod lift;
pub mod matching;
pub mod record;
pub mod registry;
pub mod source;
pub mod state;

pub use engine::{ActionSink, BindingId, BridgeContext, BridgeEngine, FnSink};
pub use lift::{find_by_id, lift, lift_indexed, ElementIdAction, Identifiable};
pub use matching::Route;
pub use record::{BridgeRecord, PredicateFn, Transform};
pub use registry::BridgeRegistry;
pub use source::ActionSource;
pub use state::{StateAccessor, StateReader};
