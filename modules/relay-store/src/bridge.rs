//! Runs a bridge engine as store middleware.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use async_trait::async_trait;
use relay_bridge::{ActionSource, BindingId, BridgeContext, BridgeEngine};
use tracing::debug;

use crate::store::StoreContext;
use crate::traits::{ActionLike, Middleware};

/// Binds the engine to the store on attach and hands it every reduced
/// action. Derived actions go back through the store's dispatcher.
///
/// Dropping the middleware (i.e. the store) releases its binding, so a shared
/// engine stops routing into a channel nobody drains. A binding made later by
/// another store is left alone.
pub struct BridgeMiddleware<A, S> {
    engine: Arc<BridgeEngine<A, A, S>>,
    binding: Mutex<Option<BindingId>>,
}

impl<A, S> BridgeMiddleware<A, S> {
    pub fn new(engine: BridgeEngine<A, A, S>) -> Self {
        Self::shared(Arc::new(engine))
    }

    /// Attach an engine that is also held elsewhere. If it is attached to
    /// more than one store, the last attach wins.
    pub fn shared(engine: Arc<BridgeEngine<A, A, S>>) -> Self {
        Self {
            engine,
            binding: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &Arc<BridgeEngine<A, A, S>> {
        &self.engine
    }
}

#[async_trait]
impl<A, S> Middleware<A, S> for BridgeMiddleware<A, S>
where
    A: ActionLike,
    S: Send + Sync + 'static,
{
    fn attach(&self, context: &StoreContext<A, S>) {
        let id = self.engine.bind(BridgeContext::new(
            context.state_reader(),
            Arc::new(context.dispatcher()),
        ));
        *self.binding.lock().unwrap_or_else(PoisonError::into_inner) = Some(id);
        debug!(bridges = self.engine.len(), "Bridge engine bound to store");
    }

    /// The engine reads state through its bound reader, which returns the
    /// same post-reduction snapshot as `_state`.
    async fn after_reduce(&self, action: &A, source: &ActionSource, _state: &S) -> Result<()> {
        let dispatched = self.engine.handle(action, source);
        if dispatched > 0 {
            debug!(
                action_type = %action.action_type_str(),
                dispatched, "Bridges fired"
            );
        }
        Ok(())
    }
}

impl<A, S> Drop for BridgeMiddleware<A, S> {
    fn drop(&mut self) {
        let binding = self
            .binding
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(id) = binding {
            self.engine.unbind_if(id);
        }
    }
}
