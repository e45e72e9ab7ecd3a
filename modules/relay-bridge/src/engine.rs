//! The bridge engine: evaluates every record against an incoming action and
//! pushes the derived actions into the host's channel.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace};

use crate::record::BridgeRecord;
use crate::registry::BridgeRegistry;
use crate::source::ActionSource;
use crate::state::{StateAccessor, StateReader};

/// Anything that can accept a derived action for later processing.
///
/// Fire-and-forget: the engine never looks at what happens next.
pub trait ActionSink<A>: Send + Sync {
    fn dispatch(&self, action: A, source: ActionSource);
}

impl<A, T: ActionSink<A> + ?Sized> ActionSink<A> for Arc<T> {
    fn dispatch(&self, action: A, source: ActionSource) {
        (**self).dispatch(action, source)
    }
}

/// Adapts a closure into an [`ActionSink`].
pub struct FnSink<F>(pub F);

impl<A, F> ActionSink<A> for FnSink<F>
where
    F: Fn(A, ActionSource) + Send + Sync,
{
    fn dispatch(&self, action: A, source: ActionSource) {
        (self.0)(action, source)
    }
}

/// What the host supplies before the engine can route anything.
pub struct BridgeContext<Out, S> {
    state: StateReader<S>,
    sink: Arc<dyn ActionSink<Out>>,
}

impl<Out, S> BridgeContext<Out, S> {
    pub fn new(state: StateReader<S>, sink: Arc<dyn ActionSink<Out>>) -> Self {
        Self { state, sink }
    }
}

impl<Out, S> Clone for BridgeContext<Out, S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            sink: Arc::clone(&self.sink),
        }
    }
}

/// Identifies one [`BridgeEngine::bind`] call, so a host can release its own
/// binding without clearing a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

/// Owns a registry of bridges from `In` actions to `Out` actions over state `S`.
///
/// Build it once at startup with the `register*` methods, [`bind`] it to the
/// host, then call [`handle`] after every reduction.
///
/// [`bind`]: BridgeEngine::bind
/// [`handle`]: BridgeEngine::handle
pub struct BridgeEngine<In, Out, S> {
    registry: BridgeRegistry<In, Out, S>,
    binding: RwLock<Option<(BindingId, BridgeContext<Out, S>)>>,
    next_binding: AtomicU64,
    torn_down: AtomicBool,
}

impl<In, Out, S> BridgeEngine<In, Out, S> {
    pub fn new() -> Self {
        Self::from_registry(BridgeRegistry::new())
    }

    pub fn from_registry(registry: BridgeRegistry<In, Out, S>) -> Self {
        Self {
            registry,
            binding: RwLock::new(None),
            next_binding: AtomicU64::new(1),
            torn_down: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &BridgeRegistry<In, Out, S> {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn add(&mut self, record: BridgeRecord<In, Out, S>) -> &mut Self {
        self.registry.add(record);
        self
    }

    /// Register a state-aware transform that always passes its gate.
    pub fn register<T>(&mut self, transform: T, origin: ActionSource) -> &mut Self
    where
        T: Fn(&In, &StateAccessor<'_, S>) -> Option<Out> + Send + Sync + 'static,
    {
        self.add(BridgeRecord::with_state(transform, origin))
    }

    /// Register a state-aware transform behind a post-reduction predicate.
    pub fn register_gated<T, P>(&mut self, transform: T, gate: P, origin: ActionSource) -> &mut Self
    where
        T: Fn(&In, &StateAccessor<'_, S>) -> Option<Out> + Send + Sync + 'static,
        P: Fn(&StateAccessor<'_, S>, &In) -> bool + Send + Sync + 'static,
    {
        self.add(BridgeRecord::with_state(transform, origin).gated(gate))
    }

    /// Register a transform that never reads state.
    pub fn register_action<T>(&mut self, transform: T, origin: ActionSource) -> &mut Self
    where
        T: Fn(&In) -> Option<Out> + Send + Sync + 'static,
    {
        self.add(BridgeRecord::stateless(transform, origin))
    }

    /// Supply the state reader and the dispatch sink. Calling again rebinds;
    /// the last bind wins.
    pub fn bind(&self, context: BridgeContext<Out, S>) -> BindingId {
        let id = BindingId(self.next_binding.fetch_add(1, Ordering::Relaxed));
        *self.binding.write().unwrap_or_else(PoisonError::into_inner) = Some((id, context));
        id
    }

    pub fn unbind(&self) {
        *self.binding.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Unbind only if `id` is still the current binding. Returns whether it was.
    pub fn unbind_if(&self, id: BindingId) -> bool {
        let mut binding = self.binding.write().unwrap_or_else(PoisonError::into_inner);
        let current = binding.as_ref().is_some_and(|(current, _)| *current == id);
        if current {
            *binding = None;
        }
        current
    }

    pub fn is_bound(&self) -> bool {
        self.binding
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Permanently stop routing. Any host code still holding the engine
    /// (e.g. a deferred dispatch) sees `handle` turn into a no-op.
    pub fn teardown(&self) {
        self.torn_down.store(true, Ordering::Release);
        self.unbind();
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }
}

impl<In: Debug, Out, S> BridgeEngine<In, Out, S> {
    /// Evaluate every record in registration order. All matches fire.
    pub fn evaluate(
        &self,
        action: &In,
        source: &ActionSource,
        state: &StateAccessor<'_, S>,
    ) -> Vec<(Out, ActionSource)> {
        let mut derived = Vec::new();
        let mut repr: Option<String> = None;

        for record in &self.registry {
            let Some(out) = record.evaluate(action, state) else {
                continue;
            };

            let repr = repr.get_or_insert_with(|| format!("{action:?}"));
            let origin = record.origin();
            debug!(
                action = repr.as_str(),
                origin.file = origin.file.as_str(),
                origin.function = origin.function.as_str(),
                origin.line = origin.line,
                "Bridged action"
            );
            derived.push((out, source.bridged(repr, origin)));
        }

        derived
    }

    /// Route `action` through the bound context. Returns how many derived
    /// actions were dispatched; 0 when unbound or torn down.
    pub fn handle(&self, action: &In, source: &ActionSource) -> usize {
        if self.is_torn_down() {
            trace!(?action, "Bridge engine torn down, dropping action");
            return 0;
        }

        let context = self
            .binding
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(_, context)| context.clone());
        let Some(context) = context else {
            trace!(?action, "Bridge engine not bound yet, dropping action");
            return 0;
        };

        let read = || (context.state)();
        let state = StateAccessor::lazy(&read);
        let derived = self.evaluate(action, source, &state);

        let count = derived.len();
        for (out, provenance) in derived {
            context.sink.dispatch(out, provenance);
        }
        count
    }
}

impl<In, Out, S> Default for BridgeEngine<In, Out, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<In, Out, S> Debug for BridgeEngine<In, Out, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeEngine")
            .field("records", &self.registry.len())
            .field("bound", &self.is_bound())
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}
