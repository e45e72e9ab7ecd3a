//! A single routing rule.

use std::fmt;
use std::sync::Arc;

use crate::source::ActionSource;
use crate::state::StateAccessor;

/// Maps an action to a derived action, reading state only if it needs to.
pub type StateTransformFn<In, Out, S> =
    Arc<dyn Fn(&In, &StateAccessor<'_, S>) -> Option<Out> + Send + Sync>;

/// Maps an action to a derived action without looking at state.
pub type ActionTransformFn<In, Out> = Arc<dyn Fn(&In) -> Option<Out> + Send + Sync>;

/// Gate evaluated against post-reduction state.
pub type PredicateFn<In, S> = Arc<dyn Fn(&StateAccessor<'_, S>, &In) -> bool + Send + Sync>;

pub fn state_transform<In, Out, S, F>(f: F) -> StateTransformFn<In, Out, S>
where
    F: Fn(&In, &StateAccessor<'_, S>) -> Option<Out> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn action_transform<In, Out, F>(f: F) -> ActionTransformFn<In, Out>
where
    F: Fn(&In) -> Option<Out> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn predicate<In, S, F>(f: F) -> PredicateFn<In, S>
where
    F: Fn(&StateAccessor<'_, S>, &In) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn always<In, S>() -> PredicateFn<In, S> {
    predicate::<In, S, _>(|_, _| true)
}

/// The transform half of a record.
///
/// Both shapes exist so the collection lifter can tell whether a rule ever
/// looks at state; see `lift` for how each one is carried over.
pub enum Transform<In, Out, S> {
    Action(ActionTransformFn<In, Out>),
    WithState(StateTransformFn<In, Out, S>),
}

impl<In, Out, S> Transform<In, Out, S> {
    pub fn apply(&self, action: &In, state: &StateAccessor<'_, S>) -> Option<Out> {
        match self {
            Transform::Action(f) => f(action),
            Transform::WithState(f) => f(action, state),
        }
    }

    pub fn reads_state(&self) -> bool {
        matches!(self, Transform::WithState(_))
    }
}

impl<In, Out, S> Clone for Transform<In, Out, S> {
    fn clone(&self) -> Self {
        match self {
            Transform::Action(f) => Transform::Action(Arc::clone(f)),
            Transform::WithState(f) => Transform::WithState(Arc::clone(f)),
        }
    }
}

/// Immutable description of one bridge: transform, predicate, and where it
/// was declared.
pub struct BridgeRecord<In, Out, S> {
    transform: Transform<In, Out, S>,
    predicate: PredicateFn<In, S>,
    origin: ActionSource,
}

impl<In, Out, S> BridgeRecord<In, Out, S> {
    pub fn new(
        transform: Transform<In, Out, S>,
        predicate: PredicateFn<In, S>,
        origin: ActionSource,
    ) -> Self {
        Self {
            transform,
            predicate,
            origin,
        }
    }

    pub fn with_state<F>(transform: F, origin: ActionSource) -> Self
    where
        F: Fn(&In, &StateAccessor<'_, S>) -> Option<Out> + Send + Sync + 'static,
    {
        Self::new(
            Transform::WithState(state_transform(transform)),
            always(),
            origin,
        )
    }

    pub fn stateless<F>(transform: F, origin: ActionSource) -> Self
    where
        F: Fn(&In) -> Option<Out> + Send + Sync + 'static,
    {
        Self::new(Transform::Action(action_transform(transform)), always(), origin)
    }

    /// Replace the predicate. Records are built once, so this consumes.
    pub fn gated<P>(mut self, gate: P) -> Self
    where
        P: Fn(&StateAccessor<'_, S>, &In) -> bool + Send + Sync + 'static,
    {
        self.predicate = predicate(gate);
        self
    }

    pub fn transform(&self) -> &Transform<In, Out, S> {
        &self.transform
    }

    pub fn predicate(&self) -> &PredicateFn<In, S> {
        &self.predicate
    }

    pub fn origin(&self) -> &ActionSource {
        &self.origin
    }

    /// Predicate first; the transform only runs once the gate is open.
    pub fn evaluate(&self, action: &In, state: &StateAccessor<'_, S>) -> Option<Out> {
        if !(self.predicate)(state, action) {
            return None;
        }
        self.transform.apply(action, state)
    }
}

impl<In, Out, S> Clone for BridgeRecord<In, Out, S> {
    fn clone(&self) -> Self {
        Self {
            transform: self.transform.clone(),
            predicate: Arc::clone(&self.predicate),
            origin: self.origin.clone(),
        }
    }
}

impl<In, Out, S> fmt::Debug for BridgeRecord<In, Out, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeRecord")
            .field("origin", &self.origin)
            .field("reads_state", &self.transform.reads_state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn origin() -> ActionSource {
        ActionSource::new("bridges.rs", "wire", 1)
    }

    #[test]
    fn closed_gate_skips_transform() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let record: BridgeRecord<u8, u8, bool> = BridgeRecord::stateless(
            move |a: &u8| {
                seen.fetch_add(1, Ordering::SeqCst);
                Some(a + 1)
            },
            origin(),
        )
        .gated(|state, _| *state.get());

        let closed = false;
        assert_eq!(record.evaluate(&1, &StateAccessor::fixed(&closed)), None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let open = true;
        assert_eq!(record.evaluate(&1, &StateAccessor::fixed(&open)), Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn state_transform_sees_state() {
        let record: BridgeRecord<u32, u32, u32> =
            BridgeRecord::with_state(|a, state| Some(a * state.get()), origin());

        let factor = 3;
        assert_eq!(record.evaluate(&5, &StateAccessor::fixed(&factor)), Some(15));
        assert!(record.transform().reads_state());
    }

    #[test]
    fn clone_shares_functions_and_origin() {
        let record: BridgeRecord<u8, u8, ()> = BridgeRecord::stateless(|a| Some(*a), origin());
        let copy = record.clone();

        assert_eq!(copy.origin(), record.origin());
        assert!(Arc::ptr_eq(copy.predicate(), record.predicate()));
    }
}
