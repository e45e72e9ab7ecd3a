//! Declarative registration by variant matching.
//!
//! ```
//! use relay_bridge::BridgeEngine;
//!
//! #[derive(Debug)]
//! enum Auth { LoggedIn { user: String }, LoggedOut }
//! #[derive(Debug, Clone, PartialEq)]
//! enum Feed { Load(String), Clear }
//! struct App { online: bool }
//!
//! let mut engine: BridgeEngine<Auth, Feed, App> = BridgeEngine::new();
//! engine
//!     .on(|a| match a { Auth::LoggedIn { user } => Some(user.clone()), _ => None })
//!     .when(|app| app.online)
//!     .map(Feed::Load)
//!     .on(|a| matches!(a, Auth::LoggedOut).then_some(()))
//!     .emit(Feed::Clear);
//! assert_eq!(engine.len(), 2);
//! ```
//!
//! Every route resolves to an ordinary transform/predicate record.

use std::sync::Arc;

use crate::engine::BridgeEngine;
use crate::record::{
    action_transform, always, predicate, state_transform, BridgeRecord, PredicateFn, Transform,
};
use crate::source::ActionSource;

type Extract<In, P> = Arc<dyn Fn(&In) -> Option<P> + Send + Sync>;

/// A pending registration: the payload extractor plus an optional gate.
/// Finished by one of `emit`, `map`, `filter_map` or `map_with_state`.
#[must_use = "a route registers nothing until it is finished with emit/map/filter_map"]
pub struct Route<'e, In, Out, S, P> {
    engine: &'e mut BridgeEngine<In, Out, S>,
    extract: Extract<In, P>,
    gate: Option<PredicateFn<In, S>>,
    origin: ActionSource,
}

impl<In, Out, S> BridgeEngine<In, Out, S>
where
    In: 'static,
    Out: 'static,
    S: 'static,
{
    /// Start a route on the actions `extract` matches. The declaration site
    /// defaults to the caller's location.
    #[track_caller]
    pub fn on<P, X>(&mut self, extract: X) -> Route<'_, In, Out, S, P>
    where
        X: Fn(&In) -> Option<P> + Send + Sync + 'static,
    {
        Route {
            engine: self,
            extract: Arc::new(extract),
            gate: None,
            origin: ActionSource::caller(),
        }
    }
}

impl<'e, In, Out, S, P> Route<'e, In, Out, S, P>
where
    In: 'static,
    Out: 'static,
    S: 'static,
    P: 'static,
{
    pub fn at(mut self, origin: ActionSource) -> Self {
        self.origin = origin;
        self
    }

    /// Only fire while `check` holds for the post-reduction state.
    /// Repeated calls are and-ed.
    pub fn when<F>(self, check: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        self.when_action(move |state, _| check(state))
    }

    pub fn when_action<F>(mut self, check: F) -> Self
    where
        F: Fn(&S, &In) -> bool + Send + Sync + 'static,
    {
        self.gate = Some(match self.gate.take() {
            Some(previous) => predicate::<In, S, _>(move |state, action| {
                previous(state, action) && check(state.get(), action)
            }),
            None => predicate::<In, S, _>(move |state, action| check(state.get(), action)),
        });
        self
    }

    /// Dispatch a constant action on every match.
    pub fn emit(self, out: Out) -> &'e mut BridgeEngine<In, Out, S>
    where
        Out: Clone + Send + Sync,
    {
        let extract = Arc::clone(&self.extract);
        let transform = action_transform::<In, Out, _>(move |action| {
            extract(action).map(|_| out.clone())
        });
        self.finish(Transform::Action(transform))
    }

    /// Derive the dispatched action from the matched payload.
    pub fn map<F>(self, derive: F) -> &'e mut BridgeEngine<In, Out, S>
    where
        F: Fn(P) -> Out + Send + Sync + 'static,
    {
        self.filter_map(move |payload| Some(derive(payload)))
    }

    pub fn filter_map<F>(self, derive: F) -> &'e mut BridgeEngine<In, Out, S>
    where
        F: Fn(P) -> Option<Out> + Send + Sync + 'static,
    {
        let extract = Arc::clone(&self.extract);
        let transform =
            action_transform::<In, Out, _>(move |action| extract(action).and_then(&derive));
        self.finish(Transform::Action(transform))
    }

    /// Derive from the payload and the post-reduction state.
    pub fn map_with_state<F>(self, derive: F) -> &'e mut BridgeEngine<In, Out, S>
    where
        F: Fn(P, &S) -> Option<Out> + Send + Sync + 'static,
    {
        let extract = Arc::clone(&self.extract);
        let transform = state_transform::<In, Out, S, _>(move |action, state| {
            extract(action).and_then(|payload| derive(payload, state.get()))
        });
        self.finish(Transform::WithState(transform))
    }

    fn finish(self, transform: Transform<In, Out, S>) -> &'e mut BridgeEngine<In, Out, S> {
        let gate = self.gate.unwrap_or_else(always);
        self.engine
            .add(BridgeRecord::new(transform, gate, self.origin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateAccessor;

    #[derive(Debug, Clone, PartialEq)]
    enum Counter {
        Incremented(i32),
        Reset,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Audit {
        Logged(String),
        Wiped,
    }

    struct State {
        total: i32,
        auditing: bool,
    }

    fn incremented(action: &Counter) -> Option<i32> {
        match action {
            Counter::Incremented(by) => Some(*by),
            _ => None,
        }
    }

    fn run(engine: &BridgeEngine<Counter, Audit, State>, action: Counter, state: State) -> Vec<Audit> {
        let source = ActionSource::new("app.rs", "main", 1);
        engine
            .evaluate(&action, &source, &StateAccessor::fixed(&state))
            .into_iter()
            .map(|(out, _)| out)
            .collect()
    }

    #[test]
    fn emit_constant_on_match() {
        let mut engine: BridgeEngine<Counter, Audit, State> = BridgeEngine::new();
        engine
            .on(|a| matches!(a, Counter::Reset).then_some(()))
            .emit(Audit::Wiped);

        let state = || State { total: 0, auditing: true };
        assert_eq!(run(&engine, Counter::Reset, state()), vec![Audit::Wiped]);
        assert!(run(&engine, Counter::Incremented(1), state()).is_empty());
    }

    #[test]
    fn map_payload_behind_boolean_gate() {
        let mut engine: BridgeEngine<Counter, Audit, State> = BridgeEngine::new();
        engine
            .on(incremented)
            .when(|s: &State| s.auditing)
            .map(|by| Audit::Logged(format!("+{by}")));

        let on = State { total: 0, auditing: true };
        let off = State { total: 0, auditing: false };
        assert_eq!(
            run(&engine, Counter::Incremented(2), on),
            vec![Audit::Logged("+2".into())]
        );
        assert!(run(&engine, Counter::Incremented(2), off).is_empty());
    }

    #[test]
    fn gates_are_anded() {
        let mut engine: BridgeEngine<Counter, Audit, State> = BridgeEngine::new();
        engine
            .on(incremented)
            .when(|s: &State| s.auditing)
            .when_action(|s: &State, a: &Counter| s.total > 0 && *a != Counter::Reset)
            .emit(Audit::Wiped);

        let zero = State { total: 0, auditing: true };
        let some = State { total: 3, auditing: true };
        assert!(run(&engine, Counter::Incremented(1), zero).is_empty());
        assert_eq!(run(&engine, Counter::Incremented(1), some), vec![Audit::Wiped]);
    }

    #[test]
    fn map_with_state_reads_post_reduction_state() {
        let mut engine: BridgeEngine<Counter, Audit, State> = BridgeEngine::new();
        engine
            .on(incremented)
            .map_with_state(|_, s: &State| Some(Audit::Logged(format!("total={}", s.total))));

        let state = State { total: 10, auditing: false };
        assert_eq!(
            run(&engine, Counter::Incremented(5), state),
            vec![Audit::Logged("total=10".into())]
        );
    }

    #[test]
    fn origin_defaults_to_call_site_and_can_be_overridden() {
        let mut engine: BridgeEngine<Counter, Audit, State> = BridgeEngine::new();
        engine.on(incremented).emit(Audit::Wiped);
        engine
            .on(incremented)
            .at(ActionSource::new("wiring.rs", "audit", 3))
            .emit(Audit::Wiped);

        let origins: Vec<&ActionSource> = engine.registry().iter().map(|r| r.origin()).collect();
        assert!(origins[0].file.ends_with("matching.rs"));
        assert_eq!(origins[1], &ActionSource::new("wiring.rs", "audit", 3));
    }

    #[test]
    fn filter_map_can_decline() {
        let mut engine: BridgeEngine<Counter, Audit, State> = BridgeEngine::new();
        engine
            .on(incremented)
            .filter_map(|by| (by > 0).then(|| Audit::Logged(by.to_string())));

        let state = || State { total: 0, auditing: false };
        assert!(run(&engine, Counter::Incremented(-1), state()).is_empty());
        assert_eq!(
            run(&engine, Counter::Incremented(4), state()),
            vec![Audit::Logged("4".into())]
        );
    }
}
