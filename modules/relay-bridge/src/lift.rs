//! Lifting a per-element bridge engine to a collection of identified elements.
//!
//! An engine written against one list item's actions and state is turned
//! into an engine over the whole list by three projections: pull an
//! `ElementIdAction` out of a collection action, put one back, and expose the
//! elements held in collection state. Bridges are never re-declared.
//!
//! Note the asymmetry between predicate and transform. Only the predicate is
//! threaded the element's own state; a stateless transform is lifted without
//! touching state at all. `BridgeRecord::with_state` transforms are an
//! extension on top of that: they are handed the element located by id and
//! yield nothing when it is missing, doing their own lookup independent of
//! the predicate's. The predicate/stateless-transform split is kept as is.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::BridgeEngine;
use crate::record::{
    action_transform, predicate, state_transform, BridgeRecord, PredicateFn, Transform,
};
use crate::registry::BridgeRegistry;
use crate::state::StateAccessor;

/// Stable identity of a collection element. Not an index.
pub trait Identifiable {
    type Id: PartialEq;

    fn id(&self) -> Self::Id;
}

/// An element-scoped action tagged with the element it targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementIdAction<Id, A> {
    pub id: Id,
    pub action: A,
}

impl<Id, A> ElementIdAction<Id, A> {
    pub fn new(id: Id, action: A) -> Self {
        Self { id, action }
    }
}

type Extract<CIn, Id, EIn> = Arc<dyn Fn(&CIn) -> Option<ElementIdAction<Id, EIn>> + Send + Sync>;
type Embed<Id, EOut, COut> = Arc<dyn Fn(ElementIdAction<Id, EOut>) -> COut + Send + Sync>;
type Locate<CS, ES, Id> = Arc<dyn for<'s> Fn(&'s CS, &Id) -> Option<&'s ES> + Send + Sync>;

fn locator<CS, ES, Id, F>(f: F) -> Locate<CS, ES, Id>
where
    F: for<'s> Fn(&'s CS, &Id) -> Option<&'s ES> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// First element in scan order whose id equals `id`.
pub fn find_by_id<'s, E: Identifiable>(elements: &'s [E], id: &E::Id) -> Option<&'s E> {
    elements.iter().find(|element| element.id() == *id)
}

/// Lift `element` into an engine over collection actions and state.
///
/// Records are copied at call time; registering more bridges on `element`
/// afterwards does not affect the returned engine. Element lookup is a linear
/// scan of `extract_state`; see [`lift_indexed`] for a custom lookup.
pub fn lift<EIn, EOut, ES, CIn, COut, CS, X, E, L>(
    element: &BridgeEngine<EIn, EOut, ES>,
    extract_action: X,
    embed_action: E,
    extract_state: L,
) -> BridgeEngine<CIn, COut, CS>
where
    EIn: 'static,
    EOut: 'static,
    ES: Identifiable + 'static,
    ES::Id: 'static,
    CIn: 'static,
    COut: 'static,
    CS: 'static,
    X: Fn(&CIn) -> Option<ElementIdAction<ES::Id, EIn>> + Send + Sync + 'static,
    E: Fn(ElementIdAction<ES::Id, EOut>) -> COut + Send + Sync + 'static,
    L: Fn(&CS) -> &[ES] + Send + Sync + 'static,
{
    let locate =
        locator::<CS, ES, ES::Id, _>(move |state, id| find_by_id(extract_state(state), id));
    lift_with(element, Arc::new(extract_action), Arc::new(embed_action), locate)
}

/// Like [`lift`], with a caller-supplied lookup from collection state and id
/// to the element (e.g. a map keyed by id).
pub fn lift_indexed<EIn, EOut, ES, CIn, COut, CS, Id, X, E, L>(
    element: &BridgeEngine<EIn, EOut, ES>,
    extract_action: X,
    embed_action: E,
    lookup: L,
) -> BridgeEngine<CIn, COut, CS>
where
    EIn: 'static,
    EOut: 'static,
    ES: 'static,
    Id: 'static,
    CIn: 'static,
    COut: 'static,
    CS: 'static,
    X: Fn(&CIn) -> Option<ElementIdAction<Id, EIn>> + Send + Sync + 'static,
    E: Fn(ElementIdAction<Id, EOut>) -> COut + Send + Sync + 'static,
    L: for<'s> Fn(&'s CS, &Id) -> Option<&'s ES> + Send + Sync + 'static,
{
    lift_with(
        element,
        Arc::new(extract_action),
        Arc::new(embed_action),
        locator::<CS, ES, Id, _>(lookup),
    )
}

fn lift_with<EIn, EOut, ES, CIn, COut, CS, Id>(
    element: &BridgeEngine<EIn, EOut, ES>,
    extract: Extract<CIn, Id, EIn>,
    embed: Embed<Id, EOut, COut>,
    locate: Locate<CS, ES, Id>,
) -> BridgeEngine<CIn, COut, CS>
where
    EIn: 'static,
    EOut: 'static,
    ES: 'static,
    Id: 'static,
    CIn: 'static,
    COut: 'static,
    CS: 'static,
{
    let registry: BridgeRegistry<CIn, COut, CS> = element
        .registry()
        .iter()
        .map(|record| lift_record(record, &extract, &embed, &locate))
        .collect();

    BridgeEngine::from_registry(registry)
}

fn lift_record<EIn, EOut, ES, CIn, COut, CS, Id>(
    record: &BridgeRecord<EIn, EOut, ES>,
    extract: &Extract<CIn, Id, EIn>,
    embed: &Embed<Id, EOut, COut>,
    locate: &Locate<CS, ES, Id>,
) -> BridgeRecord<CIn, COut, CS>
where
    EIn: 'static,
    EOut: 'static,
    ES: 'static,
    Id: 'static,
    CIn: 'static,
    COut: 'static,
    CS: 'static,
{
    let transform = match record.transform().clone() {
        Transform::Action(inner) => {
            let (extract, embed) = (Arc::clone(extract), Arc::clone(embed));
            Transform::Action(action_transform::<CIn, COut, _>(move |action| {
                let ElementIdAction { id, action } = extract(action)?;
                let out = inner(&action)?;
                Some(embed(ElementIdAction::new(id, out)))
            }))
        }
        Transform::WithState(inner) => {
            let (extract, embed, locate) =
                (Arc::clone(extract), Arc::clone(embed), Arc::clone(locate));
            Transform::WithState(state_transform::<CIn, COut, CS, _>(move |action, state| {
                let ElementIdAction { id, action } = extract(action)?;
                let element = locate(state.get(), &id)?;
                let out = inner(&action, &StateAccessor::fixed(element))?;
                Some(embed(ElementIdAction::new(id, out)))
            }))
        }
    };

    let gate = lift_predicate(Arc::clone(record.predicate()), extract, locate);

    BridgeRecord::new(transform, gate, record.origin().clone())
}

fn lift_predicate<EIn, ES, CIn, CS, Id>(
    inner: PredicateFn<EIn, ES>,
    extract: &Extract<CIn, Id, EIn>,
    locate: &Locate<CS, ES, Id>,
) -> PredicateFn<CIn, CS>
where
    EIn: 'static,
    ES: 'static,
    Id: 'static,
    CIn: 'static,
    CS: 'static,
{
    let (extract, locate) = (Arc::clone(extract), Arc::clone(locate));
    predicate::<CIn, CS, _>(move |state, action| {
        let Some(ElementIdAction { id, action }) = extract(action) else {
            return false;
        };
        let Some(element) = locate(state.get(), &id) else {
            return false;
        };
        inner(&StateAccessor::fixed(element), &action)
    })
}
