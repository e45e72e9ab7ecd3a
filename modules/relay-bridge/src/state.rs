//! Lazy, consistent state views handed to transforms and predicates.

use std::cell::OnceCell;
use std::sync::Arc;

/// Reads the current state snapshot. Supplied by the host at bind time.
pub type StateReader<S> = Arc<dyn Fn() -> Arc<S> + Send + Sync>;

/// A state view for one evaluation pass.
///
/// The underlying reader is called at most once, on first [`get`], and every
/// later call sees that same snapshot.
///
/// [`get`]: StateAccessor::get
pub struct StateAccessor<'a, S> {
    inner: Inner<'a, S>,
}

enum Inner<'a, S> {
    Lazy {
        read: &'a (dyn Fn() -> Arc<S> + 'a),
        snapshot: OnceCell<Arc<S>>,
    },
    Fixed(&'a S),
}

impl<'a, S> StateAccessor<'a, S> {
    pub fn lazy(read: &'a (dyn Fn() -> Arc<S> + 'a)) -> Self {
        Self {
            inner: Inner::Lazy {
                read,
                snapshot: OnceCell::new(),
            },
        }
    }

    /// A view over a value that has already been located.
    pub fn fixed(state: &'a S) -> Self {
        Self {
            inner: Inner::Fixed(state),
        }
    }

    pub fn get(&self) -> &S {
        match &self.inner {
            Inner::Lazy { read, snapshot } => snapshot.get_or_init(|| read()).as_ref(),
            Inner::Fixed(state) => *state,
        }
    }

    /// Whether the state has been read yet.
    pub fn is_loaded(&self) -> bool {
        match &self.inner {
            Inner::Lazy { snapshot, .. } => snapshot.get().is_some(),
            Inner::Fixed(_) => true,
        }
    }
}
