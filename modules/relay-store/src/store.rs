//! The dispatch loop.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Result;
use chrono::Utc;
use relay_bridge::{ActionSink, ActionSource, StateReader};
use tokio::sync::{mpsc, Mutex};
use tracing::{trace, warn};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::journal::{JournalEntry, NoJournal};
use crate::traits::{ActionJournal, ActionLike, Middleware, Reducer};

tokio::task_local! {
    /// Seq of the action whose middleware pass is running on this task.
    static PARENT_SEQ: i64;
}

struct Queued<A> {
    action: A,
    source: ActionSource,
    parent_seq: Option<i64>,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Handle onto the store's action channel. Sending never blocks and never
/// fails; actions sent after the store is dropped are discarded.
///
/// Actions sent from inside a middleware pass for action `n` are journaled
/// as children of `n`. The parent is carried by the task running the pass,
/// so sends from other tasks (including tasks spawned by middleware) are
/// journaled as roots.
pub struct Dispatcher<A> {
    sender: mpsc::UnboundedSender<Queued<A>>,
}

impl<A> Dispatcher<A> {
    pub fn send(&self, action: A, source: ActionSource) {
        let queued = Queued {
            action,
            source,
            parent_seq: PARENT_SEQ.try_with(|seq| *seq).ok(),
        };
        if self.sender.send(queued).is_err() {
            trace!("Store dropped, discarding dispatched action");
        }
    }
}

impl<A> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<A: Send> ActionSink<A> for Dispatcher<A> {
    fn dispatch(&self, action: A, source: ActionSource) {
        self.send(action, source)
    }
}

// ---------------------------------------------------------------------------
// StoreContext
// ---------------------------------------------------------------------------

/// What middleware gets at attach time: a lazy state reader and the
/// dispatcher.
pub struct StoreContext<A, S> {
    state: StateReader<S>,
    dispatcher: Dispatcher<A>,
}

impl<A, S> StoreContext<A, S> {
    pub fn state_reader(&self) -> StateReader<S> {
        Arc::clone(&self.state)
    }

    /// Current state snapshot.
    pub fn state(&self) -> Arc<S> {
        (self.state)()
    }

    pub fn dispatcher(&self) -> Dispatcher<A> {
        self.dispatcher.clone()
    }
}

impl<A, S> Clone for StoreContext<A, S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Actions reduced, the dispatched one included.
    pub processed: usize,
}

/// Serial action loop: journal → reduce → middleware → repeat until the
/// channel is empty.
///
/// Middleware (bridges included) always observe the state already updated by
/// the action they are handling, and anything they dispatch is processed
/// before `dispatch` returns, in FIFO order.
pub struct Store<A, S, R, J = NoJournal>
where
    A: ActionLike,
    S: Clone + Send + Sync + 'static,
    R: Reducer<A, S>,
    J: ActionJournal,
{
    reducer: R,
    journal: J,
    middleware: Vec<Arc<dyn Middleware<A, S>>>,
    state: Arc<RwLock<Arc<S>>>,
    dispatcher: Dispatcher<A>,
    queue: Mutex<mpsc::UnboundedReceiver<Queued<A>>>,
    next_seq: AtomicI64,
    config: StoreConfig,
}

impl<A, S, R, J> Store<A, S, R, J>
where
    A: ActionLike,
    S: Clone + Send + Sync + 'static,
    R: Reducer<A, S>,
    J: ActionJournal,
{
    pub fn new(reducer: R, initial: S, journal: J, config: StoreConfig) -> Self {
        config.log();
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            reducer,
            journal,
            middleware: Vec::new(),
            state: Arc::new(RwLock::new(Arc::new(initial))),
            dispatcher: Dispatcher { sender },
            queue: Mutex::new(receiver),
            next_seq: AtomicI64::new(1),
            config,
        }
    }

    /// Append a middleware. Runs after every middleware added before it.
    pub fn with_middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware<A, S> + 'static,
    {
        let middleware: Arc<dyn Middleware<A, S>> = Arc::new(middleware);
        middleware.attach(&self.context());
        self.middleware.push(middleware);
        self
    }

    pub fn context(&self) -> StoreContext<A, S> {
        let state = Arc::clone(&self.state);
        let reader: StateReader<S> =
            Arc::new(move || Arc::clone(&state.read().unwrap_or_else(PoisonError::into_inner)));
        StoreContext {
            state: reader,
            dispatcher: self.dispatcher.clone(),
        }
    }

    pub fn state(&self) -> Arc<S> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn dispatcher(&self) -> Dispatcher<A> {
        self.dispatcher.clone()
    }

    pub fn journal(&self) -> &J {
        &self.journal
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Dispatch an action and process everything it causes.
    ///
    /// Middleware must use their [`Dispatcher`], never call this re-entrantly.
    pub async fn dispatch(&self, action: A, source: ActionSource) -> Result<DispatchReport> {
        self.dispatcher.send(action, source);
        self.drain().await
    }

    /// Process every queued action, including ones sent through a
    /// [`Dispatcher`] outside of `dispatch`.
    ///
    /// A middleware error or the cascade limit aborts the cycle and discards
    /// whatever is still queued.
    pub async fn drain(&self) -> Result<DispatchReport> {
        let mut queue = self.queue.lock().await;
        let mut report = DispatchReport::default();

        while let Ok(queued) = queue.try_recv() {
            if report.processed >= self.config.max_cascade {
                let dropped = 1 + discard(&mut queue);
                warn!(
                    limit = self.config.max_cascade,
                    dropped, "Cascade limit reached, discarding queued actions"
                );
                return Err(StoreError::CascadeLimit {
                    limit: self.config.max_cascade,
                }
                .into());
            }

            if let Err(e) = self.process(queued).await {
                let dropped = discard(&mut queue);
                warn!(error = %e, dropped, "Dispatch cycle aborted");
                return Err(e);
            }
            report.processed += 1;
        }

        Ok(report)
    }

    async fn process(&self, queued: Queued<A>) -> Result<()> {
        let Queued {
            action,
            source,
            parent_seq,
        } = queued;
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);

        // 1. Journal
        let entry = JournalEntry {
            seq,
            ts: Utc::now(),
            action_type: action.action_type_str(),
            parent_seq,
            run_id: self.config.run_id.clone(),
            source: source.clone(),
            payload: action.to_journal_payload(),
        };
        self.journal.record(&entry).await?;

        // 2. Reduce (pure state update)
        let snapshot = self.reduce(&action);

        // 3. Middleware; anything dispatched here is chained off `seq`
        PARENT_SEQ
            .scope(seq, async {
                for middleware in &self.middleware {
                    middleware.after_reduce(&action, &source, &snapshot).await?;
                }
                Ok::<_, anyhow::Error>(())
            })
            .await
    }

    fn reduce(&self, action: &A) -> Arc<S> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        self.reducer.reduce(Arc::make_mut(&mut *state), action);
        Arc::clone(&state)
    }
}

fn discard<A>(queue: &mut mpsc::UnboundedReceiver<Queued<A>>) -> usize {
    let mut dropped = 0;
    while queue.try_recv().is_ok() {
        dropped += 1;
    }
    dropped
}
