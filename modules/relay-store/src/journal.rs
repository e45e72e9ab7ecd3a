//! ActionJournal implementations.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_bridge::ActionSource;
use serde::{Deserialize, Serialize};

use crate::traits::ActionJournal;

/// One processed action, in processing order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: i64,
    pub ts: DateTime<Utc>,
    pub action_type: String,
    /// Sequence number of the action whose processing dispatched this one.
    pub parent_seq: Option<i64>,
    pub run_id: String,
    pub source: ActionSource,
    pub payload: serde_json::Value,
}

// ---------------------------------------------------------------------------
// NoJournal (default, discards)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct NoJournal;

#[async_trait]
impl ActionJournal for NoJournal {
    async fn record(&self, _entry: &JournalEntry) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryJournal (tests, debugging)
// ---------------------------------------------------------------------------

/// In-memory journal. Thread-safe.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    entries: Mutex<Vec<JournalEntry>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded entries (for test assertions).
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Entries dispatched while processing `seq`.
    pub fn children(&self, seq: i64) -> Vec<JournalEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.parent_seq == Some(seq))
            .collect()
    }
}

#[async_trait]
impl ActionJournal for MemoryJournal {
    async fn record(&self, entry: &JournalEntry) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Arc<J> blanket: tests share the journal for assertions
// ---------------------------------------------------------------------------

#[async_trait]
impl<J: ActionJournal + ?Sized> ActionJournal for Arc<J> {
    async fn record(&self, entry: &JournalEntry) -> Result<()> {
        (**self).record(entry).await
    }
}
