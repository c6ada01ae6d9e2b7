use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::source::Lookup;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SearchSettings {
    pub debounce: Duration,
    pub min_query_len: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(250),
            min_query_len: 2,
        }
    }
}

impl SearchSettings {
    /// Queries shorter than `min_query_len` after trimming clear the results
    /// instead of reaching the catalog.
    pub fn is_too_short(&self, query: &str) -> bool {
        query.trim().chars().count() < self.min_query_len
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome<H> {
    /// The response was the newest and is now the visible result.
    Applied(Vec<H>),
    /// The query was too short; visible results were emptied.
    Cleared,
    /// A newer query arrived before the debounce delay ran out.
    Superseded,
    /// A newer query arrived while this one was in flight.
    Stale,
}

/// The results currently on screen.
#[derive(Debug, Clone)]
pub struct SearchSnapshot<H> {
    pub sequence: u64,
    pub query: String,
    pub hits: Vec<H>,
}

impl<H> Default for SearchSnapshot<H> {
    fn default() -> Self {
        Self {
            sequence: 0,
            query: String::new(),
            hits: Vec::new(),
        }
    }
}

pub struct SearchSession<L: Lookup> {
    lookup: L,
    settings: SearchSettings,
    latest: AtomicU64,
    applied: RwLock<SearchSnapshot<L::Hit>>,
}

impl<L: Lookup> SearchSession<L> {
    pub fn new(lookup: L, settings: SearchSettings) -> Self {
        Self {
            lookup,
            settings,
            latest: AtomicU64::new(0),
            applied: RwLock::new(SearchSnapshot::default()),
        }
    }

    pub fn latest_sequence(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    fn is_latest(&self, sequence: u64) -> bool {
        self.latest_sequence() == sequence
    }

    /// Submits the text currently in the search box. Lookup errors surface
    /// only for the newest query and are not retried.
    pub async fn submit(&self, query: &str) -> anyhow::Result<SearchOutcome<L::Hit>> {
        let sequence = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let query = query.trim();

        if self.settings.is_too_short(query) {
            let mut applied = self.applied.write().await;
            if !self.is_latest(sequence) {
                return Ok(SearchOutcome::Superseded);
            }
            *applied = SearchSnapshot {
                sequence,
                query: query.to_string(),
                hits: Vec::new(),
            };
            return Ok(SearchOutcome::Cleared);
        }

        tokio::time::sleep(self.settings.debounce).await;
        if !self.is_latest(sequence) {
            debug!(sequence, query, "search superseded while debouncing");
            return Ok(SearchOutcome::Superseded);
        }

        let result = self.lookup.lookup(query).await;

        let mut applied = self.applied.write().await;
        if !self.is_latest(sequence) || applied.sequence > sequence {
            debug!(sequence, query, "discarding stale search response");
            return Ok(SearchOutcome::Stale);
        }

        let hits = match result {
            Ok(hits) => hits,
            Err(err) => {
                warn!(sequence, query, "search lookup failed: {err:#}");
                return Err(err);
            }
        };

        *applied = SearchSnapshot {
            sequence,
            query: query.to_string(),
            hits: hits.clone(),
        };
        Ok(SearchOutcome::Applied(hits))
    }

    pub async fn snapshot(&self) -> SearchSnapshot<L::Hit> {
        self.applied.read().await.clone()
    }
}
