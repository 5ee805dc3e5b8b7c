//! Query-results cache.
//!
//! Caches the raw row arrays of cacheable selects, keyed by a hash of the
//! SQL and its bound parameter values. Entries remember the tables they read
//! so mutations can invalidate every entry touching a table.
//!
//! # Key Format
//!
//! ```text
//! sha256(json([sql, [param, ...]]))   -> 64 hex chars
//! ```
//!
//! Pagination is rendered as parameters, so offset and limit are part of
//! the key.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Mutex;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::value::SqlValue;

/// Hex digest of the statement text plus its parameter values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn new(sql: &str, params: &[SqlValue]) -> Result<Self, serde_json::Error> {
        let encoded = serde_json::to_vec(&(sql, params))?;
        Ok(QueryKey(format!("{:x}", Sha256::digest(&encoded))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Cached rows shared across sessions.
pub trait QueryResultsCache: Send + Sync {
    fn get(&self, key: &QueryKey) -> Option<Vec<Vec<SqlValue>>>;

    /// Store `rows`, read from `tables`.
    fn put(&self, key: QueryKey, tables: &BTreeSet<String>, rows: Vec<Vec<SqlValue>>);

    /// Drop every entry that read any of `tables`.
    fn invalidate(&self, tables: &BTreeSet<String>);

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
struct CacheEntry {
    tables: BTreeSet<String>,
    rows: Vec<Vec<SqlValue>>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
    /// Insertion order, oldest first.
    order: VecDeque<QueryKey>,
}

/// In-process cache evicting the oldest entry beyond `max_entries`.
#[derive(Debug)]
pub struct InMemoryQueryCache {
    state: Mutex<CacheState>,
    max_entries: usize,
}

impl InMemoryQueryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            max_entries: max_entries.max(1),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl QueryResultsCache for InMemoryQueryCache {
    fn get(&self, key: &QueryKey) -> Option<Vec<Vec<SqlValue>>> {
        let rows = self.state().entries.get(key).map(|e| e.rows.clone());
        debug!(key = key.as_str(), hit = rows.is_some(), "query cache lookup");
        rows
    }

    fn put(&self, key: QueryKey, tables: &BTreeSet<String>, rows: Vec<Vec<SqlValue>>) {
        let mut state = self.state();
        let entry = CacheEntry {
            tables: tables.clone(),
            rows,
        };
        if state.entries.insert(key.clone(), entry).is_none() {
            state.order.push_back(key);
        }
        while state.entries.len() > self.max_entries {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
        }
    }

    fn invalidate(&self, tables: &BTreeSet<String>) {
        let mut state = self.state();
        let before = state.entries.len();
        state
            .entries
            .retain(|_, entry| entry.tables.is_disjoint(tables));
        let CacheState { entries, order } = &mut *state;
        order.retain(|k| entries.contains_key(k));
        debug!(
            tables = ?tables,
            evicted = before - state.entries.len(),
            "query cache invalidated"
        );
    }

    fn clear(&self) {
        let mut state = self.state();
        state.entries.clear();
        state.order.clear();
    }

    fn len(&self) -> usize {
        self.state().entries.len()
    }
}
