//! Rendered SQL for the hot point queries, built once per store.
//!
//! Keeping the text byte-identical across calls lets the driver reuse its
//! per-connection prepared statement.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use sea_orm::{DbBackend, Statement, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointQuery {
    /// Newest live row with an exact trigger.
    ByTrigger,
    /// Live rows, strongest first.
    TopByStrength,
    /// Live rows that have fired, most recent first.
    RecentlyUsed,
}

impl PointQuery {
    fn render(self) -> String {
        let tail = match self {
            Self::ByTrigger => "AND trigger_text = ? ORDER BY updated_at DESC, id DESC LIMIT 1",
            Self::TopByStrength => "ORDER BY strength DESC, updated_at DESC, id DESC LIMIT ?",
            Self::RecentlyUsed => {
                "AND last_used_at IS NOT NULL ORDER BY last_used_at DESC, id DESC LIMIT ?"
            }
        };
        format!("SELECT * FROM patterns WHERE deleted_at IS NULL {tail}")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatementStats {
    pub hits: u64,
    pub misses: u64,
    pub prepared: usize,
}

#[derive(Default)]
pub struct StatementCache {
    entries: RwLock<HashMap<PointQuery, Arc<str>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl StatementCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// SQL text for `query`, rendered on first use.
    pub fn sql(&self, query: PointQuery) -> Arc<str> {
        if let Some(sql) = self.entries.read().get(&query) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(sql);
        }

        let mut entries = self.entries.write();
        if let Some(sql) = entries.get(&query) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(sql);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let sql: Arc<str> = query.render().into();
        entries.insert(query, Arc::clone(&sql));
        sql
    }

    pub fn statement<I>(&self, query: PointQuery, values: I) -> Statement
    where
        I: IntoIterator<Item = Value>,
    {
        Statement::from_sql_and_values(DbBackend::Sqlite, self.sql(query).as_ref(), values)
    }

    pub fn stats(&self) -> StatementStats {
        StatementStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            prepared: self.entries.read().len(),
        }
    }

    pub fn reset_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}
