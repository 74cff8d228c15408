//! SQLite-backed pattern store.
//!
//! Writes are serialized through a single async writer lock and stamped with
//! strictly increasing `updated_at` values; reads go straight to the
//! connection pool and run concurrently. Every operation is bounded by the
//! configured deadline, and lookups by id go through the optional
//! [`QueryCache`].

mod batch;
mod decay;
mod patterns;
mod spaces;

use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use reflexrs_core::{CacheConfig, Pattern, StoreConfig, StoreError, StoreResult};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, SqlErr};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cache::QueryCache;
use crate::migrate;
use crate::statements::StatementCache;
use crate::stats::{OpCounters, StoreStats};

/// Hands out `updated_at` stamps. Only touched while the writer lock is held.
struct WriteClock {
    last: DateTime<Utc>,
}

impl WriteClock {
    fn new() -> Self {
        Self {
            last: DateTime::<Utc>::MIN_UTC,
        }
    }

    /// Reserve `count` consecutive microsecond stamps and return the first.
    fn reserve(&mut self, count: usize) -> DateTime<Utc> {
        let now = Utc::now().trunc_subsecs(6);
        let first = if now > self.last {
            now
        } else {
            self.last + TimeDelta::microseconds(1)
        };
        self.last = first + stamp_offset(count.max(1) - 1);
        first
    }
}

pub(crate) fn stamp_offset(index: usize) -> TimeDelta {
    TimeDelta::microseconds(i64::try_from(index).unwrap_or(i64::MAX))
}

pub(crate) fn map_db_err(operation: &'static str, id: Option<&str>, err: DbErr) -> StoreError {
    if let Some(SqlErr::UniqueConstraintViolation(reason)) = err.sql_err() {
        return StoreError::constraint(operation, reason);
    }
    StoreError::backend(operation, id, err)
}

pub(crate) fn db_err<'a>(
    operation: &'static str,
    id: Option<&'a str>,
) -> impl FnOnce(DbErr) -> StoreError + 'a {
    move |err| map_db_err(operation, id, err)
}

/// Run `fut`, giving up with [`StoreError::Cancelled`] once `token` fires.
///
/// A write abandoned this way rolls back its transaction.
pub async fn cancellable<T, F>(
    token: &CancellationToken,
    operation: &'static str,
    fut: F,
) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    tokio::select! {
        biased;
        () = token.cancelled() => Err(StoreError::Cancelled { operation }),
        result = fut => result,
    }
}

pub struct PatternStore {
    db: DatabaseConnection,
    writer: Mutex<WriteClock>,
    cache: Option<QueryCache<Pattern>>,
    statements: StatementCache,
    counters: OpCounters,
    op_timeout: Option<Duration>,
}

impl PatternStore {
    /// Connect, bootstrap the schema and build the store.
    pub async fn connect(config: &StoreConfig, cache: &CacheConfig) -> StoreResult<Self> {
        let in_memory = config.url.contains(":memory:") || config.url.contains("mode=memory");
        // Every in-memory connection would get its own empty database.
        let max_connections = if in_memory {
            1
        } else {
            config.max_connections.max(1)
        };

        let mut options = ConnectOptions::new(config.url.clone());
        options
            .max_connections(max_connections)
            .min_connections(config.min_connections.clamp(1, max_connections))
            .sqlx_logging(false);

        info!("Connecting to pattern store");
        let db = Database::connect(options)
            .await
            .map_err(|e| StoreError::backend("connect", None, e))?;
        migrate::bootstrap(&db).await?;

        info!(
            "PatternStore initialized (pool={max_connections}, cache={})",
            if cache.enabled { "on" } else { "off" }
        );
        Ok(Self::with_connection(db, config, cache))
    }

    /// Open (or create) a SQLite file with default pool and cache settings.
    pub async fn open(path: &Path) -> StoreResult<Self> {
        Self::connect(&StoreConfig::sqlite_file(path), &CacheConfig::default()).await
    }

    /// Wrap an already bootstrapped connection.
    #[must_use]
    pub fn with_connection(db: DatabaseConnection, config: &StoreConfig, cache: &CacheConfig) -> Self {
        Self {
            db,
            writer: Mutex::new(WriteClock::new()),
            cache: cache.enabled.then(|| QueryCache::from_config(cache)),
            statements: StatementCache::new(),
            counters: OpCounters::default(),
            op_timeout: config.op_timeout(),
        }
    }

    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    #[must_use]
    pub const fn cache(&self) -> Option<&QueryCache<Pattern>> {
        self.cache.as_ref()
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let statements = self.statements.stats();
        StoreStats {
            read_ops: self.counters.reads(),
            write_ops: self.counters.writes(),
            lock_wait: self.counters.lock_wait(),
            statement_hits: statements.hits,
            statement_misses: statements.misses,
            cache: self.cache.as_ref().map(QueryCache::stats),
        }
    }

    /// Zero the op and statement counters. Cache counters reset with
    /// [`QueryCache::clear`].
    pub fn reset_stats(&self) {
        self.counters.reset();
        self.statements.reset_stats();
    }

    /// Apply the store deadline to `fut`.
    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match self.op_timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
                warn!("{operation} exceeded {}ms deadline", limit.as_millis());
                Err(StoreError::Cancelled { operation })
            }),
            None => fut.await,
        }
    }

    async fn read_op<T, F>(&self, operation: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        self.counters.record_read();
        self.bounded(operation, fut).await
    }

    /// Run `op` while holding the writer lock. `op` receives the first of
    /// `stamps` reserved `updated_at` values, and must update the cache after
    /// commit but before returning so cache order follows commit order.
    async fn write_op<T, F, Fut>(&self, operation: &'static str, stamps: usize, op: F) -> StoreResult<T>
    where
        F: FnOnce(DateTime<Utc>) -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        self.bounded(operation, async {
            let started = Instant::now();
            let mut clock = self.writer.lock().await;
            self.counters.record_write(started.elapsed());
            let first = clock.reserve(stamps);
            let result = op(first).await;
            drop(clock);
            result
        })
        .await
    }

    fn cache_lookup(&self, id: &str) -> Option<Pattern> {
        self.cache.as_ref().and_then(|c| c.get(id))
    }

    fn cache_snapshot(&self) -> u64 {
        self.cache.as_ref().map_or(0, QueryCache::snapshot)
    }

    /// Fill after a backend read, unless a write raced it.
    fn cache_fill(&self, pattern: &Pattern, snapshot: u64) {
        if let Some(cache) = &self.cache {
            cache.set_if_unchanged(pattern.id.clone(), pattern.clone(), snapshot);
        }
    }

    fn cache_store(&self, pattern: &Pattern) {
        if let Some(cache) = &self.cache {
            if pattern.is_deleted() {
                cache.invalidate(&pattern.id);
            } else {
                cache.set(pattern.id.clone(), pattern.clone());
            }
        }
    }

    fn cache_invalidate(&self, id: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_strictly_increasing() {
        let mut clock = WriteClock::new();
        let mut prev = clock.reserve(1);
        for _ in 0..1000 {
            let next = clock.reserve(1);
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn reserved_range_is_not_reused() {
        let mut clock = WriteClock::new();
        let first = clock.reserve(5);
        let after = clock.reserve(1);
        assert!(after > first + stamp_offset(4));
    }

    #[tokio::test]
    async fn cancellable_stops_on_token() {
        let token = CancellationToken::new();
        token.cancel();
        let result: StoreResult<()> = cancellable(&token, "list", std::future::pending()).await;
        assert!(matches!(result, Err(StoreError::Cancelled { operation: "list" })));
    }

    #[tokio::test]
    async fn cancellable_passes_through_result() {
        let token = CancellationToken::new();
        let result = cancellable(&token, "get", async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
