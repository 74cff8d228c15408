use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::pattern::Pattern;
use crate::types::{Note, Space};

/// Result cap applied to text search when the caller gives no limit.
pub const DEFAULT_SEARCH_LIMIT: u64 = 100;

/// Listing filters. Every field is optional; soft-deleted rows are always
/// excluded regardless of what is set here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternFilter {
    pub space_id: Option<String>,
    pub project: Option<String>,
    pub min_strength: Option<f64>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl PatternFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn space(mut self, space_id: impl Into<String>) -> Self {
        self.space_id = Some(space_id.into());
        self
    }

    #[must_use]
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    #[must_use]
    pub const fn min_strength(mut self, min_strength: f64) -> Self {
        self.min_strength = Some(min_strength);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[async_trait]
pub trait PatternRepo: Send + Sync {
    /// Validate then upsert. Returns the row as stored.
    async fn save(&self, pattern: &Pattern) -> StoreResult<Pattern>;

    async fn get(&self, id: &str) -> StoreResult<Pattern>;

    /// Ordered by `updated_at` descending.
    async fn list(&self, filter: &PatternFilter) -> StoreResult<Vec<Pattern>>;

    /// Full overwrite of a live row. Never resurrects a soft-deleted one.
    async fn update(&self, pattern: &Pattern) -> StoreResult<Pattern>;

    /// Soft delete. Idempotent, and a missing id is not an error.
    async fn delete(&self, id: &str) -> StoreResult<()>;

    async fn save_batch(&self, patterns: &[Pattern]) -> StoreResult<Vec<Pattern>>;

    async fn update_batch(&self, patterns: &[Pattern]) -> StoreResult<Vec<Pattern>>;

    async fn delete_batch(&self, ids: &[String]) -> StoreResult<()>;

    /// Substring match over trigger and response, strongest first.
    async fn search_by_text(&self, query: &str, filter: &PatternFilter)
    -> StoreResult<Vec<Pattern>>;

    async fn get_by_trigger(&self, trigger: &str) -> StoreResult<Pattern>;

    async fn top_by_strength(&self, limit: u64) -> StoreResult<Vec<Pattern>>;

    /// Only patterns that have been reinforced at least once.
    async fn recently_used(&self, limit: u64) -> StoreResult<Vec<Pattern>>;

    async fn count_matching(&self, filter: &PatternFilter) -> StoreResult<u64>;

    /// Load, reinforce and re-persist a live pattern.
    async fn reinforce(&self, id: &str, amount: f64) -> StoreResult<Pattern>;

    /// Decay every live, decay-enabled pattern. Returns how many changed.
    async fn decay_all(&self, elapsed: Duration) -> StoreResult<u64>;
}

#[async_trait]
pub trait SpaceRepo: Send + Sync {
    async fn create_space(&self, space: &Space) -> StoreResult<Space>;

    async fn get_space(&self, id: &str) -> StoreResult<Space>;

    async fn list_spaces(&self) -> StoreResult<Vec<Space>>;

    async fn delete_space(&self, id: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait NoteRepo: Send + Sync {
    async fn save_note(&self, note: &Note) -> StoreResult<Note>;

    async fn get_note(&self, id: &str) -> StoreResult<Note>;

    async fn list_notes(&self, space_id: Option<&str>) -> StoreResult<Vec<Note>>;

    async fn delete_note(&self, id: &str) -> StoreResult<()>;
}

#[async_trait]
impl<T> PatternRepo for std::sync::Arc<T>
where
    T: PatternRepo + ?Sized,
{
    async fn save(&self, pattern: &Pattern) -> StoreResult<Pattern> {
        (**self).save(pattern).await
    }

    async fn get(&self, id: &str) -> StoreResult<Pattern> {
        (**self).get(id).await
    }

    async fn list(&self, filter: &PatternFilter) -> StoreResult<Vec<Pattern>> {
        (**self).list(filter).await
    }

    async fn update(&self, pattern: &Pattern) -> StoreResult<Pattern> {
        (**self).update(pattern).await
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        (**self).delete(id).await
    }

    async fn save_batch(&self, patterns: &[Pattern]) -> StoreResult<Vec<Pattern>> {
        (**self).save_batch(patterns).await
    }

    async fn update_batch(&self, patterns: &[Pattern]) -> StoreResult<Vec<Pattern>> {
        (**self).update_batch(patterns).await
    }

    async fn delete_batch(&self, ids: &[String]) -> StoreResult<()> {
        (**self).delete_batch(ids).await
    }

    async fn search_by_text(
        &self,
        query: &str,
        filter: &PatternFilter,
    ) -> StoreResult<Vec<Pattern>> {
        (**self).search_by_text(query, filter).await
    }

    async fn get_by_trigger(&self, trigger: &str) -> StoreResult<Pattern> {
        (**self).get_by_trigger(trigger).await
    }

    async fn top_by_strength(&self, limit: u64) -> StoreResult<Vec<Pattern>> {
        (**self).top_by_strength(limit).await
    }

    async fn recently_used(&self, limit: u64) -> StoreResult<Vec<Pattern>> {
        (**self).recently_used(limit).await
    }

    async fn count_matching(&self, filter: &PatternFilter) -> StoreResult<u64> {
        (**self).count_matching(filter).await
    }

    async fn reinforce(&self, id: &str, amount: f64) -> StoreResult<Pattern> {
        (**self).reinforce(id, amount).await
    }

    async fn decay_all(&self, elapsed: Duration) -> StoreResult<u64> {
        (**self).decay_all(elapsed).await
    }
}
