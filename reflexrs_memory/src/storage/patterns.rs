use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reflexrs_core::repository::DEFAULT_SEARCH_LIMIT;
use reflexrs_core::{GLOBAL_SPACE, Pattern, PatternFilter, PatternRepo, StoreError, StoreResult};
use reflexrs_entities::patterns;
use sea_orm::sea_query::{Expr, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, TransactionTrait, Value,
};
use tracing::{debug, info};
use uuid::Uuid;

use super::{PatternStore, db_err};
use crate::convert;
use crate::statements::PointQuery;

/// Validate a caller-supplied pattern and fill storage defaults.
pub(super) fn prepare(pattern: &Pattern) -> StoreResult<Pattern> {
    let mut pattern = pattern.clone();
    pattern.validate()?;
    if pattern.id.trim().is_empty() {
        pattern.id = Uuid::now_v7().to_string();
    }
    if pattern.space_id.trim().is_empty() {
        pattern.space_id = GLOBAL_SPACE.to_string();
    }
    Ok(pattern)
}

/// Insert, or overwrite an existing row keeping its `created_at` and any
/// soft-delete marker.
pub(super) async fn upsert(
    txn: &DatabaseTransaction,
    operation: &'static str,
    mut pattern: Pattern,
    now: DateTime<Utc>,
) -> StoreResult<Pattern> {
    let existing = patterns::Entity::find_by_id(pattern.id.clone())
        .one(txn)
        .await
        .map_err(db_err(operation, Some(&pattern.id)))?;

    pattern.updated_at = now;
    let stored = match existing {
        Some(row) => {
            pattern.created_at = row.created_at;
            pattern.deleted_at = row.deleted_at.or(pattern.deleted_at);
            convert::pattern_to_active(&pattern).update(txn).await
        }
        None => convert::pattern_to_active(&pattern).insert(txn).await,
    }
    .map_err(db_err(operation, Some(&pattern.id)))?;

    Ok(convert::pattern_from_model(stored))
}

/// Overwrite a live row. Missing and soft-deleted ids are `NotFound`.
pub(super) async fn overwrite_live(
    txn: &DatabaseTransaction,
    operation: &'static str,
    mut pattern: Pattern,
    now: DateTime<Utc>,
) -> StoreResult<Pattern> {
    let existing = find_live(txn, operation, &pattern.id).await?;

    pattern.created_at = existing.created_at;
    pattern.deleted_at = None;
    pattern.updated_at = now;
    let stored = convert::pattern_to_active(&pattern)
        .update(txn)
        .await
        .map_err(db_err(operation, Some(&pattern.id)))?;

    Ok(convert::pattern_from_model(stored))
}

pub(super) async fn find_live(
    txn: &DatabaseTransaction,
    operation: &'static str,
    id: &str,
) -> StoreResult<patterns::Model> {
    patterns::Entity::find_by_id(id.to_string())
        .filter(patterns::Column::DeletedAt.is_null())
        .one(txn)
        .await
        .map_err(db_err(operation, Some(id)))?
        .ok_or_else(|| StoreError::not_found("pattern", id))
}

/// Mark live rows among `ids` deleted. Returns how many changed.
pub(super) async fn soft_delete(
    txn: &DatabaseTransaction,
    operation: &'static str,
    ids: &[String],
    now: DateTime<Utc>,
) -> StoreResult<u64> {
    let result = patterns::Entity::update_many()
        .col_expr(patterns::Column::DeletedAt, Expr::value(now))
        .col_expr(patterns::Column::UpdatedAt, Expr::value(now))
        .filter(patterns::Column::Id.is_in(ids.iter().cloned()))
        .filter(patterns::Column::DeletedAt.is_null())
        .exec(txn)
        .await
        .map_err(db_err(operation, ids.first().map(String::as_str)))?;
    Ok(result.rows_affected)
}

fn live(filter: &PatternFilter) -> Select<patterns::Entity> {
    let mut query = patterns::Entity::find().filter(patterns::Column::DeletedAt.is_null());
    if let Some(space) = &filter.space_id {
        query = query.filter(patterns::Column::SpaceId.eq(space.as_str()));
    }
    if let Some(project) = &filter.project {
        query = query.filter(patterns::Column::Project.eq(project.as_str()));
    }
    if let Some(min) = filter.min_strength {
        query = query.filter(patterns::Column::Strength.gte(min));
    }
    query
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn limit_value(limit: u64) -> Value {
    Value::from(i64::try_from(limit).unwrap_or(i64::MAX))
}

impl PatternStore {
    #[tracing::instrument(level = "debug", skip(self, pattern), fields(id = %pattern.id))]
    async fn save_one(&self, pattern: &Pattern) -> StoreResult<Pattern> {
        let pattern = prepare(pattern)?;
        let stored = self
            .write_op("save", 1, |now| async move {
                let txn = self.db.begin().await.map_err(db_err("save", None))?;
                let stored = upsert(&txn, "save", pattern, now).await?;
                txn.commit()
                    .await
                    .map_err(db_err("save", Some(&stored.id)))?;
                self.cache_store(&stored);
                Ok(stored)
            })
            .await?;

        info!("Saved pattern {}", stored.id);
        Ok(stored)
    }

    async fn update_one(&self, pattern: &Pattern) -> StoreResult<Pattern> {
        if pattern.id.trim().is_empty() {
            return Err(StoreError::not_found("pattern", ""));
        }
        let pattern = prepare(pattern)?;
        let stored = self
            .write_op("update", 1, |now| async move {
                let txn = self.db.begin().await.map_err(db_err("update", None))?;
                let stored = overwrite_live(&txn, "update", pattern, now).await?;
                txn.commit()
                    .await
                    .map_err(db_err("update", Some(&stored.id)))?;
                self.cache_store(&stored);
                Ok(stored)
            })
            .await?;

        debug!("Updated pattern {}", stored.id);
        Ok(stored)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn delete_one(&self, id: &str) -> StoreResult<()> {
        let ids = [id.to_string()];
        let changed = self
            .write_op("delete", 1, |now| async move {
                let txn = self.db.begin().await.map_err(db_err("delete", Some(id)))?;
                let changed = soft_delete(&txn, "delete", &ids, now).await?;
                txn.commit().await.map_err(db_err("delete", Some(id)))?;
                self.cache_invalidate(id);
                Ok(changed)
            })
            .await?;

        if changed > 0 {
            info!("Deleted pattern {id}");
        }
        Ok(())
    }

    async fn point_query(
        &self,
        operation: &'static str,
        query: PointQuery,
        values: Vec<Value>,
    ) -> StoreResult<Vec<Pattern>> {
        let stmt = self.statements.statement(query, values);
        self.read_op(operation, async {
            let rows = patterns::Entity::find()
                .from_raw_sql(stmt)
                .all(&self.db)
                .await
                .map_err(db_err(operation, None))?;
            Ok(rows.into_iter().map(convert::pattern_from_model).collect())
        })
        .await
    }
}

#[async_trait]
impl PatternRepo for PatternStore {
    async fn save(&self, pattern: &Pattern) -> StoreResult<Pattern> {
        self.save_one(pattern).await
    }

    async fn get(&self, id: &str) -> StoreResult<Pattern> {
        if let Some(hit) = self.cache_lookup(id) {
            return Ok(hit);
        }

        let snapshot = self.cache_snapshot();
        let pattern = self
            .read_op("get", async {
                patterns::Entity::find_by_id(id.to_string())
                    .filter(patterns::Column::DeletedAt.is_null())
                    .one(&self.db)
                    .await
                    .map_err(db_err("get", Some(id)))?
                    .map(convert::pattern_from_model)
                    .ok_or_else(|| StoreError::not_found("pattern", id))
            })
            .await?;

        self.cache_fill(&pattern, snapshot);
        Ok(pattern)
    }

    async fn list(&self, filter: &PatternFilter) -> StoreResult<Vec<Pattern>> {
        self.read_op("list", async {
            let rows = live(filter)
                .order_by_desc(patterns::Column::UpdatedAt)
                .order_by_desc(patterns::Column::Id)
                .limit(filter.limit)
                .offset(filter.offset)
                .all(&self.db)
                .await
                .map_err(db_err("list", None))?;
            Ok(rows.into_iter().map(convert::pattern_from_model).collect())
        })
        .await
    }

    async fn update(&self, pattern: &Pattern) -> StoreResult<Pattern> {
        self.update_one(pattern).await
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.delete_one(id).await
    }

    async fn save_batch(&self, patterns: &[Pattern]) -> StoreResult<Vec<Pattern>> {
        self.save_all(patterns).await
    }

    async fn update_batch(&self, patterns: &[Pattern]) -> StoreResult<Vec<Pattern>> {
        self.update_all(patterns).await
    }

    async fn delete_batch(&self, ids: &[String]) -> StoreResult<()> {
        self.delete_all(ids).await
    }

    async fn search_by_text(
        &self,
        query: &str,
        filter: &PatternFilter,
    ) -> StoreResult<Vec<Pattern>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let like = LikeExpr::new(format!("%{}%", escape_like(query))).escape('\\');
        self.read_op("search_by_text", async {
            let rows = live(filter)
                .filter(
                    Condition::any()
                        .add(patterns::Column::Trigger.like(like.clone()))
                        .add(patterns::Column::Response.like(like)),
                )
                .order_by_desc(patterns::Column::Strength)
                .order_by_desc(patterns::Column::UpdatedAt)
                .limit(filter.limit.unwrap_or(DEFAULT_SEARCH_LIMIT))
                .offset(filter.offset)
                .all(&self.db)
                .await
                .map_err(db_err("search_by_text", None))?;
            Ok(rows.into_iter().map(convert::pattern_from_model).collect())
        })
        .await
    }

    async fn get_by_trigger(&self, trigger: &str) -> StoreResult<Pattern> {
        let trigger = trigger.trim();
        self.point_query(
            "get_by_trigger",
            PointQuery::ByTrigger,
            vec![Value::from(trigger.to_string())],
        )
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| StoreError::not_found("pattern", trigger))
    }

    async fn top_by_strength(&self, limit: u64) -> StoreResult<Vec<Pattern>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.point_query(
            "top_by_strength",
            PointQuery::TopByStrength,
            vec![limit_value(limit)],
        )
        .await
    }

    async fn recently_used(&self, limit: u64) -> StoreResult<Vec<Pattern>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.point_query(
            "recently_used",
            PointQuery::RecentlyUsed,
            vec![limit_value(limit)],
        )
        .await
    }

    async fn count_matching(&self, filter: &PatternFilter) -> StoreResult<u64> {
        self.read_op("count_matching", async {
            live(filter)
                .count(&self.db)
                .await
                .map_err(db_err("count_matching", None))
        })
        .await
    }

    async fn reinforce(&self, id: &str, amount: f64) -> StoreResult<Pattern> {
        self.reinforce_one(id, amount).await
    }

    async fn decay_all(&self, elapsed: Duration) -> StoreResult<u64> {
        self.decay_live(elapsed).await
    }
}
