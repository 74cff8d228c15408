//! Multi-row writes. Each batch runs in one transaction and either fully
//! applies or leaves the store untouched.

use std::collections::HashSet;

use reflexrs_core::{Pattern, StoreError, StoreResult};
use sea_orm::TransactionTrait;
use tracing::info;

use super::patterns::{overwrite_live, prepare, soft_delete, upsert};
use super::{PatternStore, db_err, stamp_offset};

/// Ids per `IN (...)` clause.
const DELETE_CHUNK: usize = 500;

fn ensure_unique<'a>(
    operation: &'static str,
    ids: impl IntoIterator<Item = &'a str>,
) -> StoreResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(StoreError::constraint(
                operation,
                format!("duplicate id {id} in batch"),
            ));
        }
    }
    Ok(())
}

impl PatternStore {
    pub(super) async fn save_all(&self, patterns: &[Pattern]) -> StoreResult<Vec<Pattern>> {
        if patterns.is_empty() {
            return Ok(Vec::new());
        }
        let prepared = patterns.iter().map(prepare).collect::<StoreResult<Vec<_>>>()?;
        ensure_unique("save_batch", prepared.iter().map(|p| p.id.as_str()))?;

        let count = prepared.len();
        let saved = self
            .write_op("save_batch", count, |first| async move {
                let txn = self.db.begin().await.map_err(db_err("save_batch", None))?;
                let mut saved = Vec::with_capacity(count);
                for (i, pattern) in prepared.into_iter().enumerate() {
                    saved.push(upsert(&txn, "save_batch", pattern, first + stamp_offset(i)).await?);
                }
                txn.commit().await.map_err(db_err("save_batch", None))?;
                for pattern in &saved {
                    self.cache_store(pattern);
                }
                Ok(saved)
            })
            .await?;

        info!("Saved batch of {} patterns", saved.len());
        Ok(saved)
    }

    pub(super) async fn update_all(&self, patterns: &[Pattern]) -> StoreResult<Vec<Pattern>> {
        if patterns.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(blank) = patterns.iter().find(|p| p.id.trim().is_empty()) {
            return Err(StoreError::not_found("pattern", blank.id.clone()));
        }
        let prepared = patterns.iter().map(prepare).collect::<StoreResult<Vec<_>>>()?;
        ensure_unique("update_batch", prepared.iter().map(|p| p.id.as_str()))?;

        let count = prepared.len();
        let updated = self
            .write_op("update_batch", count, |first| async move {
                let txn = self.db.begin().await.map_err(db_err("update_batch", None))?;
                let mut updated = Vec::with_capacity(count);
                for (i, pattern) in prepared.into_iter().enumerate() {
                    updated.push(
                        overwrite_live(&txn, "update_batch", pattern, first + stamp_offset(i))
                            .await?,
                    );
                }
                txn.commit().await.map_err(db_err("update_batch", None))?;
                for pattern in &updated {
                    self.cache_store(pattern);
                }
                Ok(updated)
            })
            .await?;

        info!("Updated batch of {} patterns", updated.len());
        Ok(updated)
    }

    pub(super) async fn delete_all(&self, ids: &[String]) -> StoreResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        if ids.iter().any(|id| id.trim().is_empty()) {
            return Err(StoreError::constraint("delete_batch", "empty id in batch"));
        }

        let changed = self
            .write_op("delete_batch", 1, |now| async move {
                let txn = self.db.begin().await.map_err(db_err("delete_batch", None))?;
                let mut changed = 0;
                for chunk in ids.chunks(DELETE_CHUNK) {
                    changed += soft_delete(&txn, "delete_batch", chunk, now).await?;
                }
                txn.commit().await.map_err(db_err("delete_batch", None))?;
                for id in ids {
                    self.cache_invalidate(id);
                }
                Ok(changed)
            })
            .await?;

        info!("Deleted {changed} of {} patterns in batch", ids.len());
        Ok(())
    }
}
