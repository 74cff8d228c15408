use std::time::Duration;

use reflexrs_core::{Pattern, StoreResult};
use reflexrs_entities::patterns;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use tracing::{debug, info};

use super::patterns::find_live;
use super::{PatternStore, db_err};
use crate::convert;

impl PatternStore {
    #[tracing::instrument(level = "debug", skip(self))]
    pub(super) async fn reinforce_one(&self, id: &str, amount: f64) -> StoreResult<Pattern> {
        let stored = self
            .write_op("reinforce", 1, |now| async move {
                let txn = self.db.begin().await.map_err(db_err("reinforce", Some(id)))?;
                let mut pattern = convert::pattern_from_model(find_live(&txn, "reinforce", id).await?);
                pattern.reinforce(amount);
                pattern.updated_at = now;

                let model = patterns::ActiveModel {
                    id: Set(pattern.id.clone()),
                    strength: Set(pattern.strength),
                    reinforce_count: Set(pattern.reinforce_count),
                    last_used_at: Set(pattern.last_used_at),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .update(&txn)
                .await
                .map_err(db_err("reinforce", Some(id)))?;
                txn.commit().await.map_err(db_err("reinforce", Some(id)))?;
                let stored = convert::pattern_from_model(model);
                self.cache_store(&stored);
                Ok(stored)
            })
            .await?;

        debug!(
            "Reinforced pattern {} to {:.1} ({} times)",
            stored.id, stored.strength, stored.reinforce_count
        );
        Ok(stored)
    }

    /// Apply `elapsed` worth of decay to every live, decay-enabled pattern in
    /// one transaction.
    pub(super) async fn decay_live(&self, elapsed: Duration) -> StoreResult<u64> {
        if elapsed.is_zero() {
            return Ok(0);
        }

        let decayed = self
            .write_op("decay_all", 1, |now| async move {
                let txn = self.db.begin().await.map_err(db_err("decay_all", None))?;
                let rows = patterns::Entity::find()
                    .filter(patterns::Column::DeletedAt.is_null())
                    .filter(patterns::Column::DecayEnabled.eq(true))
                    .all(&txn)
                    .await
                    .map_err(db_err("decay_all", None))?;

                let mut decayed = Vec::new();
                for row in rows {
                    let mut pattern = convert::pattern_from_model(row);
                    if !pattern.apply_decay(elapsed) {
                        continue;
                    }
                    patterns::ActiveModel {
                        id: Set(pattern.id.clone()),
                        strength: Set(pattern.strength),
                        decay_count: Set(pattern.decay_count),
                        updated_at: Set(now),
                        ..Default::default()
                    }
                    .update(&txn)
                    .await
                    .map_err(db_err("decay_all", Some(&pattern.id)))?;
                    decayed.push(pattern.id);
                }
                txn.commit().await.map_err(db_err("decay_all", None))?;
                for id in &decayed {
                    self.cache_invalidate(id);
                }
                Ok(decayed)
            })
            .await?;

        info!(
            "Decayed {} patterns over {:.1}h",
            decayed.len(),
            elapsed.as_secs_f64() / 3600.0
        );
        Ok(decayed.len() as u64)
    }
}
