use async_trait::async_trait;
use reflexrs_core::{GLOBAL_SPACE, Note, NoteRepo, Space, SpaceRepo, StoreError, StoreResult};
use reflexrs_entities::{notes, spaces};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::info;

use super::{PatternStore, db_err};
use crate::convert;

#[async_trait]
impl SpaceRepo for PatternStore {
    async fn create_space(&self, space: &Space) -> StoreResult<Space> {
        space.validate()?;
        let mut space = space.clone();
        let stored = self
            .write_op("create_space", 1, |now| async move {
                let txn = self.db.begin().await.map_err(db_err("create_space", None))?;
                let existing = spaces::Entity::find_by_id(space.id.clone())
                    .one(&txn)
                    .await
                    .map_err(db_err("create_space", Some(&space.id)))?;
                if existing.is_some() {
                    return Err(StoreError::constraint(
                        "create_space",
                        format!("space {} already exists", space.id),
                    ));
                }

                space.updated_at = now;
                space.deleted_at = None;
                let model = convert::space_to_active(&space)
                    .insert(&txn)
                    .await
                    .map_err(db_err("create_space", Some(&space.id)))?;
                txn.commit()
                    .await
                    .map_err(db_err("create_space", Some(&space.id)))?;
                Ok(convert::space_from_model(model))
            })
            .await?;

        info!("Created space {} ({})", stored.id, stored.name);
        Ok(stored)
    }

    async fn get_space(&self, id: &str) -> StoreResult<Space> {
        self.read_op("get_space", async {
            spaces::Entity::find_by_id(id.to_string())
                .filter(spaces::Column::DeletedAt.is_null())
                .one(&self.db)
                .await
                .map_err(db_err("get_space", Some(id)))?
                .map(convert::space_from_model)
                .ok_or_else(|| StoreError::not_found("space", id))
        })
        .await
    }

    async fn list_spaces(&self) -> StoreResult<Vec<Space>> {
        self.read_op("list_spaces", async {
            let rows = spaces::Entity::find()
                .filter(spaces::Column::DeletedAt.is_null())
                .order_by_asc(spaces::Column::Name)
                .order_by_asc(spaces::Column::Id)
                .all(&self.db)
                .await
                .map_err(db_err("list_spaces", None))?;
            Ok(rows.into_iter().map(convert::space_from_model).collect())
        })
        .await
    }

    /// Patterns and notes in the space are left in place.
    async fn delete_space(&self, id: &str) -> StoreResult<()> {
        if id == GLOBAL_SPACE {
            return Err(StoreError::constraint(
                "delete_space",
                "the global space cannot be deleted",
            ));
        }
        self.write_op("delete_space", 1, |now| async move {
            spaces::Entity::update_many()
                .col_expr(spaces::Column::DeletedAt, Expr::value(now))
                .col_expr(spaces::Column::UpdatedAt, Expr::value(now))
                .filter(spaces::Column::Id.eq(id))
                .filter(spaces::Column::DeletedAt.is_null())
                .exec(&self.db)
                .await
                .map_err(db_err("delete_space", Some(id)))?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl NoteRepo for PatternStore {
    async fn save_note(&self, note: &Note) -> StoreResult<Note> {
        note.validate()?;
        let mut note = note.clone();
        let stored = self
            .write_op("save_note", 1, |now| async move {
                let txn = self.db.begin().await.map_err(db_err("save_note", None))?;
                let existing = notes::Entity::find_by_id(note.id.clone())
                    .one(&txn)
                    .await
                    .map_err(db_err("save_note", Some(&note.id)))?;

                note.updated_at = now;
                let model = match existing {
                    Some(row) => {
                        note.created_at = row.created_at;
                        note.deleted_at = row.deleted_at.or(note.deleted_at);
                        convert::note_to_active(&note).update(&txn).await
                    }
                    None => convert::note_to_active(&note).insert(&txn).await,
                }
                .map_err(db_err("save_note", Some(&note.id)))?;
                txn.commit()
                    .await
                    .map_err(db_err("save_note", Some(&note.id)))?;
                Ok(convert::note_from_model(model))
            })
            .await?;

        info!("Saved note {}", stored.id);
        Ok(stored)
    }

    async fn get_note(&self, id: &str) -> StoreResult<Note> {
        self.read_op("get_note", async {
            notes::Entity::find_by_id(id.to_string())
                .filter(notes::Column::DeletedAt.is_null())
                .one(&self.db)
                .await
                .map_err(db_err("get_note", Some(id)))?
                .map(convert::note_from_model)
                .ok_or_else(|| StoreError::not_found("note", id))
        })
        .await
    }

    async fn list_notes(&self, space_id: Option<&str>) -> StoreResult<Vec<Note>> {
        self.read_op("list_notes", async {
            let mut query = notes::Entity::find().filter(notes::Column::DeletedAt.is_null());
            if let Some(space) = space_id {
                query = query.filter(notes::Column::SpaceId.eq(space));
            }
            let rows = query
                .order_by_desc(notes::Column::UpdatedAt)
                .order_by_desc(notes::Column::Id)
                .all(&self.db)
                .await
                .map_err(db_err("list_notes", None))?;
            Ok(rows.into_iter().map(convert::note_from_model).collect())
        })
        .await
    }

    async fn delete_note(&self, id: &str) -> StoreResult<()> {
        self.write_op("delete_note", 1, |now| async move {
            notes::Entity::update_many()
                .col_expr(notes::Column::DeletedAt, Expr::value(now))
                .col_expr(notes::Column::UpdatedAt, Expr::value(now))
                .filter(notes::Column::Id.eq(id))
                .filter(notes::Column::DeletedAt.is_null())
                .exec(&self.db)
                .await
                .map_err(db_err("delete_note", Some(id)))?;
            Ok(())
        })
        .await
    }
}
