//! Schema bootstrap. Safe to run on every start.

use chrono::Utc;
use reflexrs_core::{GLOBAL_SPACE, Space, StoreError, StoreResult};
use reflexrs_entities::{notes, patterns, spaces};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Schema,
};
use tracing::{debug, info};

use crate::convert;

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_patterns_trigger ON patterns (trigger_text)",
    "CREATE INDEX IF NOT EXISTS idx_patterns_strength ON patterns (strength)",
    "CREATE INDEX IF NOT EXISTS idx_patterns_project_deleted ON patterns (project, deleted_at)",
    "CREATE INDEX IF NOT EXISTS idx_patterns_space ON patterns (space_id)",
    "CREATE INDEX IF NOT EXISTS idx_patterns_updated ON patterns (updated_at)",
    "CREATE INDEX IF NOT EXISTS idx_patterns_last_used ON patterns (last_used_at)",
    "CREATE INDEX IF NOT EXISTS idx_notes_space ON notes (space_id)",
    "CREATE INDEX IF NOT EXISTS idx_notes_pattern ON notes (pattern_id)",
];

fn is_table_already_exists_error(err: &DbErr) -> bool {
    let msg = err.to_string();
    msg.contains("table") && msg.contains("already exists")
}

fn backend(err: DbErr) -> StoreError {
    StoreError::backend("bootstrap", None, err)
}

async fn create_table<E>(db: &DatabaseConnection, entity: E) -> StoreResult<()>
where
    E: EntityTrait,
{
    let table = entity.table_name();
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let stmt = schema.create_table_from_entity(entity);
    match db
        .execute_unprepared(&builder.build(&stmt).to_string())
        .await
    {
        Ok(_) => Ok(()),
        Err(e) if is_table_already_exists_error(&e) => {
            debug!("Table {table} already exists, skipping creation");
            Ok(())
        }
        Err(e) => Err(backend(e)),
    }
}

/// Create tables and indexes, switch to WAL, and seed the default space.
pub async fn bootstrap(db: &DatabaseConnection) -> StoreResult<()> {
    create_table(db, patterns::Entity).await?;
    create_table(db, spaces::Entity).await?;
    create_table(db, notes::Entity).await?;

    for sql in INDEXES {
        db.execute_unprepared(sql).await.map_err(backend)?;
    }

    // In-memory databases report "memory" and stay as they are.
    db.execute_unprepared("PRAGMA journal_mode=WAL")
        .await
        .map_err(backend)?;

    seed_global_space(db).await?;
    info!("Schema ready");
    Ok(())
}

async fn seed_global_space(db: &DatabaseConnection) -> StoreResult<()> {
    if spaces::Entity::find_by_id(GLOBAL_SPACE.to_string())
        .one(db)
        .await
        .map_err(backend)?
        .is_some()
    {
        return Ok(());
    }

    let now = Utc::now();
    let space = Space {
        id: GLOBAL_SPACE.to_string(),
        name: GLOBAL_SPACE.to_string(),
        description: "Default space".to_string(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };
    match convert::space_to_active(&space).insert(db).await {
        Ok(_) => {
            info!("Seeded {GLOBAL_SPACE} space");
            Ok(())
        }
        // Another process seeded it between the check and the insert.
        Err(e) if e.to_string().contains("UNIQUE") => Ok(()),
        Err(e) => Err(backend(e)),
    }
}
