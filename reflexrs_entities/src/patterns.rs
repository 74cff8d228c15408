use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "patterns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(column_name = "trigger_text")]
    pub trigger: String,
    #[sea_orm(column_type = "Text")]
    pub response: String,
    pub strength: f64,
    pub threshold: f64,
    pub decay_rate: f64,
    pub decay_enabled: bool,
    pub reinforce_count: i64,
    pub decay_count: i64,
    pub last_used_at: Option<DateTimeUtc>,
    pub project: String,
    pub tags: Json,
    pub connections: Json,
    pub space_id: String,
    pub user_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
