use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The `vehicles` reference table. Owned by the fleet CRUD surface; the
/// dispatch core only performs existence checks against it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vehicles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub plate_number: String,

    pub model: Option<String>,

    /// Slot capacity used by planning; not validated by the dispatch core.
    pub capacity_slots: i32,

    pub active: bool,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::delivery_batch::Entity")]
    DeliveryBatch,
}

impl Related<super::delivery_batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryBatch.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {}
