use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The `drivers` reference table. Owned by the fleet CRUD surface; the
/// dispatch core only performs existence checks against it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "drivers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,

    pub license_number: String,

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
