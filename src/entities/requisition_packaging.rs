use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The `requisition_packaging` table: the computed packaging result for one
/// requisition.
///
/// `requisition_id` carries a unique index. That constraint is the correctness
/// mechanism against concurrent double-computation: only one caller can insert
/// the row, every competitor surfaces `AlreadyComputed`. Once `is_final` is
/// set the row is write-once; the service refuses further mutation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "requisition_packaging")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub requisition_id: Uuid,

    /// Continuous slot demand accumulated over all line items.
    pub total_slot_demand: Decimal,

    /// `ceil(total_slot_demand)`, the whole-slot count used for planning.
    pub rounded_slot_demand: Decimal,

    pub total_weight_kg: Decimal,
    pub total_volume_m3: Decimal,
    pub total_items: i32,

    pub is_final: bool,

    pub computed_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::requisition::Entity",
        from = "Column::RequisitionId",
        to = "super::requisition::Column::Id",
        on_delete = "Cascade"
    )]
    Requisition,
    #[sea_orm(has_many = "super::requisition_packaging_item::Entity")]
    PackagingItem,
}

impl Related<super::requisition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requisition.def()
    }
}

impl Related<super::requisition_packaging_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PackagingItem.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {}
