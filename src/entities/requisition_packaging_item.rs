use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::PackagingType;

/// The `requisition_packaging_items` table: one write-once row per requisition
/// item, recording the tier the classifier assigned and the item's slot-demand
/// contribution.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "requisition_packaging_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub packaging_id: Uuid,

    pub requisition_item_id: Uuid,

    pub packaging_type: PackagingType,

    /// One package is assessed per unit, so this equals the item quantity.
    pub package_count: i32,

    pub slot_cost_per_package: Decimal,

    /// `package_count * slot_cost_per_package`.
    pub slot_demand: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::requisition_packaging::Entity",
        from = "Column::PackagingId",
        to = "super::requisition_packaging::Column::Id",
        on_delete = "Cascade"
    )]
    Packaging,
}

impl Related<super::requisition_packaging::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Packaging.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {}
