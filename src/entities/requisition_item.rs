use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The `requisition_items` table. Line items owned exclusively by their parent
/// requisition and removed with it (cascade).
///
/// Unit weight/volume are optional; the packaging computation substitutes the
/// documented defaults (10 kg, 0.05 m³) when they are missing.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "requisition_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub requisition_id: Uuid,

    pub name: String,

    pub quantity: i32,

    pub unit_weight_kg: Option<Decimal>,
    pub unit_volume_m3: Option<Decimal>,

    /// Handling flags surfaced to drivers; not used by the classifier.
    pub requires_cold_chain: bool,
    pub fragile: bool,

    pub created_at: DateTime<Utc>,
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
}

impl Related<super::requisition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requisition.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {}
