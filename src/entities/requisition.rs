use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::RequisitionStatus;

/// Enum representing how urgently a requisition must be served.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum RequisitionType {
    #[sea_orm(string_value = "routine")]
    Routine,
    #[sea_orm(string_value = "emergency")]
    Emergency,
}

/// The `requisitions` table.
///
/// Rows are never physically deleted; terminal statuses preserve the audit
/// history. Totals are derived from line items at packaging time and are not
/// authoritative. The per-transition timestamps are each stamped exactly once.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "requisitions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Human-facing requisition number.
    pub requisition_number: String,

    /// Facility whose demand this requisition represents.
    pub facility_id: Uuid,

    /// Warehouse expected to fulfil the requisition.
    pub warehouse_id: Uuid,

    pub requisition_type: RequisitionType,

    pub status: RequisitionStatus,

    /// Derived totals, written by the packaging computation.
    pub total_items: i32,
    pub total_weight_kg: Decimal,
    pub total_volume_m3: Decimal,

    /// Delivery batch this requisition is assigned to, once planning picks it up.
    pub batch_id: Option<Uuid>,

    /// Actor and reason recorded for reject/cancel decisions.
    pub decision_actor: Option<Uuid>,
    pub decision_reason: Option<String>,

    pub approved_at: Option<DateTime<Utc>>,
    pub packaged_at: Option<DateTime<Utc>>,
    pub ready_for_dispatch_at: Option<DateTime<Utc>>,
    pub assigned_to_batch_at: Option<DateTime<Utc>>,
    pub in_transit_at: Option<DateTime<Utc>>,
    pub fulfilled_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,

    /// Optimistic lock counter, bumped on every update.
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::requisition_item::Entity")]
    RequisitionItem,
    #[sea_orm(has_one = "super::requisition_packaging::Entity")]
    RequisitionPackaging,
    #[sea_orm(
        belongs_to = "super::delivery_batch::Entity",
        from = "Column::BatchId",
        to = "super::delivery_batch::Column::Id"
    )]
    DeliveryBatch,
}

impl Related<super::requisition_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RequisitionItem.def()
    }
}

impl Related<super::requisition_packaging::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RequisitionPackaging.def()
    }
}

impl Related<super::delivery_batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryBatch.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {}
