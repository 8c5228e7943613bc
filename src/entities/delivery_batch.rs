use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::BatchStatus;

/// The `delivery_batches` table: one vehicle/driver dispatch run covering an
/// ordered set of facility stops.
///
/// Once `is_snapshot_locked` is set, `facility_ids`, `vehicle_id`,
/// `total_slot_demand` and `optimized_route` are frozen; only the status may
/// progress to a terminal value. The lock flag is flipped exactly once, under
/// a compare-and-swap in the dispatch transaction.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "delivery_batches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub batch_number: String,

    pub warehouse_id: Uuid,

    pub vehicle_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,

    /// Facility stops served by this run, as a JSON array of uuids.
    pub facility_ids: Json,

    /// Route geometry and stop ordering from the external optimizer; opaque.
    pub optimized_route: Option<Json>,

    pub scheduled_date: DateTime<Utc>,

    pub status: BatchStatus,

    /// Sum of rounded slot demand over assigned requisitions.
    pub total_slot_demand: Decimal,

    /// Serialized `BatchSnapshot`, present once the batch is locked.
    pub batch_snapshot: Option<Json>,
    pub is_snapshot_locked: bool,
    pub snapshot_locked_at: Option<DateTime<Utc>>,

    pub actual_start_time: Option<DateTime<Utc>>,
    pub actual_end_time: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,

    /// Optimistic lock counter, bumped on every update.
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::requisition::Entity")]
    Requisition,
    #[sea_orm(
        belongs_to = "super::driver::Entity",
        from = "Column::DriverId",
        to = "super::driver::Column::Id"
    )]
    Driver,
    #[sea_orm(
        belongs_to = "super::vehicle::Entity",
        from = "Column::VehicleId",
        to = "super::vehicle::Column::Id"
    )]
    Vehicle,
}

impl Related<super::requisition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requisition.def()
    }
}

impl Related<super::driver::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Driver.def()
    }
}

impl Related<super::vehicle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vehicle.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {}
