use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, SqlErr,
    TransactionTrait,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::requisition_item::{self, Entity as RequisitionItemEntity},
    entities::requisition_packaging::{
        self, ActiveModel as PackagingActiveModel, Entity as PackagingEntity,
    },
    entities::requisition_packaging_item::ActiveModel as PackagingItemActiveModel,
    entities::slot_cost_config::Entity as SlotCostConfigEntity,
    errors::ServiceError,
    events::{Event, EventSender},
    models::packaging::{
        classify_packaging, PackagingType, DEFAULT_ITEM_VOLUME_M3, DEFAULT_ITEM_WEIGHT_KG,
        DEFAULT_SLOT_COST,
    },
};

/// Aggregate totals produced by one packaging computation.
#[derive(Debug, Clone)]
pub struct PackagingTotals {
    pub total_slot_demand: Decimal,
    pub rounded_slot_demand: Decimal,
    pub total_weight_kg: Decimal,
    pub total_volume_m3: Decimal,
    pub total_items: i32,
}

/// Service computing packaging requirements for requisitions.
///
/// The computation is deterministic and guarded against recomputation: the
/// unique index on `requisition_packaging.requisition_id` guarantees that of
/// two concurrent callers exactly one inserts the record and the other fails
/// with `AlreadyComputed`.
#[derive(Clone)]
pub struct PackagingService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl PackagingService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Computes packaging for a requisition in its own transaction.
    ///
    /// Used for out-of-band recomputation tooling; the approval flow calls
    /// [`PackagingService::compute_with_conn`] inside the approval transaction
    /// instead.
    #[instrument(skip(self), fields(requisition_id = %requisition_id))]
    pub async fn compute_packaging(
        &self,
        requisition_id: Uuid,
    ) -> Result<requisition_packaging::Model, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for packaging computation");
            ServiceError::DatabaseError(e)
        })?;

        let packaging = Self::compute_with_conn(&txn, requisition_id).await?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::RequisitionPackaged {
                    requisition_id,
                    rounded_slot_demand: packaging.rounded_slot_demand.to_string(),
                })
                .await
            {
                warn!(error = %e, requisition_id = %requisition_id, "Failed to send packaging event");
            }
        }

        Ok(packaging)
    }

    /// Runs the packaging computation on the given connection (typically the
    /// caller's transaction).
    ///
    /// Fails with `AlreadyComputed` if a packaging record already exists for
    /// this requisition, before any write.
    pub async fn compute_with_conn<C: ConnectionTrait>(
        conn: &C,
        requisition_id: Uuid,
    ) -> Result<requisition_packaging::Model, ServiceError> {
        let existing = PackagingEntity::find()
            .filter(requisition_packaging::Column::RequisitionId.eq(requisition_id))
            .one(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if existing.is_some() {
            return Err(ServiceError::AlreadyComputed(requisition_id));
        }

        let items = RequisitionItemEntity::find()
            .filter(requisition_item::Column::RequisitionId.eq(requisition_id))
            .all(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let now = Utc::now();
        let packaging_id = Uuid::new_v4();

        // Provisional record; the unique index on requisition_id makes this
        // insert the point where concurrent competitors lose.
        let provisional = PackagingActiveModel {
            id: Set(packaging_id),
            requisition_id: Set(requisition_id),
            total_slot_demand: Set(Decimal::ZERO),
            rounded_slot_demand: Set(Decimal::ZERO),
            total_weight_kg: Set(Decimal::ZERO),
            total_volume_m3: Set(Decimal::ZERO),
            total_items: Set(0),
            is_final: Set(false),
            computed_at: Set(now),
        };
        let provisional = provisional.insert(conn).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                ServiceError::AlreadyComputed(requisition_id)
            } else {
                error!(error = %e, requisition_id = %requisition_id, "Failed to insert packaging record");
                ServiceError::DatabaseError(e)
            }
        })?;

        let slot_costs = Self::load_slot_costs(conn).await?;

        let mut totals = PackagingTotals {
            total_slot_demand: Decimal::ZERO,
            rounded_slot_demand: Decimal::ZERO,
            total_weight_kg: Decimal::ZERO,
            total_volume_m3: Decimal::ZERO,
            total_items: 0,
        };

        for item in &items {
            // Items with no recorded physical data fall back to the
            // documented defaults rather than failing the computation.
            let unit_weight = item.unit_weight_kg.unwrap_or(DEFAULT_ITEM_WEIGHT_KG);
            let unit_volume = item.unit_volume_m3.unwrap_or(DEFAULT_ITEM_VOLUME_M3);

            let packaging_type = classify_packaging(unit_weight, unit_volume);
            let slot_cost = slot_costs
                .get(&packaging_type)
                .copied()
                .unwrap_or(DEFAULT_SLOT_COST);

            // One package per unit: no batching of units into shared packages.
            let package_count = item.quantity;
            let quantity = Decimal::from(item.quantity);
            let slot_demand = quantity * slot_cost;

            let packaging_item = PackagingItemActiveModel {
                id: Set(Uuid::new_v4()),
                packaging_id: Set(packaging_id),
                requisition_item_id: Set(item.id),
                packaging_type: Set(packaging_type),
                package_count: Set(package_count),
                slot_cost_per_package: Set(slot_cost),
                slot_demand: Set(slot_demand),
            };
            packaging_item
                .insert(conn)
                .await
                .map_err(ServiceError::DatabaseError)?;

            totals.total_slot_demand += slot_demand;
            totals.total_weight_kg += unit_weight * quantity;
            totals.total_volume_m3 += unit_volume * quantity;
            totals.total_items += item.quantity;
        }

        totals.rounded_slot_demand = totals.total_slot_demand.ceil();

        // Immutability guard: finalization is the only mutation this row ever
        // sees, and it happens exactly once.
        if provisional.is_final {
            return Err(ServiceError::Conflict(format!(
                "Packaging {packaging_id} is already final"
            )));
        }

        let mut finalize: PackagingActiveModel = provisional.into();
        finalize.total_slot_demand = Set(totals.total_slot_demand);
        finalize.rounded_slot_demand = Set(totals.rounded_slot_demand);
        finalize.total_weight_kg = Set(totals.total_weight_kg);
        finalize.total_volume_m3 = Set(totals.total_volume_m3);
        finalize.total_items = Set(totals.total_items);
        finalize.is_final = Set(true);

        let packaging = finalize
            .update(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(
            requisition_id = %requisition_id,
            total_slot_demand = %packaging.total_slot_demand,
            rounded_slot_demand = %packaging.rounded_slot_demand,
            items = packaging.total_items,
            "Packaging computed"
        );

        Ok(packaging)
    }

    async fn load_slot_costs<C: ConnectionTrait>(
        conn: &C,
    ) -> Result<HashMap<PackagingType, Decimal>, ServiceError> {
        let configs = SlotCostConfigEntity::find()
            .all(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;
        Ok(configs
            .into_iter()
            .map(|cfg| (cfg.packaging_type, cfg.slot_cost))
            .collect())
    }
}
