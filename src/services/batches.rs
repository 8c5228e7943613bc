use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::delivery_batch::{
        self, ActiveModel as BatchActiveModel, Entity as BatchEntity, Model as BatchModel,
    },
    entities::driver::Entity as DriverEntity,
    entities::requisition::{self, Entity as RequisitionEntity},
    entities::requisition_packaging::{self, Entity as PackagingEntity},
    entities::vehicle::Entity as VehicleEntity,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{BatchSnapshot, BatchStatus, RequisitionStatus, SNAPSHOT_VERSION},
};

/// Request/Response types for the batch service
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateBatchRequest {
    pub warehouse_id: Uuid,
    #[validate(length(min = 1, message = "At least one facility stop is required"))]
    pub facility_ids: Vec<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub scheduled_date: DateTime<Utc>,
    /// Opaque route artifact from the external optimizer.
    pub optimized_route: Option<JsonValue>,
}

/// Planning-time changes to a batch. Every field here is frozen once the
/// snapshot lock is taken.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateBatchRequest {
    pub facility_ids: Option<Vec<Uuid>>,
    pub vehicle_id: Option<Uuid>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub optimized_route: Option<JsonValue>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchResponse {
    pub id: Uuid,
    pub batch_number: String,
    pub warehouse_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub facility_ids: Vec<Uuid>,
    pub optimized_route: Option<JsonValue>,
    pub scheduled_date: DateTime<Utc>,
    pub status: BatchStatus,
    pub total_slot_demand: Decimal,
    pub is_snapshot_locked: bool,
    pub snapshot_locked_at: Option<DateTime<Utc>>,
    pub batch_snapshot: Option<JsonValue>,
    pub actual_start_time: Option<DateTime<Utc>>,
    pub actual_end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchListResponse {
    pub batches: Vec<BatchResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service managing delivery batches: planning, snapshot locking and the
/// dispatch orchestration operations.
///
/// The snapshot lock is a compare-and-swap on `is_snapshot_locked`: of two
/// concurrent dispatch starts exactly one flips the flag; the loser observes
/// the lock already taken and treats its own lock step as a no-op. Cascades to
/// the batch's requisitions run inside the same transaction as the batch
/// transition, so no caller observes a half-applied dispatch.
#[derive(Clone)]
pub struct BatchService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl BatchService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a new batch in `planned`.
    #[instrument(skip(self, request), fields(warehouse_id = %request.warehouse_id))]
    pub async fn create_batch(
        &self,
        request: CreateBatchRequest,
    ) -> Result<BatchResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let now = Utc::now();
        let batch_id = Uuid::new_v4();

        let batch = BatchActiveModel {
            id: Set(batch_id),
            batch_number: Set(format!("DB-{}", &batch_id.simple().to_string()[..8])),
            warehouse_id: Set(request.warehouse_id),
            vehicle_id: Set(request.vehicle_id),
            driver_id: Set(None),
            facility_ids: Set(serde_json::to_value(&request.facility_ids)
                .map_err(|e| ServiceError::InternalError(e.to_string()))?),
            optimized_route: Set(request.optimized_route),
            scheduled_date: Set(request.scheduled_date),
            status: Set(BatchStatus::Planned),
            total_slot_demand: Set(Decimal::ZERO),
            batch_snapshot: Set(None),
            is_snapshot_locked: Set(false),
            snapshot_locked_at: Set(None),
            actual_start_time: Set(None),
            actual_end_time: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            version: Set(1),
        };

        let batch = batch.insert(db).await.map_err(|e| {
            error!(error = %e, batch_id = %batch_id, "Failed to create batch");
            ServiceError::DatabaseError(e)
        })?;

        info!(batch_id = %batch_id, "Delivery batch created");
        self.emit(Event::BatchCreated(batch_id)).await;

        Self::model_to_response(batch)
    }

    /// Assigns a driver to a pre-lock batch and advances it to `assigned`.
    #[instrument(skip(self), fields(batch_id = %batch_id, driver_id = %driver_id))]
    pub async fn assign_driver(
        &self,
        batch_id: Uuid,
        driver_id: Uuid,
    ) -> Result<BatchResponse, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let batch = Self::find_for_update(&txn, batch_id).await?;
        Self::ensure_unlocked(&batch)?;
        Self::ensure_pre_lock_status(&batch)?;

        DriverEntity::find_by_id(driver_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Driver {driver_id} not found")))?;

        let mut active: BatchActiveModel = batch.into();
        active.driver_id = Set(Some(driver_id));
        active.status = Set(BatchStatus::Assigned);
        active.updated_at = Set(Some(now));
        let current_version = *active.version.as_ref();
        active.version = Set(current_version + 1);
        let updated = active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(batch_id = %batch_id, driver_id = %driver_id, "Driver assigned to batch");
        self.emit(Event::BatchDriverAssigned {
            batch_id,
            driver_id,
        })
        .await;

        Self::model_to_response(updated)
    }

    /// Assigns a vehicle to a pre-lock batch. The batch status is unchanged;
    /// `start_dispatch` checks that both driver and vehicle are present.
    #[instrument(skip(self), fields(batch_id = %batch_id, vehicle_id = %vehicle_id))]
    pub async fn assign_vehicle(
        &self,
        batch_id: Uuid,
        vehicle_id: Uuid,
    ) -> Result<BatchResponse, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let batch = Self::find_for_update(&txn, batch_id).await?;
        Self::ensure_unlocked(&batch)?;
        Self::ensure_pre_lock_status(&batch)?;

        VehicleEntity::find_by_id(vehicle_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Vehicle {vehicle_id} not found")))?;

        let mut active: BatchActiveModel = batch.into();
        active.vehicle_id = Set(Some(vehicle_id));
        active.updated_at = Set(Some(now));
        let current_version = *active.version.as_ref();
        active.version = Set(current_version + 1);
        let updated = active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(batch_id = %batch_id, vehicle_id = %vehicle_id, "Vehicle assigned to batch");
        self.emit(Event::BatchVehicleAssigned {
            batch_id,
            vehicle_id,
        })
        .await;

        Self::model_to_response(updated)
    }

    /// Starts dispatch: builds and locks the batch snapshot, records the
    /// actual start time and moves the batch's requisitions to `in_transit`,
    /// all in one transaction.
    ///
    /// Returns the batch status after the call. A batch that is already
    /// locked and still in progress is a concurrent-winner case: the call is
    /// a no-op. A locked batch in a terminal status is not dispatchable and
    /// fails the precondition check.
    #[instrument(skip(self), fields(batch_id = %batch_id))]
    pub async fn start_dispatch(&self, batch_id: Uuid) -> Result<BatchStatus, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let batch = Self::find_for_update(&txn, batch_id).await?;

        if batch.is_snapshot_locked && batch.status == BatchStatus::InProgress {
            // Lost the CAS to a concurrent caller (or dispatch already ran):
            // the snapshot exists, nothing further to do.
            txn.commit().await.map_err(ServiceError::DatabaseError)?;
            info!(batch_id = %batch_id, "Batch already snapshot-locked; dispatch start is a no-op");
            return Ok(batch.status);
        }

        if !batch.status.is_pre_lock() {
            return Err(ServiceError::PreconditionFailed {
                expected: format!("{} or {}", BatchStatus::Planned, BatchStatus::Assigned),
                actual: batch.status.to_string(),
            });
        }
        if batch.driver_id.is_none() || batch.vehicle_id.is_none() {
            let missing = match (batch.driver_id, batch.vehicle_id) {
                (None, None) => "driver and vehicle",
                (None, _) => "driver",
                _ => "vehicle",
            };
            return Err(ServiceError::MissingAssignment(format!(
                "batch {batch_id} has no {missing} assigned"
            )));
        }

        let snapshot = Self::build_snapshot(&txn, &batch).await?;
        let snapshot_json = serde_json::to_value(&snapshot)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        // Compare-and-swap on the lock flag: only the caller that still sees
        // it unset may flip it.
        let result = BatchEntity::update_many()
            .col_expr(
                delivery_batch::Column::Status,
                sea_orm::sea_query::Expr::value(BatchStatus::InProgress),
            )
            .col_expr(
                delivery_batch::Column::BatchSnapshot,
                sea_orm::sea_query::Expr::value(snapshot_json),
            )
            .col_expr(
                delivery_batch::Column::IsSnapshotLocked,
                sea_orm::sea_query::Expr::value(true),
            )
            .col_expr(
                delivery_batch::Column::SnapshotLockedAt,
                sea_orm::sea_query::Expr::value(now),
            )
            .col_expr(
                delivery_batch::Column::TotalSlotDemand,
                sea_orm::sea_query::Expr::value(snapshot.total_slot_demand),
            )
            .col_expr(
                delivery_batch::Column::ActualStartTime,
                sea_orm::sea_query::Expr::value(now),
            )
            .col_expr(
                delivery_batch::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(Some(now)),
            )
            .col_expr(
                delivery_batch::Column::Version,
                sea_orm::sea_query::Expr::value(batch.version + 1),
            )
            .filter(delivery_batch::Column::Id.eq(batch_id))
            .filter(delivery_batch::Column::IsSnapshotLocked.eq(false))
            .exec(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if result.rows_affected == 0 {
            // Another dispatcher locked the batch between our read and write.
            txn.commit().await.map_err(ServiceError::DatabaseError)?;
            info!(batch_id = %batch_id, "Lost snapshot-lock race; dispatch start is a no-op");
            return Ok(BatchStatus::InProgress);
        }

        let moved =
            super::requisitions::RequisitionService::cascade_to_in_transit(&txn, batch_id).await?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(
            batch_id = %batch_id,
            requisitions_in_transit = moved,
            total_slot_demand = %snapshot.total_slot_demand,
            "Batch dispatched and snapshot-locked"
        );
        self.emit(Event::BatchDispatched {
            batch_id,
            requisitions_in_transit: moved,
        })
        .await;

        Ok(BatchStatus::InProgress)
    }

    /// Completes an in-progress dispatch: stamps the end time and moves every
    /// `in_transit` requisition of the batch to `fulfilled`.
    #[instrument(skip(self), fields(batch_id = %batch_id))]
    pub async fn complete_dispatch(&self, batch_id: Uuid) -> Result<bool, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let batch = Self::find_for_update(&txn, batch_id).await?;
        if batch.status != BatchStatus::InProgress {
            return Err(ServiceError::PreconditionFailed {
                expected: BatchStatus::InProgress.to_string(),
                actual: batch.status.to_string(),
            });
        }

        let mut active: BatchActiveModel = batch.into();
        active.status = Set(BatchStatus::Completed);
        active.actual_end_time = Set(Some(now));
        active.updated_at = Set(Some(now));
        let current_version = *active.version.as_ref();
        active.version = Set(current_version + 1);
        active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let fulfilled =
            super::requisitions::RequisitionService::cascade_to_fulfilled(&txn, batch_id).await?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(batch_id = %batch_id, requisitions_fulfilled = fulfilled, "Batch completed");
        self.emit(Event::BatchCompleted {
            batch_id,
            requisitions_fulfilled: fulfilled,
        })
        .await;

        Ok(true)
    }

    /// Cancels a pre-lock batch, releasing its requisitions back to
    /// `ready_for_dispatch`.
    ///
    /// Cancelling a locked (in-progress) batch needs a compensating workflow
    /// that reconciles goods already on the road; that flow does not exist
    /// here, so post-lock cancellation is rejected with `BatchLocked`.
    #[instrument(skip(self), fields(batch_id = %batch_id))]
    pub async fn cancel_batch(&self, batch_id: Uuid) -> Result<BatchResponse, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let batch = Self::find_for_update(&txn, batch_id).await?;
        Self::ensure_unlocked(&batch)?;
        if !batch.status.can_transition_to(BatchStatus::Cancelled) {
            return Err(ServiceError::InvalidTransition {
                from: batch.status.to_string(),
                to: BatchStatus::Cancelled.to_string(),
            });
        }

        let released =
            super::requisitions::RequisitionService::release_from_batch(&txn, batch_id).await?;

        let mut active: BatchActiveModel = batch.into();
        active.status = Set(BatchStatus::Cancelled);
        active.total_slot_demand = Set(Decimal::ZERO);
        active.updated_at = Set(Some(now));
        let current_version = *active.version.as_ref();
        active.version = Set(current_version + 1);
        let updated = active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(batch_id = %batch_id, requisitions_released = released, "Batch cancelled");
        self.emit(Event::BatchCancelled {
            batch_id,
            requisitions_released: released,
        })
        .await;

        Self::model_to_response(updated)
    }

    /// Applies planning-time changes to a batch.
    ///
    /// After the snapshot lock every field carried by `UpdateBatchRequest` is
    /// frozen: any attempt fails with `BatchLocked` before a single write.
    #[instrument(skip(self, request), fields(batch_id = %batch_id))]
    pub async fn update_batch(
        &self,
        batch_id: Uuid,
        request: UpdateBatchRequest,
    ) -> Result<BatchResponse, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let batch = Self::find_for_update(&txn, batch_id).await?;
        let touches_frozen = request.facility_ids.is_some()
            || request.vehicle_id.is_some()
            || request.optimized_route.is_some();
        if batch.is_snapshot_locked && touches_frozen {
            return Err(ServiceError::BatchLocked(batch_id));
        }
        Self::ensure_pre_lock_status(&batch)?;

        let mut active: BatchActiveModel = batch.into();
        if let Some(facility_ids) = &request.facility_ids {
            active.facility_ids = Set(serde_json::to_value(facility_ids)
                .map_err(|e| ServiceError::InternalError(e.to_string()))?);
        }
        if let Some(vehicle_id) = request.vehicle_id {
            VehicleEntity::find_by_id(vehicle_id)
                .one(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?
                .ok_or_else(|| ServiceError::NotFound(format!("Vehicle {vehicle_id} not found")))?;
            active.vehicle_id = Set(Some(vehicle_id));
        }
        if let Some(scheduled_date) = request.scheduled_date {
            active.scheduled_date = Set(scheduled_date);
        }
        if let Some(route) = request.optimized_route {
            active.optimized_route = Set(Some(route));
        }
        active.updated_at = Set(Some(now));
        let current_version = *active.version.as_ref();
        active.version = Set(current_version + 1);
        let updated = active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        Self::model_to_response(updated)
    }

    /// Retrieves a batch by ID
    #[instrument(skip(self), fields(batch_id = %batch_id))]
    pub async fn get_batch(&self, batch_id: Uuid) -> Result<Option<BatchResponse>, ServiceError> {
        let db = &*self.db_pool;
        let batch = BatchEntity::find_by_id(batch_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        batch.map(Self::model_to_response).transpose()
    }

    /// Lists batches with pagination and an optional status filter.
    #[instrument(skip(self))]
    pub async fn list_batches(
        &self,
        page: u64,
        per_page: u64,
        status: Option<BatchStatus>,
    ) -> Result<BatchListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = BatchEntity::find();
        if let Some(status) = status {
            query = query.filter(delivery_batch::Column::Status.eq(status));
        }
        let paginator = query
            .order_by_desc(delivery_batch::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::DatabaseError)?;
        let batches = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(BatchListResponse {
            batches: batches
                .into_iter()
                .map(Self::model_to_response)
                .collect::<Result<Vec<_>, _>>()?,
            total,
            page,
            per_page,
        })
    }

    /// Builds the versioned snapshot of a batch's dispatch-relevant state:
    /// vehicle, driver, facility stops, route, and the summed rounded slot
    /// demand of the requisitions currently assigned to it.
    pub(crate) async fn build_snapshot<C: ConnectionTrait>(
        conn: &C,
        batch: &BatchModel,
    ) -> Result<BatchSnapshot, ServiceError> {
        let requisitions = RequisitionEntity::find()
            .filter(requisition::Column::BatchId.eq(batch.id))
            .filter(requisition::Column::Status.eq(RequisitionStatus::AssignedToBatch))
            .all(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let requisition_ids: Vec<Uuid> = requisitions.iter().map(|r| r.id).collect();

        let mut total_slot_demand = Decimal::ZERO;
        if !requisition_ids.is_empty() {
            let packagings = PackagingEntity::find()
                .filter(
                    requisition_packaging::Column::RequisitionId.is_in(requisition_ids.clone()),
                )
                .all(conn)
                .await
                .map_err(ServiceError::DatabaseError)?;
            for packaging in &packagings {
                total_slot_demand += packaging.rounded_slot_demand;
            }
        }

        Ok(BatchSnapshot {
            snapshot_version: SNAPSHOT_VERSION,
            batch_id: batch.id,
            batch_number: batch.batch_number.clone(),
            warehouse_id: batch.warehouse_id,
            vehicle_id: batch.vehicle_id,
            driver_id: batch.driver_id,
            facility_ids: Self::parse_facility_ids(&batch.facility_ids)?,
            optimized_route: batch.optimized_route.clone(),
            total_slot_demand,
            requisition_ids,
            created_at: Utc::now(),
        })
    }

    // ---- Internal helpers ----

    async fn find_for_update<C: ConnectionTrait>(
        conn: &C,
        batch_id: Uuid,
    ) -> Result<BatchModel, ServiceError> {
        BatchEntity::find_by_id(batch_id)
            .one(conn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {batch_id} not found")))
    }

    fn ensure_unlocked(batch: &BatchModel) -> Result<(), ServiceError> {
        if batch.is_snapshot_locked {
            return Err(ServiceError::BatchLocked(batch.id));
        }
        Ok(())
    }

    fn ensure_pre_lock_status(batch: &BatchModel) -> Result<(), ServiceError> {
        if !batch.status.is_pre_lock() {
            return Err(ServiceError::PreconditionFailed {
                expected: format!("{} or {}", BatchStatus::Planned, BatchStatus::Assigned),
                actual: batch.status.to_string(),
            });
        }
        Ok(())
    }

    fn parse_facility_ids(raw: &JsonValue) -> Result<Vec<Uuid>, ServiceError> {
        serde_json::from_value(raw.clone())
            .map_err(|e| ServiceError::InternalError(format!("Malformed facility id list: {e}")))
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send batch event");
            }
        }
    }

    fn model_to_response(model: BatchModel) -> Result<BatchResponse, ServiceError> {
        Ok(BatchResponse {
            facility_ids: Self::parse_facility_ids(&model.facility_ids)?,
            id: model.id,
            batch_number: model.batch_number,
            warehouse_id: model.warehouse_id,
            vehicle_id: model.vehicle_id,
            driver_id: model.driver_id,
            optimized_route: model.optimized_route,
            scheduled_date: model.scheduled_date,
            status: model.status,
            total_slot_demand: model.total_slot_demand,
            is_snapshot_locked: model.is_snapshot_locked,
            snapshot_locked_at: model.snapshot_locked_at,
            batch_snapshot: model.batch_snapshot,
            actual_start_time: model.actual_start_time,
            actual_end_time: model.actual_end_time,
            created_at: model.created_at,
            updated_at: model.updated_at,
            version: model.version,
        })
    }
}
