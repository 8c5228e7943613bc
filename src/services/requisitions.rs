use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::delivery_batch::{self, Entity as DeliveryBatchEntity},
    entities::requisition::{
        self, ActiveModel as RequisitionActiveModel, Entity as RequisitionEntity,
        Model as RequisitionModel, RequisitionType,
    },
    entities::requisition_item::{self, ActiveModel as RequisitionItemActiveModel},
    entities::requisition_packaging::{self, Entity as PackagingEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{BatchStatus, RequisitionStatus},
    services::packaging::PackagingService,
};

/// Request/Response types for the requisition service
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateRequisitionRequest {
    pub facility_id: Uuid,
    pub warehouse_id: Uuid,
    pub requisition_type: RequisitionType,
    #[validate(length(min = 1, message = "At least one item is required"))]
    #[validate]
    pub items: Vec<CreateRequisitionItem>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateRequisitionItem {
    #[validate(length(min = 1, message = "Item name is required"))]
    pub name: String,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    /// Unit weight in kg; defaults to 10 kg at packaging time when omitted.
    pub unit_weight_kg: Option<Decimal>,
    /// Unit volume in m³; defaults to 0.05 m³ at packaging time when omitted.
    pub unit_volume_m3: Option<Decimal>,
    #[serde(default)]
    pub requires_cold_chain: bool,
    #[serde(default)]
    pub fragile: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RequisitionResponse {
    pub id: Uuid,
    pub requisition_number: String,
    pub facility_id: Uuid,
    pub warehouse_id: Uuid,
    pub requisition_type: RequisitionType,
    pub status: RequisitionStatus,
    pub total_items: i32,
    pub total_weight_kg: Decimal,
    pub total_volume_m3: Decimal,
    pub batch_id: Option<Uuid>,
    pub packaged_at: Option<DateTime<Utc>>,
    pub ready_for_dispatch_at: Option<DateTime<Utc>>,
    pub assigned_to_batch_at: Option<DateTime<Utc>>,
    pub in_transit_at: Option<DateTime<Utc>>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RequisitionListResponse {
    pub requisitions: Vec<RequisitionResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service driving the requisition lifecycle state machine.
///
/// Every mutation validates the transition against the allowed graph before
/// writing, runs inside a single transaction, and stamps the entered state's
/// timestamp exactly once.
#[derive(Clone)]
pub struct RequisitionService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl RequisitionService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a new requisition in `pending` with its line items.
    #[instrument(skip(self, request), fields(facility_id = %request.facility_id))]
    pub async fn submit_requisition(
        &self,
        request: CreateRequisitionRequest,
    ) -> Result<RequisitionResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let now = Utc::now();
        let requisition_id = Uuid::new_v4();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for requisition creation");
            ServiceError::DatabaseError(e)
        })?;

        let requisition = RequisitionActiveModel {
            id: Set(requisition_id),
            requisition_number: Set(format!("REQ-{}", &requisition_id.simple().to_string()[..8])),
            facility_id: Set(request.facility_id),
            warehouse_id: Set(request.warehouse_id),
            requisition_type: Set(request.requisition_type),
            status: Set(RequisitionStatus::Pending),
            total_items: Set(0),
            total_weight_kg: Set(Decimal::ZERO),
            total_volume_m3: Set(Decimal::ZERO),
            batch_id: Set(None),
            decision_actor: Set(None),
            decision_reason: Set(None),
            approved_at: Set(None),
            packaged_at: Set(None),
            ready_for_dispatch_at: Set(None),
            assigned_to_batch_at: Set(None),
            in_transit_at: Set(None),
            fulfilled_at: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            version: Set(1),
        };
        let requisition = requisition.insert(&txn).await.map_err(|e| {
            error!(error = %e, requisition_id = %requisition_id, "Failed to create requisition");
            ServiceError::DatabaseError(e)
        })?;

        for item in &request.items {
            let item_model = RequisitionItemActiveModel {
                id: Set(Uuid::new_v4()),
                requisition_id: Set(requisition_id),
                name: Set(item.name.clone()),
                quantity: Set(item.quantity),
                unit_weight_kg: Set(item.unit_weight_kg),
                unit_volume_m3: Set(item.unit_volume_m3),
                requires_cold_chain: Set(item.requires_cold_chain),
                fragile: Set(item.fragile),
                created_at: Set(now),
            };
            item_model
                .insert(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?;
        }

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(requisition_id = %requisition_id, items = request.items.len(), "Requisition submitted");
        self.emit(Event::RequisitionSubmitted(requisition_id)).await;

        Ok(Self::model_to_response(requisition))
    }

    /// Approves a pending requisition.
    ///
    /// Packaging is computed synchronously and the record advances to
    /// `packaged` within the same transaction; `approved` is transient and
    /// never durably observed.
    #[instrument(skip(self), fields(requisition_id = %requisition_id, actor = %actor))]
    pub async fn approve_requisition(
        &self,
        requisition_id: Uuid,
        actor: Uuid,
    ) -> Result<RequisitionResponse, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let requisition = Self::find_for_update(&txn, requisition_id).await?;
        Self::ensure_transition(&requisition, RequisitionStatus::Approved)?;

        let mut active: RequisitionActiveModel = requisition.into();
        active.status = Set(RequisitionStatus::Approved);
        active.approved_at = Self::stamp(active.approved_at.as_ref(), now);
        let approved = active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        // Packaging runs inside the approval transaction; failure aborts the
        // whole approval, leaving the requisition pending.
        let packaging = PackagingService::compute_with_conn(&txn, requisition_id).await?;

        Self::ensure_transition(&approved, RequisitionStatus::Packaged)?;
        let mut active: RequisitionActiveModel = approved.into();
        active.status = Set(RequisitionStatus::Packaged);
        active.packaged_at = Self::stamp(active.packaged_at.as_ref(), now);
        active.total_items = Set(packaging.total_items);
        active.total_weight_kg = Set(packaging.total_weight_kg);
        active.total_volume_m3 = Set(packaging.total_volume_m3);
        active.decision_actor = Set(Some(actor));
        active.updated_at = Set(Some(now));
        let current_version = *active.version.as_ref();
        active.version = Set(current_version + 1);
        let packaged = active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(
            requisition_id = %requisition_id,
            rounded_slot_demand = %packaging.rounded_slot_demand,
            "Requisition approved and packaged"
        );
        self.emit(Event::RequisitionApproved(requisition_id)).await;
        self.emit(Event::RequisitionPackaged {
            requisition_id,
            rounded_slot_demand: packaging.rounded_slot_demand.to_string(),
        })
        .await;

        Ok(Self::model_to_response(packaged))
    }

    /// Rejects a requisition. Requires a human actor and a reason.
    #[instrument(skip(self, reason), fields(requisition_id = %requisition_id, actor = %actor))]
    pub async fn reject_requisition(
        &self,
        requisition_id: Uuid,
        actor: Uuid,
        reason: String,
    ) -> Result<RequisitionResponse, ServiceError> {
        let model = self
            .decide(requisition_id, RequisitionStatus::Rejected, actor, reason)
            .await?;
        self.emit(Event::RequisitionRejected(requisition_id)).await;
        Ok(Self::model_to_response(model))
    }

    /// Cancels a requisition. Requires a human actor and a reason.
    #[instrument(skip(self, reason), fields(requisition_id = %requisition_id, actor = %actor))]
    pub async fn cancel_requisition(
        &self,
        requisition_id: Uuid,
        actor: Uuid,
        reason: String,
    ) -> Result<RequisitionResponse, ServiceError> {
        let model = self
            .decide(requisition_id, RequisitionStatus::Cancelled, actor, reason)
            .await?;
        self.emit(Event::RequisitionCancelled(requisition_id)).await;
        Ok(Self::model_to_response(model))
    }

    /// Marks a packaged requisition ready for dispatch. Returns `true` on
    /// success; any other current status fails with `PreconditionFailed`.
    #[instrument(skip(self), fields(requisition_id = %requisition_id))]
    pub async fn mark_ready_for_dispatch(
        &self,
        requisition_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let requisition = Self::find_for_update(&txn, requisition_id).await?;
        if requisition.status != RequisitionStatus::Packaged {
            return Err(ServiceError::PreconditionFailed {
                expected: RequisitionStatus::Packaged.to_string(),
                actual: requisition.status.to_string(),
            });
        }

        let mut active: RequisitionActiveModel = requisition.into();
        active.status = Set(RequisitionStatus::ReadyForDispatch);
        active.ready_for_dispatch_at = Self::stamp(active.ready_for_dispatch_at.as_ref(), now);
        active.updated_at = Set(Some(now));
        let current_version = *active.version.as_ref();
        active.version = Set(current_version + 1);
        active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(requisition_id = %requisition_id, "Requisition ready for dispatch");
        self.emit(Event::RequisitionReadyForDispatch(requisition_id))
            .await;

        Ok(true)
    }

    /// Assigns a set of requisitions to a delivery batch.
    ///
    /// Bulk skip-and-continue by design: requisitions whose status has drifted
    /// away from `ready_for_dispatch` are skipped with a warning rather than
    /// failing the whole call, so batch planning keeps working when a few ids
    /// are stale. Returns the count actually transitioned. Errors only when
    /// the batch itself is missing, locked, or terminal.
    #[instrument(skip(self, requisition_ids), fields(batch_id = %batch_id, requested = requisition_ids.len()))]
    pub async fn assign_to_batch(
        &self,
        requisition_ids: Vec<Uuid>,
        batch_id: Uuid,
    ) -> Result<u64, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let batch = DeliveryBatchEntity::find_by_id(batch_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {batch_id} not found")))?;

        if batch.is_snapshot_locked {
            return Err(ServiceError::BatchLocked(batch_id));
        }
        if batch.status.is_terminal() {
            return Err(ServiceError::PreconditionFailed {
                expected: format!(
                    "{} or {}",
                    BatchStatus::Planned,
                    BatchStatus::Assigned
                ),
                actual: batch.status.to_string(),
            });
        }

        let mut assigned: u64 = 0;
        let mut added_slot_demand = Decimal::ZERO;

        for requisition_id in requisition_ids {
            let Some(requisition) = RequisitionEntity::find_by_id(requisition_id)
                .one(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?
            else {
                warn!(requisition_id = %requisition_id, "Skipping unknown requisition during batch assignment");
                continue;
            };

            if requisition.status != RequisitionStatus::ReadyForDispatch {
                warn!(
                    requisition_id = %requisition_id,
                    status = %requisition.status,
                    "Skipping requisition not ready for dispatch"
                );
                continue;
            }

            added_slot_demand +=
                Self::rounded_slot_demand(&txn, requisition_id).await?;

            let mut active: RequisitionActiveModel = requisition.into();
            active.status = Set(RequisitionStatus::AssignedToBatch);
            active.batch_id = Set(Some(batch_id));
            active.assigned_to_batch_at = Self::stamp(active.assigned_to_batch_at.as_ref(), now);
            active.updated_at = Set(Some(now));
            let current_version = *active.version.as_ref();
            active.version = Set(current_version + 1);
            active
                .update(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?;

            assigned += 1;
        }

        if assigned > 0 {
            let mut batch_active: delivery_batch::ActiveModel = batch.into();
            let current = *batch_active.total_slot_demand.as_ref();
            batch_active.total_slot_demand = Set(current + added_slot_demand);
            batch_active.updated_at = Set(Some(now));
            let current_version = *batch_active.version.as_ref();
            batch_active.version = Set(current_version + 1);
            batch_active
                .update(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?;
        }

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(batch_id = %batch_id, assigned = assigned, "Requisitions assigned to batch");
        self.emit(Event::RequisitionsAssignedToBatch {
            batch_id,
            count: assigned,
        })
        .await;

        Ok(assigned)
    }

    /// Sums the rounded slot demand over a facility's `ready_for_dispatch`
    /// requisitions. Returns zero when the facility has none.
    #[instrument(skip(self), fields(facility_id = %facility_id))]
    pub async fn get_facility_slot_demand(
        &self,
        facility_id: Uuid,
    ) -> Result<Decimal, ServiceError> {
        let db = &*self.db_pool;

        let requisitions = RequisitionEntity::find()
            .filter(requisition::Column::FacilityId.eq(facility_id))
            .filter(requisition::Column::Status.eq(RequisitionStatus::ReadyForDispatch))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let requisition_ids: Vec<Uuid> = requisitions.iter().map(|r| r.id).collect();
        if requisition_ids.is_empty() {
            return Ok(Decimal::ZERO);
        }

        let packagings = PackagingEntity::find()
            .filter(requisition_packaging::Column::RequisitionId.is_in(requisition_ids))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let mut total = Decimal::ZERO;
        for packaging in &packagings {
            total += packaging.rounded_slot_demand;
        }
        Ok(total)
    }

    /// Retrieves a requisition by ID
    #[instrument(skip(self), fields(requisition_id = %requisition_id))]
    pub async fn get_requisition(
        &self,
        requisition_id: Uuid,
    ) -> Result<Option<RequisitionResponse>, ServiceError> {
        let db = &*self.db_pool;
        let requisition = RequisitionEntity::find_by_id(requisition_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        Ok(requisition.map(Self::model_to_response))
    }

    /// Lists requisitions with pagination and an optional status filter.
    #[instrument(skip(self))]
    pub async fn list_requisitions(
        &self,
        page: u64,
        per_page: u64,
        status: Option<RequisitionStatus>,
    ) -> Result<RequisitionListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = RequisitionEntity::find();
        if let Some(status) = status {
            query = query.filter(requisition::Column::Status.eq(status));
        }
        let paginator = query
            .order_by_desc(requisition::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::DatabaseError)?;
        let requisitions = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(RequisitionListResponse {
            requisitions: requisitions
                .into_iter()
                .map(Self::model_to_response)
                .collect(),
            total,
            page,
            per_page,
        })
    }

    // ---- Cascades invoked by the batch service inside its transaction ----
    //
    // The source of these rules is the dispatch flow: batch status changes
    // propagate to the batch's requisitions atomically, as explicit calls
    // rather than hidden trigger chains.

    /// Transitions every `assigned_to_batch` requisition of the batch to
    /// `in_transit`. Returns the number of rows moved.
    pub(crate) async fn cascade_to_in_transit<C: ConnectionTrait>(
        conn: &C,
        batch_id: Uuid,
    ) -> Result<u64, ServiceError> {
        Self::cascade(
            conn,
            batch_id,
            RequisitionStatus::AssignedToBatch,
            RequisitionStatus::InTransit,
        )
        .await
    }

    /// Transitions every `in_transit` requisition of the batch to `fulfilled`.
    /// Requisitions in any other status are untouched.
    pub(crate) async fn cascade_to_fulfilled<C: ConnectionTrait>(
        conn: &C,
        batch_id: Uuid,
    ) -> Result<u64, ServiceError> {
        Self::cascade(
            conn,
            batch_id,
            RequisitionStatus::InTransit,
            RequisitionStatus::Fulfilled,
        )
        .await
    }

    /// Rolls `assigned_to_batch` requisitions back to `ready_for_dispatch`
    /// and clears their batch reference. Used when a pre-lock batch is
    /// cancelled.
    pub(crate) async fn release_from_batch<C: ConnectionTrait>(
        conn: &C,
        batch_id: Uuid,
    ) -> Result<u64, ServiceError> {
        let now = Utc::now();
        let requisitions = RequisitionEntity::find()
            .filter(requisition::Column::BatchId.eq(batch_id))
            .filter(requisition::Column::Status.eq(RequisitionStatus::AssignedToBatch))
            .all(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let mut released: u64 = 0;
        for requisition in requisitions {
            let mut active: RequisitionActiveModel = requisition.into();
            active.status = Set(RequisitionStatus::ReadyForDispatch);
            active.batch_id = Set(None);
            active.updated_at = Set(Some(now));
            let current_version = *active.version.as_ref();
            active.version = Set(current_version + 1);
            active
                .update(conn)
                .await
                .map_err(ServiceError::DatabaseError)?;
            released += 1;
        }
        Ok(released)
    }

    async fn cascade<C: ConnectionTrait>(
        conn: &C,
        batch_id: Uuid,
        from: RequisitionStatus,
        to: RequisitionStatus,
    ) -> Result<u64, ServiceError> {
        let now = Utc::now();
        let requisitions = RequisitionEntity::find()
            .filter(requisition::Column::BatchId.eq(batch_id))
            .filter(requisition::Column::Status.eq(from))
            .all(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let mut moved: u64 = 0;
        for requisition in requisitions {
            let mut active: RequisitionActiveModel = requisition.into();
            active.status = Set(to);
            match to {
                RequisitionStatus::InTransit => {
                    active.in_transit_at = Self::stamp(active.in_transit_at.as_ref(), now);
                }
                RequisitionStatus::Fulfilled => {
                    active.fulfilled_at = Self::stamp(active.fulfilled_at.as_ref(), now);
                }
                _ => {}
            }
            active.updated_at = Set(Some(now));
            let current_version = *active.version.as_ref();
            active.version = Set(current_version + 1);
            active
                .update(conn)
                .await
                .map_err(ServiceError::DatabaseError)?;
            moved += 1;
        }
        Ok(moved)
    }

    // ---- Internal helpers ----

    async fn decide(
        &self,
        requisition_id: Uuid,
        to: RequisitionStatus,
        actor: Uuid,
        reason: String,
    ) -> Result<RequisitionModel, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::DatabaseError)?;

        let requisition = Self::find_for_update(&txn, requisition_id).await?;
        Self::ensure_transition(&requisition, to)?;

        let mut active: RequisitionActiveModel = requisition.into();
        active.status = Set(to);
        active.decision_actor = Set(Some(actor));
        active.decision_reason = Set(Some(reason));
        active.updated_at = Set(Some(now));
        let current_version = *active.version.as_ref();
        active.version = Set(current_version + 1);
        let updated = active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(requisition_id = %requisition_id, status = %updated.status, "Requisition decision recorded");
        Ok(updated)
    }

    async fn find_for_update<C: ConnectionTrait>(
        conn: &C,
        requisition_id: Uuid,
    ) -> Result<RequisitionModel, ServiceError> {
        RequisitionEntity::find_by_id(requisition_id)
            .one(conn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Requisition {requisition_id} not found")))
    }

    fn ensure_transition(
        requisition: &RequisitionModel,
        to: RequisitionStatus,
    ) -> Result<(), ServiceError> {
        if !requisition.status.can_transition_to(to) {
            return Err(ServiceError::InvalidTransition {
                from: requisition.status.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }

    /// Stamps a transition timestamp exactly once: a field already carrying a
    /// value is left untouched.
    fn stamp(
        current: &Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> sea_orm::ActiveValue<Option<DateTime<Utc>>> {
        match current {
            Some(existing) => Set(Some(*existing)),
            None => Set(Some(now)),
        }
    }

    async fn rounded_slot_demand<C: ConnectionTrait>(
        conn: &C,
        requisition_id: Uuid,
    ) -> Result<Decimal, ServiceError> {
        let packaging = PackagingEntity::find()
            .filter(requisition_packaging::Column::RequisitionId.eq(requisition_id))
            .one(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;
        Ok(packaging
            .map(|p| p.rounded_slot_demand)
            .unwrap_or(Decimal::ZERO))
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send requisition event");
            }
        }
    }

    fn model_to_response(model: RequisitionModel) -> RequisitionResponse {
        RequisitionResponse {
            id: model.id,
            requisition_number: model.requisition_number,
            facility_id: model.facility_id,
            warehouse_id: model.warehouse_id,
            requisition_type: model.requisition_type,
            status: model.status,
            total_items: model.total_items,
            total_weight_kg: model.total_weight_kg,
            total_volume_m3: model.total_volume_m3,
            batch_id: model.batch_id,
            packaged_at: model.packaged_at,
            ready_for_dispatch_at: model.ready_for_dispatch_at,
            assigned_to_batch_at: model.assigned_to_batch_at,
            in_transit_at: model.in_transit_at,
            fulfilled_at: model.fulfilled_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
            version: model.version,
        }
    }
}
