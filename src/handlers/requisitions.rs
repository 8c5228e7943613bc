use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    models::RequisitionStatus,
    services::requisitions::{
        CreateRequisitionRequest, RequisitionListResponse, RequisitionResponse,
    },
    ApiResponse, AppState, ListQuery,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ApproveRequest {
    pub actor: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DecisionRequest {
    pub actor: Uuid,
    #[validate(length(min = 1, message = "A reason is required"))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignBatchRequest {
    pub batch_id: Uuid,
    #[validate(length(min = 1, message = "At least one requisition id is required"))]
    pub requisition_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignBatchResponse {
    pub batch_id: Uuid,
    pub assigned: u64,
}

#[derive(Debug, Deserialize)]
pub struct RequisitionListFilter {
    pub status: Option<RequisitionStatus>,
}

#[utoipa::path(
    post,
    path = "/api/v1/requisitions",
    summary = "Submit requisition",
    request_body = CreateRequisitionRequest,
    responses(
        (status = 201, description = "Requisition created", body = ApiResponse<RequisitionResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn create_requisition(
    State(state): State<AppState>,
    Json(request): Json<CreateRequisitionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RequisitionResponse>>), ServiceError> {
    let requisition = state.services.requisitions.submit_requisition(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(requisition))))
}

#[utoipa::path(
    get,
    path = "/api/v1/requisitions",
    summary = "List requisitions",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
        ("status" = Option<String>, Query, description = "Filter by requisition status"),
    ),
    responses(
        (status = 200, description = "Requisitions retrieved", body = ApiResponse<RequisitionListResponse>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn list_requisitions(
    State(state): State<AppState>,
    Query(pagination): Query<ListQuery>,
    Query(filter): Query<RequisitionListFilter>,
) -> Result<Json<ApiResponse<RequisitionListResponse>>, ServiceError> {
    let list = state
        .services
        .requisitions
        .list_requisitions(pagination.page, pagination.limit, filter.status)
        .await?;
    Ok(Json(ApiResponse::success(list)))
}

#[utoipa::path(
    get,
    path = "/api/v1/requisitions/{id}",
    summary = "Get requisition",
    params(("id" = Uuid, Path, description = "Requisition ID")),
    responses(
        (status = 200, description = "Requisition retrieved", body = ApiResponse<RequisitionResponse>),
        (status = 404, description = "Requisition not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_requisition(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RequisitionResponse>>, ServiceError> {
    let requisition = state
        .services
        .requisitions
        .get_requisition(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Requisition {id} not found")))?;
    Ok(Json(ApiResponse::success(requisition)))
}

#[utoipa::path(
    post,
    path = "/api/v1/requisitions/{id}/approve",
    summary = "Approve requisition",
    description = "Approves a pending requisition; packaging is computed and the \
                   record advances to packaged in the same transaction",
    params(("id" = Uuid, Path, description = "Requisition ID")),
    request_body = ApproveRequest,
    responses(
        (status = 200, description = "Requisition approved and packaged", body = ApiResponse<RequisitionResponse>),
        (status = 404, description = "Requisition not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Invalid transition", body = crate::errors::ErrorResponse),
    )
)]
pub async fn approve_requisition(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ApproveRequest>,
) -> Result<Json<ApiResponse<RequisitionResponse>>, ServiceError> {
    let requisition = state
        .services
        .requisitions
        .approve_requisition(id, request.actor)
        .await?;
    Ok(Json(ApiResponse::success(requisition)))
}

#[utoipa::path(
    post,
    path = "/api/v1/requisitions/{id}/reject",
    summary = "Reject requisition",
    params(("id" = Uuid, Path, description = "Requisition ID")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Requisition rejected", body = ApiResponse<RequisitionResponse>),
        (status = 409, description = "Invalid transition", body = crate::errors::ErrorResponse),
    )
)]
pub async fn reject_requisition(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<ApiResponse<RequisitionResponse>>, ServiceError> {
    request.validate()?;
    let requisition = state
        .services
        .requisitions
        .reject_requisition(id, request.actor, request.reason)
        .await?;
    Ok(Json(ApiResponse::success(requisition)))
}

#[utoipa::path(
    post,
    path = "/api/v1/requisitions/{id}/cancel",
    summary = "Cancel requisition",
    params(("id" = Uuid, Path, description = "Requisition ID")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Requisition cancelled", body = ApiResponse<RequisitionResponse>),
        (status = 409, description = "Invalid transition", body = crate::errors::ErrorResponse),
    )
)]
pub async fn cancel_requisition(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<ApiResponse<RequisitionResponse>>, ServiceError> {
    request.validate()?;
    let requisition = state
        .services
        .requisitions
        .cancel_requisition(id, request.actor, request.reason)
        .await?;
    Ok(Json(ApiResponse::success(requisition)))
}

#[utoipa::path(
    post,
    path = "/api/v1/requisitions/{id}/ready",
    summary = "Mark requisition ready for dispatch",
    params(("id" = Uuid, Path, description = "Requisition ID")),
    responses(
        (status = 200, description = "Requisition marked ready", body = ApiResponse<serde_json::Value>),
        (status = 409, description = "Requisition is not packaged", body = crate::errors::ErrorResponse),
    )
)]
pub async fn mark_ready_for_dispatch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    state.services.requisitions.mark_ready_for_dispatch(id).await?;
    Ok(Json(ApiResponse::success(json!({
        "requisition_id": id,
        "status": RequisitionStatus::ReadyForDispatch,
    }))))
}

#[utoipa::path(
    post,
    path = "/api/v1/requisitions/assign-batch",
    summary = "Assign requisitions to a batch",
    description = "Bulk assignment; requisitions no longer ready for dispatch are \
                   skipped and the count of actually assigned requisitions is returned",
    request_body = AssignBatchRequest,
    responses(
        (status = 200, description = "Assignment applied", body = ApiResponse<AssignBatchResponse>),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Batch locked or terminal", body = crate::errors::ErrorResponse),
    )
)]
pub async fn assign_to_batch(
    State(state): State<AppState>,
    Json(request): Json<AssignBatchRequest>,
) -> Result<Json<ApiResponse<AssignBatchResponse>>, ServiceError> {
    request.validate()?;
    let assigned = state
        .services
        .requisitions
        .assign_to_batch(request.requisition_ids, request.batch_id)
        .await?;
    Ok(Json(ApiResponse::success(AssignBatchResponse {
        batch_id: request.batch_id,
        assigned,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/facilities/{id}/slot-demand",
    summary = "Get facility slot demand",
    description = "Sums the rounded slot demand of the facility's ready-for-dispatch requisitions",
    params(("id" = Uuid, Path, description = "Facility ID")),
    responses(
        (status = 200, description = "Slot demand computed", body = ApiResponse<serde_json::Value>),
    )
)]
pub async fn get_facility_slot_demand(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    let total = state
        .services
        .requisitions
        .get_facility_slot_demand(id)
        .await?;
    Ok(Json(ApiResponse::success(json!({
        "facility_id": id,
        "total_slot_demand": total,
    }))))
}
