use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    models::BatchStatus,
    services::batches::{BatchListResponse, BatchResponse, CreateBatchRequest, UpdateBatchRequest},
    ApiResponse, AppState, ListQuery,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignDriverRequest {
    pub driver_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignVehicleRequest {
    pub vehicle_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct BatchListFilter {
    pub status: Option<BatchStatus>,
}

#[utoipa::path(
    post,
    path = "/api/v1/batches",
    summary = "Create delivery batch",
    request_body = CreateBatchRequest,
    responses(
        (status = 201, description = "Batch created", body = ApiResponse<BatchResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
    )
)]
pub async fn create_batch(
    State(state): State<AppState>,
    Json(request): Json<CreateBatchRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BatchResponse>>), ServiceError> {
    let batch = state.services.batches.create_batch(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(batch))))
}

#[utoipa::path(
    get,
    path = "/api/v1/batches",
    summary = "List delivery batches",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
        ("status" = Option<String>, Query, description = "Filter by batch status"),
    ),
    responses(
        (status = 200, description = "Batches retrieved", body = ApiResponse<BatchListResponse>),
    )
)]
pub async fn list_batches(
    State(state): State<AppState>,
    Query(pagination): Query<ListQuery>,
    Query(filter): Query<BatchListFilter>,
) -> Result<Json<ApiResponse<BatchListResponse>>, ServiceError> {
    let list = state
        .services
        .batches
        .list_batches(pagination.page, pagination.limit, filter.status)
        .await?;
    Ok(Json(ApiResponse::success(list)))
}

#[utoipa::path(
    get,
    path = "/api/v1/batches/{id}",
    summary = "Get delivery batch",
    params(("id" = Uuid, Path, description = "Batch ID")),
    responses(
        (status = 200, description = "Batch retrieved", body = ApiResponse<BatchResponse>),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BatchResponse>>, ServiceError> {
    let batch = state
        .services
        .batches
        .get_batch(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Batch {id} not found")))?;
    Ok(Json(ApiResponse::success(batch)))
}

#[utoipa::path(
    put,
    path = "/api/v1/batches/{id}",
    summary = "Update delivery batch",
    description = "Planning-time changes only; stops, vehicle and route are frozen once the snapshot is locked",
    params(("id" = Uuid, Path, description = "Batch ID")),
    request_body = UpdateBatchRequest,
    responses(
        (status = 200, description = "Batch updated", body = ApiResponse<BatchResponse>),
        (status = 409, description = "Batch is snapshot-locked", body = crate::errors::ErrorResponse),
    )
)]
pub async fn update_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateBatchRequest>,
) -> Result<Json<ApiResponse<BatchResponse>>, ServiceError> {
    let batch = state.services.batches.update_batch(id, request).await?;
    Ok(Json(ApiResponse::success(batch)))
}

#[utoipa::path(
    post,
    path = "/api/v1/batches/{id}/assign-driver",
    summary = "Assign driver to batch",
    params(("id" = Uuid, Path, description = "Batch ID")),
    request_body = AssignDriverRequest,
    responses(
        (status = 200, description = "Driver assigned", body = ApiResponse<BatchResponse>),
        (status = 404, description = "Batch or driver not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Batch is snapshot-locked", body = crate::errors::ErrorResponse),
    )
)]
pub async fn assign_driver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignDriverRequest>,
) -> Result<Json<ApiResponse<BatchResponse>>, ServiceError> {
    let batch = state
        .services
        .batches
        .assign_driver(id, request.driver_id)
        .await?;
    Ok(Json(ApiResponse::success(batch)))
}

#[utoipa::path(
    post,
    path = "/api/v1/batches/{id}/assign-vehicle",
    summary = "Assign vehicle to batch",
    params(("id" = Uuid, Path, description = "Batch ID")),
    request_body = AssignVehicleRequest,
    responses(
        (status = 200, description = "Vehicle assigned", body = ApiResponse<BatchResponse>),
        (status = 404, description = "Batch or vehicle not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Batch is snapshot-locked", body = crate::errors::ErrorResponse),
    )
)]
pub async fn assign_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignVehicleRequest>,
) -> Result<Json<ApiResponse<BatchResponse>>, ServiceError> {
    let batch = state
        .services
        .batches
        .assign_vehicle(id, request.vehicle_id)
        .await?;
    Ok(Json(ApiResponse::success(batch)))
}

#[utoipa::path(
    post,
    path = "/api/v1/batches/{id}/start",
    summary = "Start batch dispatch",
    description = "Builds and locks the batch snapshot and moves the batch's \
                   requisitions to in_transit atomically",
    params(("id" = Uuid, Path, description = "Batch ID")),
    responses(
        (status = 200, description = "Dispatch started", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Driver or vehicle missing", body = crate::errors::ErrorResponse),
        (status = 409, description = "Batch not in a dispatchable status", body = crate::errors::ErrorResponse),
    )
)]
pub async fn start_dispatch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    let status = state.services.batches.start_dispatch(id).await?;
    Ok(Json(ApiResponse::success(json!({
        "batch_id": id,
        "status": status,
    }))))
}

#[utoipa::path(
    post,
    path = "/api/v1/batches/{id}/complete",
    summary = "Complete batch dispatch",
    params(("id" = Uuid, Path, description = "Batch ID")),
    responses(
        (status = 200, description = "Dispatch completed", body = ApiResponse<serde_json::Value>),
        (status = 409, description = "Batch is not in progress", body = crate::errors::ErrorResponse),
    )
)]
pub async fn complete_dispatch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    state.services.batches.complete_dispatch(id).await?;
    Ok(Json(ApiResponse::success(json!({
        "batch_id": id,
        "status": BatchStatus::Completed,
    }))))
}

#[utoipa::path(
    post,
    path = "/api/v1/batches/{id}/cancel",
    summary = "Cancel delivery batch",
    description = "Pre-lock only; assigned requisitions are released back to ready_for_dispatch",
    params(("id" = Uuid, Path, description = "Batch ID")),
    responses(
        (status = 200, description = "Batch cancelled", body = ApiResponse<BatchResponse>),
        (status = 409, description = "Batch is snapshot-locked", body = crate::errors::ErrorResponse),
    )
)]
pub async fn cancel_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BatchResponse>>, ServiceError> {
    let batch = state.services.batches.cancel_batch(id).await?;
    Ok(Json(ApiResponse::success(batch)))
}
