//! FleetOps API Library
//!
//! Core functionality for the FleetOps delivery platform: the requisition
//! lifecycle, packaging and slot-demand computation, and batch dispatch
//! orchestration with snapshot locking.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod models;
pub mod services;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        // Requisitions API
        .route(
            "/requisitions",
            post(handlers::requisitions::create_requisition)
                .get(handlers::requisitions::list_requisitions),
        )
        .route(
            "/requisitions/assign-batch",
            post(handlers::requisitions::assign_to_batch),
        )
        .route(
            "/requisitions/:id",
            get(handlers::requisitions::get_requisition),
        )
        .route(
            "/requisitions/:id/approve",
            post(handlers::requisitions::approve_requisition),
        )
        .route(
            "/requisitions/:id/reject",
            post(handlers::requisitions::reject_requisition),
        )
        .route(
            "/requisitions/:id/cancel",
            post(handlers::requisitions::cancel_requisition),
        )
        .route(
            "/requisitions/:id/ready",
            post(handlers::requisitions::mark_ready_for_dispatch),
        )
        // Facility aggregates
        .route(
            "/facilities/:id/slot-demand",
            get(handlers::requisitions::get_facility_slot_demand),
        )
        // Batches API
        .route(
            "/batches",
            post(handlers::batches::create_batch).get(handlers::batches::list_batches),
        )
        .route(
            "/batches/:id",
            get(handlers::batches::get_batch).put(handlers::batches::update_batch),
        )
        .route(
            "/batches/:id/assign-driver",
            post(handlers::batches::assign_driver),
        )
        .route(
            "/batches/:id/assign-vehicle",
            post(handlers::batches::assign_vehicle),
        )
        .route(
            "/batches/:id/start",
            post(handlers::batches::start_dispatch),
        )
        .route(
            "/batches/:id/complete",
            post(handlers::batches::complete_dispatch),
        )
        .route(
            "/batches/:id/cancel",
            post(handlers::batches::cancel_batch),
        )
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "service": "fleetops-api",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
