mod common;

use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use serde_json::json;
use uuid::Uuid;

use common::TestApp;
use fleetops_api::{
    entities::delivery_batch::Entity as BatchEntity,
    entities::requisition::Entity as RequisitionEntity,
    models::{BatchSnapshot, PackagingType, SNAPSHOT_VERSION},
};

async fn ready_requisition(app: &TestApp, weight: &str, volume: &str) -> Uuid {
    let body = app
        .request_json(
            Method::POST,
            "/api/v1/requisitions",
            Some(json!({
                "facility_id": Uuid::new_v4(),
                "warehouse_id": Uuid::new_v4(),
                "requisition_type": "routine",
                "items": [
                    {"name": "Supply crate", "quantity": 1, "unit_weight_kg": weight, "unit_volume_m3": volume},
                ]
            })),
            StatusCode::CREATED,
        )
        .await;
    let id: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();
    app.request_json(
        Method::POST,
        &format!("/api/v1/requisitions/{id}/approve"),
        Some(json!({"actor": Uuid::new_v4()})),
        StatusCode::OK,
    )
    .await;
    app.request_json(
        Method::POST,
        &format!("/api/v1/requisitions/{id}/ready"),
        None,
        StatusCode::OK,
    )
    .await;
    id
}

async fn create_batch(app: &TestApp) -> Uuid {
    let body = app
        .request_json(
            Method::POST,
            "/api/v1/batches",
            Some(json!({
                "warehouse_id": Uuid::new_v4(),
                "facility_ids": [Uuid::new_v4(), Uuid::new_v4()],
                "scheduled_date": "2026-09-01T08:00:00Z",
            })),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(body["data"]["status"], "planned");
    body["data"]["id"].as_str().unwrap().parse().unwrap()
}

async fn assign(app: &TestApp, batch_id: Uuid, requisition_ids: &[Uuid]) -> u64 {
    let body = app
        .request_json(
            Method::POST,
            "/api/v1/requisitions/assign-batch",
            Some(json!({"batch_id": batch_id, "requisition_ids": requisition_ids})),
            StatusCode::OK,
        )
        .await;
    body["data"]["assigned"].as_u64().unwrap()
}

#[tokio::test]
async fn full_dispatch_flow_locks_snapshot_and_cascades() {
    let app = TestApp::new().await;
    app.seed_slot_cost(PackagingType::BoxM, dec!(1.0)).await;
    app.seed_slot_cost(PackagingType::CrateXl, dec!(2.0)).await;
    let driver_id = app.seed_driver("R. Achebe").await;
    let vehicle_id = app.seed_vehicle("KAB-123X", 40).await;

    let box_req = ready_requisition(&app, "8", "0.01").await;
    let crate_req = ready_requisition(&app, "40", "0.2").await;
    let batch_id = create_batch(&app).await;

    assert_eq!(assign(&app, batch_id, &[box_req, crate_req]).await, 2);

    app.request_json(
        Method::POST,
        &format!("/api/v1/batches/{batch_id}/assign-driver"),
        Some(json!({"driver_id": driver_id})),
        StatusCode::OK,
    )
    .await;
    app.request_json(
        Method::POST,
        &format!("/api/v1/batches/{batch_id}/assign-vehicle"),
        Some(json!({"vehicle_id": vehicle_id})),
        StatusCode::OK,
    )
    .await;

    app.request_json(
        Method::POST,
        &format!("/api/v1/batches/{batch_id}/start"),
        None,
        StatusCode::OK,
    )
    .await;

    let batch = BatchEntity::find_by_id(batch_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert!(batch.is_snapshot_locked);
    assert!(batch.snapshot_locked_at.is_some());
    assert!(batch.actual_start_time.is_some());
    assert_eq!(batch.total_slot_demand, dec!(3));

    let snapshot: BatchSnapshot =
        serde_json::from_value(batch.batch_snapshot.clone().unwrap()).unwrap();
    assert_eq!(snapshot.snapshot_version, SNAPSHOT_VERSION);
    assert_eq!(snapshot.driver_id, Some(driver_id));
    assert_eq!(snapshot.vehicle_id, Some(vehicle_id));
    assert_eq!(snapshot.total_slot_demand, dec!(3));
    assert_eq!(snapshot.requisition_ids.len(), 2);
    assert!(snapshot.requisition_ids.contains(&box_req));

    // Both requisitions cascaded to in_transit
    for id in [box_req, crate_req] {
        let model = RequisitionEntity::find_by_id(id)
            .one(&*app.state.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(model.status.to_string(), "in_transit");
        assert!(model.in_transit_at.is_some());
    }

    app.request_json(
        Method::POST,
        &format!("/api/v1/batches/{batch_id}/complete"),
        None,
        StatusCode::OK,
    )
    .await;

    let batch = BatchEntity::find_by_id(batch_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(batch.status.to_string(), "completed");
    assert!(batch.actual_end_time.is_some());

    for id in [box_req, crate_req] {
        let model = RequisitionEntity::find_by_id(id)
            .one(&*app.state.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(model.status.to_string(), "fulfilled");
        assert!(model.fulfilled_at.is_some());
    }
}

#[tokio::test]
async fn dispatch_requires_driver_and_vehicle() {
    let app = TestApp::new().await;
    let batch_id = create_batch(&app).await;

    let err = app
        .request_json(
            Method::POST,
            &format!("/api/v1/batches/{batch_id}/start"),
            None,
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert!(err["message"]
        .as_str()
        .unwrap()
        .contains("driver and vehicle"));
}

#[tokio::test]
async fn restarting_a_locked_batch_is_a_noop() {
    let app = TestApp::new().await;
    let driver_id = app.seed_driver("T. Okafor").await;
    let vehicle_id = app.seed_vehicle("KCD-456Y", 20).await;
    let batch_id = create_batch(&app).await;

    app.request_json(
        Method::POST,
        &format!("/api/v1/batches/{batch_id}/assign-driver"),
        Some(json!({"driver_id": driver_id})),
        StatusCode::OK,
    )
    .await;
    app.request_json(
        Method::POST,
        &format!("/api/v1/batches/{batch_id}/assign-vehicle"),
        Some(json!({"vehicle_id": vehicle_id})),
        StatusCode::OK,
    )
    .await;
    app.request_json(
        Method::POST,
        &format!("/api/v1/batches/{batch_id}/start"),
        None,
        StatusCode::OK,
    )
    .await;

    let first = BatchEntity::find_by_id(batch_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();

    // Second start: accepted, but the snapshot is not rebuilt.
    app.request_json(
        Method::POST,
        &format!("/api/v1/batches/{batch_id}/start"),
        None,
        StatusCode::OK,
    )
    .await;

    let second = BatchEntity::find_by_id(batch_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.snapshot_locked_at, second.snapshot_locked_at);
    assert_eq!(first.batch_snapshot, second.batch_snapshot);
    assert_eq!(first.version, second.version);
}

#[tokio::test]
async fn locked_batch_rejects_frozen_field_changes_and_new_assignments() {
    let app = TestApp::new().await;
    let driver_id = app.seed_driver("M. Wanjiku").await;
    let vehicle_id = app.seed_vehicle("KDA-789Z", 30).await;
    let batch_id = create_batch(&app).await;

    app.request_json(
        Method::POST,
        &format!("/api/v1/batches/{batch_id}/assign-driver"),
        Some(json!({"driver_id": driver_id})),
        StatusCode::OK,
    )
    .await;
    app.request_json(
        Method::POST,
        &format!("/api/v1/batches/{batch_id}/assign-vehicle"),
        Some(json!({"vehicle_id": vehicle_id})),
        StatusCode::OK,
    )
    .await;
    app.request_json(
        Method::POST,
        &format!("/api/v1/batches/{batch_id}/start"),
        None,
        StatusCode::OK,
    )
    .await;

    // Frozen fields cannot change after the lock.
    let err = app
        .request_json(
            Method::PUT,
            &format!("/api/v1/batches/{batch_id}"),
            Some(json!({"facility_ids": [Uuid::new_v4()]})),
            StatusCode::CONFLICT,
        )
        .await;
    assert!(err["message"].as_str().unwrap().contains("snapshot-locked"));

    // New requisitions cannot join a locked batch.
    let late = ready_requisition(&app, "8", "0.01").await;
    app.request_json(
        Method::POST,
        "/api/v1/requisitions/assign-batch",
        Some(json!({"batch_id": batch_id, "requisition_ids": [late]})),
        StatusCode::CONFLICT,
    )
    .await;

    // Post-lock cancellation is rejected outright.
    app.request_json(
        Method::POST,
        &format!("/api/v1/batches/{batch_id}/cancel"),
        None,
        StatusCode::CONFLICT,
    )
    .await;
}

#[tokio::test]
async fn starting_a_completed_batch_is_rejected() {
    let app = TestApp::new().await;
    let driver_id = app.seed_driver("J. Mensah").await;
    let vehicle_id = app.seed_vehicle("KBE-321Q", 25).await;
    let batch_id = create_batch(&app).await;

    app.request_json(
        Method::POST,
        &format!("/api/v1/batches/{batch_id}/assign-driver"),
        Some(json!({"driver_id": driver_id})),
        StatusCode::OK,
    )
    .await;
    app.request_json(
        Method::POST,
        &format!("/api/v1/batches/{batch_id}/assign-vehicle"),
        Some(json!({"vehicle_id": vehicle_id})),
        StatusCode::OK,
    )
    .await;
    app.request_json(
        Method::POST,
        &format!("/api/v1/batches/{batch_id}/start"),
        None,
        StatusCode::OK,
    )
    .await;
    app.request_json(
        Method::POST,
        &format!("/api/v1/batches/{batch_id}/complete"),
        None,
        StatusCode::OK,
    )
    .await;

    // A terminal batch is not dispatchable; the locked-batch no-op only
    // covers batches still in progress.
    let err = app
        .request_json(
            Method::POST,
            &format!("/api/v1/batches/{batch_id}/start"),
            None,
            StatusCode::CONFLICT,
        )
        .await;
    assert!(err["message"].as_str().unwrap().contains("completed"));

    let batch = BatchEntity::find_by_id(batch_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(batch.status.to_string(), "completed");
}

#[tokio::test]
async fn reassignment_keeps_the_original_assignment_timestamp() {
    let app = TestApp::new().await;
    let req = ready_requisition(&app, "8", "0.01").await;

    let first_batch = create_batch(&app).await;
    assert_eq!(assign(&app, first_batch, &[req]).await, 1);

    let first_ts = RequisitionEntity::find_by_id(req)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap()
        .assigned_to_batch_at
        .expect("assignment should stamp the timestamp");

    // Cancelling the batch rolls the requisition back to ready_for_dispatch.
    app.request_json(
        Method::POST,
        &format!("/api/v1/batches/{first_batch}/cancel"),
        None,
        StatusCode::OK,
    )
    .await;

    let second_batch = create_batch(&app).await;
    assert_eq!(assign(&app, second_batch, &[req]).await, 1);

    let model = RequisitionEntity::find_by_id(req)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(model.batch_id, Some(second_batch));
    // Stamped exactly once: the second assignment must not overwrite it.
    assert_eq!(model.assigned_to_batch_at, Some(first_ts));
}

#[tokio::test]
async fn bulk_assignment_skips_stale_and_unknown_requisitions() {
    let app = TestApp::new().await;
    let batch_id = create_batch(&app).await;

    let ready = ready_requisition(&app, "8", "0.01").await;

    // Pending requisition: submitted but never approved.
    let body = app
        .request_json(
            Method::POST,
            "/api/v1/requisitions",
            Some(json!({
                "facility_id": Uuid::new_v4(),
                "warehouse_id": Uuid::new_v4(),
                "requisition_type": "routine",
                "items": [{"name": "Pending item", "quantity": 1}]
            })),
            StatusCode::CREATED,
        )
        .await;
    let pending: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();

    let assigned = assign(&app, batch_id, &[ready, pending, Uuid::new_v4()]).await;
    assert_eq!(assigned, 1);

    let model = RequisitionEntity::find_by_id(pending)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(model.status.to_string(), "pending");
    assert!(model.batch_id.is_none());
}

#[tokio::test]
async fn cancelling_a_planned_batch_releases_its_requisitions() {
    let app = TestApp::new().await;
    let batch_id = create_batch(&app).await;
    let req = ready_requisition(&app, "8", "0.01").await;

    assert_eq!(assign(&app, batch_id, &[req]).await, 1);

    let body = app
        .request_json(
            Method::POST,
            &format!("/api/v1/batches/{batch_id}/cancel"),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(body["data"]["status"], "cancelled");

    let model = RequisitionEntity::find_by_id(req)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(model.status.to_string(), "ready_for_dispatch");
    assert!(model.batch_id.is_none());
    // Assignment timestamp is preserved for audit even after release.
    assert!(model.assigned_to_batch_at.is_some());
}

#[tokio::test]
async fn assignment_accumulates_batch_slot_demand() {
    let app = TestApp::new().await;
    app.seed_slot_cost(PackagingType::BoxM, dec!(1.0)).await;
    let batch_id = create_batch(&app).await;

    let first = ready_requisition(&app, "8", "0.01").await;
    let second = ready_requisition(&app, "8", "0.01").await;

    assert_eq!(assign(&app, batch_id, &[first]).await, 1);
    assert_eq!(assign(&app, batch_id, &[second]).await, 1);

    let batch = BatchEntity::find_by_id(batch_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(batch.total_slot_demand, Decimal::from(2));
}

#[tokio::test]
async fn completing_a_planned_batch_is_rejected() {
    let app = TestApp::new().await;
    let batch_id = create_batch(&app).await;

    let err = app
        .request_json(
            Method::POST,
            &format!("/api/v1/batches/{batch_id}/complete"),
            None,
            StatusCode::CONFLICT,
        )
        .await;
    assert!(err["message"].as_str().unwrap().contains("in_progress"));
}

#[tokio::test]
async fn facility_slot_demand_sums_ready_requisitions() {
    let app = TestApp::new().await;
    app.seed_slot_cost(PackagingType::BoxM, dec!(1.5)).await;

    let facility_id = Uuid::new_v4();
    for _ in 0..2 {
        let body = app
            .request_json(
                Method::POST,
                "/api/v1/requisitions",
                Some(json!({
                    "facility_id": facility_id,
                    "warehouse_id": Uuid::new_v4(),
                    "requisition_type": "routine",
                    "items": [{"name": "Kit", "quantity": 1, "unit_weight_kg": "8", "unit_volume_m3": "0.01"}]
                })),
                StatusCode::CREATED,
            )
            .await;
        let id: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();
        app.request_json(
            Method::POST,
            &format!("/api/v1/requisitions/{id}/approve"),
            Some(json!({"actor": Uuid::new_v4()})),
            StatusCode::OK,
        )
        .await;
        app.request_json(
            Method::POST,
            &format!("/api/v1/requisitions/{id}/ready"),
            None,
            StatusCode::OK,
        )
        .await;
    }

    let body = app
        .request_json(
            Method::GET,
            &format!("/api/v1/facilities/{facility_id}/slot-demand"),
            None,
            StatusCode::OK,
        )
        .await;
    // 1.5 rounds up to 2 per requisition, summed over both
    let total: Decimal = body["data"]["total_slot_demand"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(total, Decimal::from(4));
}
