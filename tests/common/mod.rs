use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, Response, StatusCode},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use fleetops_api::{
    config::AppConfig,
    db,
    entities::{driver, slot_cost_config, vehicle},
    events::{self, EventSender},
    handlers::AppServices,
    models::PackagingType,
    AppState,
};

/// Helper harness backing an application state with an in-memory SQLite
/// database. A single pooled connection keeps the schema alive for the
/// lifetime of the test.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_arc.clone(), Arc::new(event_sender.clone()));

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .nest("/api/v1", fleetops_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    /// Sends a JSON request to the in-process router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let request = builder.body(body).expect("build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router request")
    }

    /// Sends a request and parses the JSON body, asserting the given status.
    pub async fn request_json(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        expected_status: StatusCode,
    ) -> Value {
        let response = self.request(method, uri, body).await;
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        assert_eq!(
            status,
            expected_status,
            "unexpected status, body: {}",
            String::from_utf8_lossy(&bytes)
        );
        serde_json::from_slice(&bytes).expect("parse response body")
    }

    /// Inserts an active driver row and returns its id.
    pub async fn seed_driver(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        driver::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            license_number: Set(format!("LIC-{}", &id.simple().to_string()[..8])),
            active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed driver");
        id
    }

    /// Inserts an active vehicle row and returns its id.
    pub async fn seed_vehicle(&self, plate_number: &str, capacity_slots: i32) -> Uuid {
        let id = Uuid::new_v4();
        vehicle::ActiveModel {
            id: Set(id),
            plate_number: Set(plate_number.to_string()),
            model: Set(Some("Test Van".to_string())),
            capacity_slots: Set(capacity_slots),
            active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed vehicle");
        id
    }

    /// Inserts a slot cost configuration row for a packaging type.
    pub async fn seed_slot_cost(&self, packaging_type: PackagingType, slot_cost: Decimal) {
        slot_cost_config::ActiveModel {
            id: Set(Uuid::new_v4()),
            packaging_type: Set(packaging_type),
            slot_cost: Set(slot_cost),
            updated_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed slot cost config");
    }
}
