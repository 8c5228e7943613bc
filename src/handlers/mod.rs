pub mod batches;
pub mod requisitions;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{BatchService, PackagingService, RequisitionService};

/// Aggregated service container handed to HTTP handlers via `AppState`.
#[derive(Clone)]
pub struct AppServices {
    pub requisitions: Arc<RequisitionService>,
    pub packaging: Arc<PackagingService>,
    pub batches: Arc<BatchService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let requisitions = Arc::new(RequisitionService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let packaging = Arc::new(PackagingService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let batches = Arc::new(BatchService::new(db_pool, Some(event_sender)));

        Self {
            requisitions,
            packaging,
            batches,
        }
    }
}
