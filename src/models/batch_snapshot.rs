use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current snapshot schema version. Bump when the frozen shape changes.
pub const SNAPSHOT_VERSION: i32 = 1;

/// Immutable record of a delivery batch's dispatch-relevant state, built once
/// when dispatch starts and never mutated afterwards.
///
/// Stored serialized on the batch row; the `snapshot_version` tag allows later
/// schema evolution without reinterpreting old snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchSnapshot {
    pub snapshot_version: i32,
    pub batch_id: Uuid,
    pub batch_number: String,
    pub warehouse_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub facility_ids: Vec<Uuid>,
    /// Route geometry and stop ordering, produced by the external optimizer.
    /// Carried opaquely; never interpreted here.
    pub optimized_route: Option<serde_json::Value>,
    /// Sum of rounded slot demand over the requisitions assigned at lock time.
    pub total_slot_demand: Decimal,
    pub requisition_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn snapshot_round_trips_through_json() {
        let snapshot = BatchSnapshot {
            snapshot_version: SNAPSHOT_VERSION,
            batch_id: Uuid::new_v4(),
            batch_number: "DB-2025-0042".to_string(),
            warehouse_id: Uuid::new_v4(),
            vehicle_id: Some(Uuid::new_v4()),
            driver_id: Some(Uuid::new_v4()),
            facility_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
            optimized_route: Some(serde_json::json!({"stops": [1, 2], "geometry": "opaque"})),
            total_slot_demand: dec!(12),
            requisition_ids: vec![Uuid::new_v4()],
            created_at: Utc::now(),
        };

        let raw = serde_json::to_value(&snapshot).expect("serialize snapshot");
        assert_eq!(raw["snapshot_version"], 1);
        let restored: BatchSnapshot = serde_json::from_value(raw).expect("deserialize snapshot");
        assert_eq!(restored, snapshot);
    }
}
