use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Enum representing the possible statuses of a delivery batch.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BatchStatus {
    #[sea_orm(string_value = "planned")]
    Planned,
    #[sea_orm(string_value = "assigned")]
    Assigned,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Batches still accepting planning changes (driver/vehicle/stops).
    pub fn is_pre_lock(&self) -> bool {
        matches!(self, Self::Planned | Self::Assigned)
    }

    /// Returns whether a transition from `self` to `to` is allowed.
    ///
    /// Cancellation is only reachable pre-lock; a locked (in-progress) batch
    /// requires a compensating workflow that this graph deliberately omits.
    pub fn can_transition_to(&self, to: Self) -> bool {
        use BatchStatus::*;
        match (self, to) {
            (Planned, Assigned) | (Planned, InProgress) | (Planned, Cancelled) => true,
            (Assigned, InProgress) | (Assigned, Cancelled) => true,
            (InProgress, Completed) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Iterable;

    #[test]
    fn locked_batch_cannot_be_cancelled() {
        assert!(!BatchStatus::InProgress.can_transition_to(BatchStatus::Cancelled));
    }

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        for to in BatchStatus::iter() {
            assert!(!BatchStatus::Completed.can_transition_to(to));
            assert!(!BatchStatus::Cancelled.can_transition_to(to));
        }
    }

    #[test]
    fn pre_lock_states() {
        assert!(BatchStatus::Planned.is_pre_lock());
        assert!(BatchStatus::Assigned.is_pre_lock());
        assert!(!BatchStatus::InProgress.is_pre_lock());
        assert!(!BatchStatus::Completed.is_pre_lock());
    }
}
