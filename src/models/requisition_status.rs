use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Enum representing the possible statuses of a facility requisition.
///
/// `Approved` is transient: approving a requisition computes its packaging and
/// advances it to `Packaged` inside the same transaction, so readers never
/// observe `Approved` durably in well-formed flows.
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
pub enum RequisitionStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "packaged")]
    Packaged,
    #[sea_orm(string_value = "ready_for_dispatch")]
    ReadyForDispatch,
    #[sea_orm(string_value = "assigned_to_batch")]
    AssignedToBatch,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "fulfilled")]
    Fulfilled,
    #[sea_orm(string_value = "partially_delivered")]
    PartiallyDelivered,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl RequisitionStatus {
    /// Terminal statuses have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Fulfilled
                | Self::PartiallyDelivered
                | Self::Failed
                | Self::Rejected
                | Self::Cancelled
        )
    }

    /// Returns whether a transition from `self` to `to` is allowed.
    ///
    /// `Approved -> Packaged` is system-only: it is performed by the packaging
    /// computation during approval, never by an external caller.
    pub fn can_transition_to(&self, to: Self) -> bool {
        use RequisitionStatus::*;
        match (self, to) {
            (Pending, Approved) | (Pending, Rejected) | (Pending, Cancelled) => true,

            (Approved, Packaged) | (Approved, Rejected) | (Approved, Cancelled) => true,

            (Packaged, ReadyForDispatch) | (Packaged, Cancelled) => true,

            (ReadyForDispatch, AssignedToBatch) | (ReadyForDispatch, Cancelled) => true,

            // Rollback to ready_for_dispatch is allowed when a planned batch is cancelled
            (AssignedToBatch, InTransit)
            | (AssignedToBatch, ReadyForDispatch)
            | (AssignedToBatch, Cancelled) => true,

            (InTransit, Fulfilled) | (InTransit, PartiallyDelivered) | (InTransit, Failed) => true,

            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Iterable;

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        for from in RequisitionStatus::iter() {
            if !from.is_terminal() {
                continue;
            }
            for to in RequisitionStatus::iter() {
                assert!(
                    !from.can_transition_to(to),
                    "terminal {from} must not transition to {to}"
                );
            }
        }
    }

    #[test]
    fn transition_closure_matches_defined_graph() {
        use RequisitionStatus::*;
        let allowed: &[(RequisitionStatus, RequisitionStatus)] = &[
            (Pending, Approved),
            (Pending, Rejected),
            (Pending, Cancelled),
            (Approved, Packaged),
            (Approved, Rejected),
            (Approved, Cancelled),
            (Packaged, ReadyForDispatch),
            (Packaged, Cancelled),
            (ReadyForDispatch, AssignedToBatch),
            (ReadyForDispatch, Cancelled),
            (AssignedToBatch, InTransit),
            (AssignedToBatch, ReadyForDispatch),
            (AssignedToBatch, Cancelled),
            (InTransit, Fulfilled),
            (InTransit, PartiallyDelivered),
            (InTransit, Failed),
        ];

        for from in RequisitionStatus::iter() {
            for to in RequisitionStatus::iter() {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "transition {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn display_uses_snake_case_wire_values() {
        assert_eq!(
            RequisitionStatus::ReadyForDispatch.to_string(),
            "ready_for_dispatch"
        );
        assert_eq!(RequisitionStatus::InTransit.to_string(), "in_transit");
        assert_eq!(
            RequisitionStatus::PartiallyDelivered.to_string(),
            "partially_delivered"
        );
    }
}
