//! Static role capability table.
//!
//! Every HTTP handler names the [`Action`] it performs and asks
//! [`authorize`] what scope the caller's [`Role`] has over it. Handlers never
//! branch on the role directly.

use serde::Serialize;

use crate::Role;

/// Something a user can attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Register and deactivate login accounts.
    ManageUsers,
    /// Change a user's role.
    AssignRoles,
    ReadEmployees,
    ManageEmployees,
    ReadProperties,
    /// Create and update listings, their images, documents and status.
    ManageProperties,
    DeleteProperties,
    ReadClients,
    /// Create and update clients and append interactions.
    ManageClients,
    ReadVisits,
    /// Create, reschedule, cancel and reassign visits.
    ScheduleVisits,
    RecordVisitOutcome,
    ReadOperations,
    /// Create, recompute and finalize operations.
    ManageOperations,
    UpdatePaymentStatus,
    ReadReports,
}

impl Action {
    /// All actions, in declaration order.
    pub const ALL: &'static [Self] = &[
        Self::ManageUsers,
        Self::AssignRoles,
        Self::ReadEmployees,
        Self::ManageEmployees,
        Self::ReadProperties,
        Self::ManageProperties,
        Self::DeleteProperties,
        Self::ReadClients,
        Self::ManageClients,
        Self::ReadVisits,
        Self::ScheduleVisits,
        Self::RecordVisitOutcome,
        Self::ReadOperations,
        Self::ManageOperations,
        Self::UpdatePaymentStatus,
        Self::ReadReports,
    ];
}

/// Scope of a granted action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// Every record.
    Any,
    /// Only records tied to the caller's own employee profile.
    Own,
    Denied,
}

impl Access {
    /// Whether the action is allowed at all.
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        !matches!(self, Self::Denied)
    }

    /// Whether the caller is restricted to their own records.
    #[must_use]
    pub const fn is_own_only(self) -> bool {
        matches!(self, Self::Own)
    }
}

/// Look up the access `role` has for `action`.
#[must_use]
pub const fn authorize(role: Role, action: Action) -> Access {
    use Action::{
        AssignRoles, DeleteProperties, ManageClients, ManageEmployees, ManageOperations,
        ManageProperties, ManageUsers, ReadClients, ReadEmployees, ReadOperations,
        ReadProperties, ReadReports, ReadVisits, RecordVisitOutcome, ScheduleVisits,
        UpdatePaymentStatus,
    };

    match role {
        Role::Broker => Access::Any,
        Role::Secretary => match action {
            ManageUsers | AssignRoles | ManageEmployees => Access::Denied,
            ReadEmployees | ReadProperties | ManageProperties | DeleteProperties
            | ReadClients | ManageClients | ReadVisits | ScheduleVisits
            | RecordVisitOutcome | ReadOperations | ManageOperations
            | UpdatePaymentStatus | ReadReports => Access::Any,
        },
        Role::Advisor => match action {
            ReadProperties | ReadVisits | RecordVisitOutcome | ReadReports => Access::Own,
            ManageUsers | AssignRoles | ReadEmployees | ManageEmployees
            | ManageProperties | DeleteProperties | ReadClients | ManageClients
            | ScheduleVisits | ReadOperations | ManageOperations
            | UpdatePaymentStatus => Access::Denied,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected(role: Role, action: Action) -> Access {
        use Access::{Any, Denied, Own};
        // (action, broker, secretary, advisor)
        let table = [
            (Action::ManageUsers, Any, Denied, Denied),
            (Action::AssignRoles, Any, Denied, Denied),
            (Action::ReadEmployees, Any, Any, Denied),
            (Action::ManageEmployees, Any, Denied, Denied),
            (Action::ReadProperties, Any, Any, Own),
            (Action::ManageProperties, Any, Any, Denied),
            (Action::DeleteProperties, Any, Any, Denied),
            (Action::ReadClients, Any, Any, Denied),
            (Action::ManageClients, Any, Any, Denied),
            (Action::ReadVisits, Any, Any, Own),
            (Action::ScheduleVisits, Any, Any, Denied),
            (Action::RecordVisitOutcome, Any, Any, Own),
            (Action::ReadOperations, Any, Any, Denied),
            (Action::ManageOperations, Any, Any, Denied),
            (Action::UpdatePaymentStatus, Any, Any, Denied),
            (Action::ReadReports, Any, Any, Own),
        ];
        let row = table
            .iter()
            .find(|(a, ..)| *a == action)
            .map(|(_, b, s, a)| match role {
                Role::Broker => *b,
                Role::Secretary => *s,
                Role::Advisor => *a,
            });
        row.unwrap_or(Denied)
    }

    #[test]
    fn test_matrix_matches_capability_table() {
        for role in Role::ALL {
            for action in Action::ALL {
                assert_eq!(
                    authorize(*role, *action),
                    expected(*role, *action),
                    "{role} / {action:?}"
                );
            }
        }
    }

    #[test]
    fn test_broker_is_allowed_everything() {
        assert!(
            Action::ALL
                .iter()
                .all(|a| authorize(Role::Broker, *a) == Access::Any)
        );
    }

    #[test]
    fn test_advisor_cannot_delete_property() {
        let access = authorize(Role::Advisor, Action::DeleteProperties);
        assert!(!access.is_allowed());
    }

    #[test]
    fn test_secretary_cannot_assign_roles() {
        assert_eq!(authorize(Role::Secretary, Action::AssignRoles), Access::Denied);
        assert_eq!(
            authorize(Role::Secretary, Action::ScheduleVisits),
            Access::Any
        );
    }

    #[test]
    fn test_advisor_own_scope() {
        let access = authorize(Role::Advisor, Action::RecordVisitOutcome);
        assert!(access.is_allowed());
        assert!(access.is_own_only());
    }
}
