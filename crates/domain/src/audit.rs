use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by access-control use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a custom role is created.
    RoleCreated,
    /// Emitted when a role's definition or grants change.
    RoleUpdated,
    /// Emitted when a custom role is deleted.
    RoleDeleted,
    /// Emitted when a role is assigned to a principal.
    RoleAssigned,
    /// Emitted when a role is removed from a principal.
    RoleUnassigned,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleCreated => "access.role.created",
            Self::RoleUpdated => "access.role.updated",
            Self::RoleDeleted => "access.role.deleted",
            Self::RoleAssigned => "access.role.assigned",
            Self::RoleUnassigned => "access.role.unassigned",
        }
    }
}
