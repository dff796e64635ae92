use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use praetoria_core::{AppResult, PrincipalId};
use praetoria_domain::{Permission, PermissionId};
use uuid::Uuid;

/// Stable role identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Role definition returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDefinition {
    /// Stable role identifier.
    pub role_id: RoleId,
    /// Unique role name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Indicates an administratively created role; system roles are seeded.
    pub is_custom: bool,
    /// Effective permission grants.
    pub permissions: Vec<Permission>,
    /// Number of principals currently holding the role. Derived at read
    /// time, never stored.
    pub member_count: u64,
}

/// Edge between a principal and a role, with audit fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleAssignment {
    /// Principal holding the role.
    pub principal_id: PrincipalId,
    /// Held role.
    pub role_id: RoleId,
    /// Administrator who made the assignment.
    pub assigned_by: PrincipalId,
    /// Assignment timestamp.
    pub assigned_at: DateTime<Utc>,
}

/// Input payload for creating custom roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Unique role name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Permissions to attach to the role.
    pub permission_ids: Vec<PermissionId>,
}

/// Partial update payload for roles.
///
/// A supplied `permission_ids` replaces the whole association set; it is
/// never merged with the existing grants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRoleInput {
    /// New role name, if changing.
    pub name: Option<String>,
    /// New description, if changing.
    pub description: Option<String>,
    /// Replacement permission set, if changing.
    pub permission_ids: Option<Vec<PermissionId>>,
}

/// Read-time grouping of the permission catalog by category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGroup {
    /// Grouping label.
    pub category: String,
    /// Permissions in the category, ordered by name.
    pub permissions: Vec<Permission>,
}

/// Repository port for the durable role directory.
#[async_trait]
pub trait RoleDirectoryRepository: Send + Sync {
    /// Lists role assignments held by a principal.
    async fn list_assignments_for_principal(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Vec<RoleAssignment>>;

    /// Lists all permissions attached to any of the given roles.
    async fn list_permissions_for_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<Permission>>;

    /// Creates a role and attaches its grants atomically.
    async fn insert_role(&self, input: CreateRoleInput) -> AppResult<RoleDefinition>;

    /// Updates a role; a supplied permission set replaces the existing
    /// associations inside one transaction.
    async fn update_role(
        &self,
        role_id: RoleId,
        input: UpdateRoleInput,
    ) -> AppResult<RoleDefinition>;

    /// Deletes a role, cascading association and assignment rows.
    async fn delete_role(&self, role_id: RoleId) -> AppResult<()>;

    /// Finds one role with its grants and member count.
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<RoleDefinition>>;

    /// Lists all roles ordered by name.
    async fn list_roles(&self) -> AppResult<Vec<RoleDefinition>>;

    /// Lists the full permission catalog.
    async fn list_permissions(&self) -> AppResult<Vec<Permission>>;

    /// Counts principals currently holding the role.
    async fn count_assignments_for_role(&self, role_id: RoleId) -> AppResult<u64>;

    /// Lists principals currently holding the role.
    async fn list_principals_for_role(&self, role_id: RoleId) -> AppResult<Vec<PrincipalId>>;

    /// Lists all current role assignments.
    async fn list_assignments(&self) -> AppResult<Vec<RoleAssignment>>;

    /// Records a role assignment.
    async fn insert_assignment(&self, assignment: RoleAssignment) -> AppResult<()>;

    /// Removes a role assignment.
    async fn delete_assignment(&self, principal_id: PrincipalId, role_id: RoleId)
    -> AppResult<()>;
}
