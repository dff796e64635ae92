use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use praetoria_core::{AppError, AppResult, NonEmptyString, PrincipalId};
use praetoria_domain::{AuditAction, Permission};

use crate::access_ports::{
    AuditEvent, AuditRepository, CreateRoleInput, PermissionGroup, RoleAssignment, RoleDefinition,
    RoleDirectoryRepository, RoleId, UpdateRoleInput,
};
use crate::permission_store::PermissionStore;

/// Permission required for every administrative role operation.
pub const ROLES_MANAGE_PERMISSION: &str = "roles_manage";

/// Administrative use-cases over roles, grants, and assignments.
///
/// Every mutation authorizes the acting principal, writes through the
/// directory repository, invalidates affected cache entries after the
/// write commits, and appends an audit event.
#[derive(Clone)]
pub struct RoleRegistry {
    repository: Arc<dyn RoleDirectoryRepository>,
    permission_store: PermissionStore,
    audit: Arc<dyn AuditRepository>,
}

impl RoleRegistry {
    /// Creates the registry from its collaborators.
    #[must_use]
    pub fn new(
        repository: Arc<dyn RoleDirectoryRepository>,
        permission_store: PermissionStore,
        audit: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            repository,
            permission_store,
            audit,
        }
    }

    /// Lists all roles with grants and member counts.
    pub async fn list_roles(&self, actor: PrincipalId) -> AppResult<Vec<RoleDefinition>> {
        self.permission_store
            .require_permission(actor, ROLES_MANAGE_PERMISSION)
            .await?;

        self.repository.list_roles().await
    }

    /// Returns one role by identifier.
    pub async fn get_role(&self, actor: PrincipalId, role_id: RoleId) -> AppResult<RoleDefinition> {
        self.permission_store
            .require_permission(actor, ROLES_MANAGE_PERMISSION)
            .await?;

        self.repository
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))
    }

    /// Creates a custom role with the given grants.
    pub async fn create_role(
        &self,
        actor: PrincipalId,
        input: CreateRoleInput,
    ) -> AppResult<RoleDefinition> {
        self.permission_store
            .require_permission(actor, ROLES_MANAGE_PERMISSION)
            .await?;

        let name = NonEmptyString::new(input.name)?;
        let input = CreateRoleInput {
            name: name.into(),
            ..input
        };

        let role = self.repository.insert_role(input).await?;

        self.append_audit(actor, AuditAction::RoleCreated, &role.role_id, None)
            .await?;
        Ok(role)
    }

    /// Updates a role's metadata and, for custom roles, its grants.
    ///
    /// Holders of the role are evicted from the permission cache only
    /// after the update commits.
    pub async fn update_role(
        &self,
        actor: PrincipalId,
        role_id: RoleId,
        input: UpdateRoleInput,
    ) -> AppResult<RoleDefinition> {
        self.permission_store
            .require_permission(actor, ROLES_MANAGE_PERMISSION)
            .await?;

        let existing = self
            .repository
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))?;

        if !existing.is_custom && input.permission_ids.is_some() {
            return Err(AppError::Conflict(format!(
                "system role '{}' cannot have its permissions changed",
                existing.name
            )));
        }

        let input = match input.name {
            Some(name) => {
                let name = NonEmptyString::new(name)?;
                UpdateRoleInput {
                    name: Some(name.into()),
                    ..input
                }
            }
            None => input,
        };

        let updated = self.repository.update_role(role_id, input).await?;

        self.permission_store.invalidate_role_holders(role_id).await?;
        self.append_audit(actor, AuditAction::RoleUpdated, &role_id, None)
            .await?;
        Ok(updated)
    }

    /// Deletes a custom role with no remaining members.
    pub async fn delete_role(&self, actor: PrincipalId, role_id: RoleId) -> AppResult<()> {
        self.permission_store
            .require_permission(actor, ROLES_MANAGE_PERMISSION)
            .await?;

        let existing = self
            .repository
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))?;

        if !existing.is_custom {
            return Err(AppError::Conflict(format!(
                "system role '{}' cannot be deleted",
                existing.name
            )));
        }

        let member_count = self.repository.count_assignments_for_role(role_id).await?;
        if member_count > 0 {
            return Err(AppError::Conflict(format!(
                "role '{}' still has {member_count} member(s); unassign them first",
                existing.name
            )));
        }

        // Capture holders before the rows are gone; deletion cascades the
        // assignment edges.
        let holders = self.repository.list_principals_for_role(role_id).await?;
        self.repository.delete_role(role_id).await?;

        for holder in holders {
            self.permission_store.invalidate(holder).await?;
        }
        self.append_audit(
            actor,
            AuditAction::RoleDeleted,
            &role_id,
            Some(existing.name),
        )
        .await
    }

    /// Assigns a role to a principal.
    pub async fn assign_role(
        &self,
        actor: PrincipalId,
        principal_id: PrincipalId,
        role_id: RoleId,
    ) -> AppResult<()> {
        self.permission_store
            .require_permission(actor, ROLES_MANAGE_PERMISSION)
            .await?;

        if self.repository.find_role(role_id).await?.is_none() {
            return Err(AppError::NotFound(format!("role '{role_id}' does not exist")));
        }

        self.repository
            .insert_assignment(RoleAssignment {
                principal_id,
                role_id,
                assigned_by: actor,
                assigned_at: Utc::now(),
            })
            .await?;

        self.permission_store.invalidate(principal_id).await?;
        self.append_audit(
            actor,
            AuditAction::RoleAssigned,
            &role_id,
            Some(principal_id.to_string()),
        )
        .await
    }

    /// Removes a role from a principal.
    pub async fn unassign_role(
        &self,
        actor: PrincipalId,
        principal_id: PrincipalId,
        role_id: RoleId,
    ) -> AppResult<()> {
        self.permission_store
            .require_permission(actor, ROLES_MANAGE_PERMISSION)
            .await?;

        self.repository
            .delete_assignment(principal_id, role_id)
            .await?;

        self.permission_store.invalidate(principal_id).await?;
        self.append_audit(
            actor,
            AuditAction::RoleUnassigned,
            &role_id,
            Some(principal_id.to_string()),
        )
        .await
    }

    /// Lists all current role assignments.
    pub async fn list_assignments(&self, actor: PrincipalId) -> AppResult<Vec<RoleAssignment>> {
        self.permission_store
            .require_permission(actor, ROLES_MANAGE_PERMISSION)
            .await?;

        self.repository.list_assignments().await
    }

    /// Returns the permission catalog grouped by category.
    pub async fn list_permission_groups(
        &self,
        actor: PrincipalId,
    ) -> AppResult<Vec<PermissionGroup>> {
        self.permission_store
            .require_permission(actor, ROLES_MANAGE_PERMISSION)
            .await?;

        let permissions = self.repository.list_permissions().await?;
        Ok(group_by_category(permissions))
    }

    async fn append_audit(
        &self,
        actor: PrincipalId,
        action: AuditAction,
        role_id: &RoleId,
        detail: Option<String>,
    ) -> AppResult<()> {
        self.audit
            .append_event(AuditEvent {
                principal_id: actor,
                action,
                resource_type: "role".to_owned(),
                resource_id: role_id.to_string(),
                detail,
            })
            .await
    }
}

fn group_by_category(permissions: Vec<Permission>) -> Vec<PermissionGroup> {
    let mut grouped: BTreeMap<String, Vec<Permission>> = BTreeMap::new();
    for permission in permissions {
        grouped
            .entry(permission.category.clone())
            .or_default()
            .push(permission);
    }

    grouped
        .into_iter()
        .map(|(category, mut permissions)| {
            permissions.sort_by(|left, right| left.name.cmp(&right.name));
            PermissionGroup {
                category,
                permissions,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use praetoria_core::{AppError, AppResult, PrincipalId};
    use praetoria_domain::{AuditAction, Permission, PermissionAction};
    use tokio::sync::Mutex;

    use crate::access_ports::{
        AuditEvent, AuditRepository, CreateRoleInput, PermissionCache, RoleAssignment,
        RoleDefinition, RoleDirectoryRepository, RoleId, UpdateRoleInput,
    };
    use crate::permission_store::PermissionStore;

    use super::{ROLES_MANAGE_PERMISSION, RoleRegistry, group_by_category};

    fn permission(name: &str, category: &str) -> Permission {
        Permission {
            id: praetoria_domain::PermissionId::new(),
            name: name.to_owned(),
            description: format!("{name} grant"),
            category: category.to_owned(),
            actions: [PermissionAction::Manage].into_iter().collect(),
            scope: None,
        }
    }

    fn role(name: &str, is_custom: bool) -> RoleDefinition {
        RoleDefinition {
            role_id: RoleId::new(),
            name: name.to_owned(),
            description: format!("{name} role"),
            is_custom,
            permissions: Vec::new(),
            member_count: 0,
        }
    }

    #[derive(Default)]
    struct FakeDirectory {
        roles: Mutex<Vec<RoleDefinition>>,
        assignments: Mutex<Vec<RoleAssignment>>,
        actor_permissions: Mutex<HashMap<PrincipalId, Vec<Permission>>>,
    }

    impl FakeDirectory {
        async fn grant_manage(&self, principal_id: PrincipalId) {
            self.actor_permissions.lock().await.insert(
                principal_id,
                vec![permission(ROLES_MANAGE_PERMISSION, "System Settings")],
            );
        }
    }

    #[async_trait]
    impl RoleDirectoryRepository for FakeDirectory {
        async fn list_assignments_for_principal(
            &self,
            principal_id: PrincipalId,
        ) -> AppResult<Vec<RoleAssignment>> {
            // Directly granted actors are modelled as holding a synthetic
            // role each.
            if self
                .actor_permissions
                .lock()
                .await
                .contains_key(&principal_id)
            {
                return Ok(vec![RoleAssignment {
                    principal_id,
                    role_id: RoleId::new(),
                    assigned_by: principal_id,
                    assigned_at: Utc::now(),
                }]);
            }

            Ok(self
                .assignments
                .lock()
                .await
                .iter()
                .filter(|assignment| assignment.principal_id == principal_id)
                .copied()
                .collect())
        }

        async fn list_permissions_for_roles(
            &self,
            _role_ids: &[RoleId],
        ) -> AppResult<Vec<Permission>> {
            Ok(Vec::new())
        }

        async fn insert_role(&self, input: CreateRoleInput) -> AppResult<RoleDefinition> {
            let created = RoleDefinition {
                role_id: RoleId::new(),
                name: input.name,
                description: input.description,
                is_custom: true,
                permissions: Vec::new(),
                member_count: 0,
            };
            self.roles.lock().await.push(created.clone());
            Ok(created)
        }

        async fn update_role(
            &self,
            role_id: RoleId,
            input: UpdateRoleInput,
        ) -> AppResult<RoleDefinition> {
            let mut roles = self.roles.lock().await;
            let role = roles
                .iter_mut()
                .find(|role| role.role_id == role_id)
                .ok_or_else(|| AppError::NotFound("role".to_owned()))?;
            if let Some(name) = input.name {
                role.name = name;
            }
            if let Some(description) = input.description {
                role.description = description;
            }
            Ok(role.clone())
        }

        async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
            self.roles.lock().await.retain(|role| role.role_id != role_id);
            self.assignments
                .lock()
                .await
                .retain(|assignment| assignment.role_id != role_id);
            Ok(())
        }

        async fn find_role(&self, role_id: RoleId) -> AppResult<Option<RoleDefinition>> {
            Ok(self
                .roles
                .lock()
                .await
                .iter()
                .find(|role| role.role_id == role_id)
                .cloned())
        }

        async fn list_roles(&self) -> AppResult<Vec<RoleDefinition>> {
            Ok(self.roles.lock().await.clone())
        }

        async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
            Ok(Vec::new())
        }

        async fn count_assignments_for_role(&self, role_id: RoleId) -> AppResult<u64> {
            Ok(self
                .assignments
                .lock()
                .await
                .iter()
                .filter(|assignment| assignment.role_id == role_id)
                .count() as u64)
        }

        async fn list_principals_for_role(&self, role_id: RoleId) -> AppResult<Vec<PrincipalId>> {
            Ok(self
                .assignments
                .lock()
                .await
                .iter()
                .filter(|assignment| assignment.role_id == role_id)
                .map(|assignment| assignment.principal_id)
                .collect())
        }

        async fn list_assignments(&self) -> AppResult<Vec<RoleAssignment>> {
            Ok(self.assignments.lock().await.clone())
        }

        async fn insert_assignment(&self, assignment: RoleAssignment) -> AppResult<()> {
            self.assignments.lock().await.push(assignment);
            Ok(())
        }

        async fn delete_assignment(
            &self,
            principal_id: PrincipalId,
            role_id: RoleId,
        ) -> AppResult<()> {
            self.assignments.lock().await.retain(|assignment| {
                !(assignment.principal_id == principal_id && assignment.role_id == role_id)
            });
            Ok(())
        }
    }

    /// Cache fake whose `get` answers from the actor permission table so
    /// authorization checks resolve without the repository join.
    struct ActorAwareCache {
        directory: Arc<FakeDirectory>,
        evictions: Mutex<Vec<PrincipalId>>,
    }

    #[async_trait]
    impl PermissionCache for ActorAwareCache {
        async fn get(&self, principal_id: PrincipalId) -> AppResult<Option<Vec<Permission>>> {
            Ok(self
                .directory
                .actor_permissions
                .lock()
                .await
                .get(&principal_id)
                .cloned())
        }

        async fn put(&self, _principal_id: PrincipalId, _: Vec<Permission>) -> AppResult<()> {
            Ok(())
        }

        async fn evict(&self, principal_id: PrincipalId) -> AppResult<()> {
            self.evictions.lock().await.push(principal_id);
            Ok(())
        }

        async fn clear(&self) -> AppResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingAudit {
        events: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditRepository for RecordingAudit {
        async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
            self.events.lock().await.push(event);
            Ok(())
        }
    }

    struct Harness {
        registry: RoleRegistry,
        directory: Arc<FakeDirectory>,
        cache: Arc<ActorAwareCache>,
        audit: Arc<RecordingAudit>,
        actor: PrincipalId,
    }

    async fn harness() -> Harness {
        let directory = Arc::new(FakeDirectory::default());
        let cache = Arc::new(ActorAwareCache {
            directory: directory.clone(),
            evictions: Mutex::new(Vec::new()),
        });
        let audit = Arc::new(RecordingAudit::default());
        let actor = PrincipalId::new();
        directory.grant_manage(actor).await;

        let store = PermissionStore::new(directory.clone(), cache.clone());
        let registry = RoleRegistry::new(directory.clone(), store, audit.clone());
        Harness {
            registry,
            directory,
            cache,
            audit,
            actor,
        }
    }

    fn create_input(name: &str) -> CreateRoleInput {
        CreateRoleInput {
            name: name.to_owned(),
            description: "incident reviewers".to_owned(),
            permission_ids: Vec::new(),
        }
    }

    #[tokio::test]
    async fn create_role_rejects_blank_name() {
        let harness = harness().await;

        let result = harness
            .registry
            .create_role(harness.actor, create_input("   "))
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn create_role_requires_manage_permission() {
        let harness = harness().await;
        let stranger = PrincipalId::new();

        let result = harness
            .registry
            .create_role(stranger, create_input("auditor"))
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn create_role_appends_audit_event() {
        let harness = harness().await;

        let result = harness
            .registry
            .create_role(harness.actor, create_input("auditor"))
            .await;
        assert!(result.is_ok());

        let events = harness.audit.events.lock().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, AuditAction::RoleCreated);
        assert_eq!(events[0].principal_id, harness.actor);
    }

    #[tokio::test]
    async fn system_role_permission_change_is_rejected() {
        let harness = harness().await;
        let system = role("admin", false);
        let role_id = system.role_id;
        harness.directory.roles.lock().await.push(system);

        let result = harness
            .registry
            .update_role(
                harness.actor,
                role_id,
                UpdateRoleInput {
                    permission_ids: Some(Vec::new()),
                    ..UpdateRoleInput::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn system_role_metadata_update_is_allowed() {
        let harness = harness().await;
        let system = role("admin", false);
        let role_id = system.role_id;
        harness.directory.roles.lock().await.push(system);

        let result = harness
            .registry
            .update_role(
                harness.actor,
                role_id,
                UpdateRoleInput {
                    description: Some("administrators".to_owned()),
                    ..UpdateRoleInput::default()
                },
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn update_role_evicts_current_holders() {
        let harness = harness().await;
        let custom = role("reviewer", true);
        let role_id = custom.role_id;
        harness.directory.roles.lock().await.push(custom);

        let holder = PrincipalId::new();
        harness.directory.assignments.lock().await.push(RoleAssignment {
            principal_id: holder,
            role_id,
            assigned_by: harness.actor,
            assigned_at: Utc::now(),
        });

        let result = harness
            .registry
            .update_role(
                harness.actor,
                role_id,
                UpdateRoleInput {
                    name: Some("incident reviewer".to_owned()),
                    ..UpdateRoleInput::default()
                },
            )
            .await;
        assert!(result.is_ok());

        let evictions = harness.cache.evictions.lock().await;
        assert!(evictions.contains(&holder));
    }

    #[tokio::test]
    async fn delete_system_role_is_rejected() {
        let harness = harness().await;
        let system = role("owner", false);
        let role_id = system.role_id;
        harness.directory.roles.lock().await.push(system);

        let result = harness.registry.delete_role(harness.actor, role_id).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(harness.directory.roles.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn delete_role_with_members_is_rejected() {
        let harness = harness().await;
        let custom = role("reviewer", true);
        let role_id = custom.role_id;
        harness.directory.roles.lock().await.push(custom);
        harness.directory.assignments.lock().await.push(RoleAssignment {
            principal_id: PrincipalId::new(),
            role_id,
            assigned_by: harness.actor,
            assigned_at: Utc::now(),
        });

        let result = harness.registry.delete_role(harness.actor, role_id).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn delete_empty_custom_role_succeeds_and_audits() {
        let harness = harness().await;
        let custom = role("reviewer", true);
        let role_id = custom.role_id;
        harness.directory.roles.lock().await.push(custom);

        let result = harness.registry.delete_role(harness.actor, role_id).await;
        assert!(result.is_ok());
        assert!(harness.directory.roles.lock().await.is_empty());

        let events = harness.audit.events.lock().await;
        assert_eq!(events.last().map(|event| event.action), Some(AuditAction::RoleDeleted));
    }

    #[tokio::test]
    async fn assign_role_records_actor_and_evicts_principal() {
        let harness = harness().await;
        let custom = role("reviewer", true);
        let role_id = custom.role_id;
        harness.directory.roles.lock().await.push(custom);

        let principal = PrincipalId::new();
        let result = harness
            .registry
            .assign_role(harness.actor, principal, role_id)
            .await;
        assert!(result.is_ok());

        let assignments = harness.directory.assignments.lock().await;
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].assigned_by, harness.actor);
        drop(assignments);

        assert!(harness.cache.evictions.lock().await.contains(&principal));
    }

    #[tokio::test]
    async fn assign_role_to_unknown_role_is_not_found() {
        let harness = harness().await;

        let result = harness
            .registry
            .assign_role(harness.actor, PrincipalId::new(), RoleId::new())
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn permission_catalog_groups_sort_by_category_and_name() {
        let groups = group_by_category(vec![
            permission("team_view", "Team Management"),
            permission("document_read", "Document Management"),
            permission("document_create", "Document Management"),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].category, "Document Management");
        assert_eq!(groups[0].permissions[0].name, "document_create");
        assert_eq!(groups[1].category, "Team Management");
    }
}
