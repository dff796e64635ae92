//! PostgreSQL-backed role directory.

use std::collections::BTreeSet;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use praetoria_application::{
    CreateRoleInput, RoleAssignment, RoleDefinition, RoleDirectoryRepository, RoleId,
    UpdateRoleInput,
};
use praetoria_core::{AppError, AppResult, PrincipalId};
use praetoria_domain::{Permission, PermissionAction, PermissionId};

/// PostgreSQL implementation of the role directory port.
#[derive(Clone)]
pub struct PostgresRoleDirectory {
    pool: PgPool,
}

impl PostgresRoleDirectory {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_role(&self, role_id: RoleId) -> AppResult<Option<RoleDefinition>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT
                roles.id,
                roles.name,
                roles.description,
                roles.is_custom,
                (
                    SELECT COUNT(*)
                    FROM access_role_assignments AS assignments
                    WHERE assignments.role_id = roles.id
                ) AS member_count
            FROM access_roles AS roles
            WHERE roles.id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load role: {error}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let permissions = self
            .list_permissions_for_roles(std::slice::from_ref(&role_id))
            .await?;

        Ok(Some(RoleDefinition {
            role_id,
            name: row.name,
            description: row.description,
            is_custom: row.is_custom,
            permissions,
            member_count: row.member_count.max(0) as u64,
        }))
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    #[allow(dead_code)]
    id: uuid::Uuid,
    name: String,
    description: String,
    is_custom: bool,
    member_count: i64,
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: uuid::Uuid,
    name: String,
    description: String,
    category: String,
    actions: Vec<String>,
    scope: Option<String>,
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    principal_id: uuid::Uuid,
    role_id: uuid::Uuid,
    assigned_by: uuid::Uuid,
    assigned_at: DateTime<Utc>,
}

const PERMISSION_COLUMNS: &str = r#"
    permissions.id,
    permissions.name,
    permissions.description,
    permissions.category,
    permissions.actions,
    permissions.scope
"#;

#[async_trait]
impl RoleDirectoryRepository for PostgresRoleDirectory {
    async fn list_assignments_for_principal(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Vec<RoleAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT principal_id, role_id, assigned_by, assigned_at
            FROM access_role_assignments
            WHERE principal_id = $1
            ORDER BY assigned_at
            "#,
        )
        .bind(principal_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list principal assignments: {error}"))
        })?;

        Ok(rows.into_iter().map(map_assignment_row).collect())
    }

    async fn list_permissions_for_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<Permission>> {
        let ids: Vec<uuid::Uuid> = role_ids.iter().map(RoleId::as_uuid).collect();
        let rows = sqlx::query_as::<_, PermissionRow>(&format!(
            r#"
            SELECT DISTINCT {PERMISSION_COLUMNS}
            FROM access_permissions AS permissions
            INNER JOIN access_role_permissions AS role_permissions
                ON role_permissions.permission_id = permissions.id
            WHERE role_permissions.role_id = ANY($1)
            "#
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list role permissions: {error}"))
        })?;

        rows.into_iter().map(map_permission_row).collect()
    }

    async fn insert_role(&self, input: CreateRoleInput) -> AppResult<RoleDefinition> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        let role_id = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            INSERT INTO access_roles (name, description, is_custom)
            VALUES ($1, $2, true)
            RETURNING id
            "#,
        )
        .bind(input.name.trim())
        .bind(input.description.as_str())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| map_role_name_conflict(error, input.name.as_str()))?;

        for permission_id in &input.permission_ids {
            attach_permission(&mut transaction, role_id, *permission_id).await?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        tracing::debug!(role_id = %role_id, "created role");

        self.load_role(RoleId::from_uuid(role_id))
            .await?
            .ok_or_else(|| AppError::Internal("created role vanished before read-back".to_owned()))
    }

    async fn update_role(
        &self,
        role_id: RoleId,
        input: UpdateRoleInput,
    ) -> AppResult<RoleDefinition> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        let rows_affected = sqlx::query(
            r#"
            UPDATE access_roles
            SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.description.as_deref())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            map_role_name_conflict(error, input.name.as_deref().unwrap_or_default())
        })?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!("role '{role_id}' was not found")));
        }

        // A supplied permission set replaces the associations wholesale.
        if let Some(permission_ids) = &input.permission_ids {
            sqlx::query(
                r#"
                DELETE FROM access_role_permissions
                WHERE role_id = $1
                "#,
            )
            .bind(role_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to clear role permissions: {error}"))
            })?;

            for permission_id in permission_ids {
                attach_permission(&mut transaction, role_id.as_uuid(), *permission_id).await?;
            }
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        self.load_role(role_id)
            .await?
            .ok_or_else(|| AppError::Internal("updated role vanished before read-back".to_owned()))
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM access_roles
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete role: {error}")))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!("role '{role_id}' was not found")));
        }

        tracing::debug!(role_id = %role_id, "deleted role");
        Ok(())
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<RoleDefinition>> {
        self.load_role(role_id).await
    }

    async fn list_roles(&self) -> AppResult<Vec<RoleDefinition>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT
                roles.id,
                roles.name,
                roles.description,
                roles.is_custom,
                (
                    SELECT COUNT(*)
                    FROM access_role_assignments AS assignments
                    WHERE assignments.role_id = roles.id
                ) AS member_count
            FROM access_roles AS roles
            ORDER BY roles.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        let mut roles = Vec::with_capacity(rows.len());
        for row in rows {
            let role_id = RoleId::from_uuid(row.id);
            let permissions = self
                .list_permissions_for_roles(std::slice::from_ref(&role_id))
                .await?;
            roles.push(RoleDefinition {
                role_id,
                name: row.name,
                description: row.description,
                is_custom: row.is_custom,
                permissions,
                member_count: row.member_count.max(0) as u64,
            });
        }

        Ok(roles)
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(&format!(
            r#"
            SELECT {PERMISSION_COLUMNS}
            FROM access_permissions AS permissions
            ORDER BY permissions.category, permissions.name
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list permissions: {error}")))?;

        rows.into_iter().map(map_permission_row).collect()
    }

    async fn count_assignments_for_role(&self, role_id: RoleId) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM access_role_assignments
            WHERE role_id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to count role assignments: {error}"))
        })?;

        Ok(count.max(0) as u64)
    }

    async fn list_principals_for_role(&self, role_id: RoleId) -> AppResult<Vec<PrincipalId>> {
        let principals = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT principal_id
            FROM access_role_assignments
            WHERE role_id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list role principals: {error}"))
        })?;

        Ok(principals.into_iter().map(PrincipalId::from_uuid).collect())
    }

    async fn list_assignments(&self) -> AppResult<Vec<RoleAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT principal_id, role_id, assigned_by, assigned_at
            FROM access_role_assignments
            ORDER BY assigned_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list assignments: {error}")))?;

        Ok(rows.into_iter().map(map_assignment_row).collect())
    }

    async fn insert_assignment(&self, assignment: RoleAssignment) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO access_role_assignments (principal_id, role_id, assigned_by, assigned_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (principal_id, role_id) DO NOTHING
            "#,
        )
        .bind(assignment.principal_id.as_uuid())
        .bind(assignment.role_id.as_uuid())
        .bind(assignment.assigned_by.as_uuid())
        .bind(assignment.assigned_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert assignment: {error}")))?;

        Ok(())
    }

    async fn delete_assignment(
        &self,
        principal_id: PrincipalId,
        role_id: RoleId,
    ) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM access_role_assignments
            WHERE principal_id = $1 AND role_id = $2
            "#,
        )
        .bind(principal_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete assignment: {error}")))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "assignment '{principal_id}:{role_id}' was not found"
            )));
        }

        Ok(())
    }
}

async fn attach_permission(
    transaction: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    role_id: uuid::Uuid,
    permission_id: PermissionId,
) -> AppResult<()> {
    let rows_affected = sqlx::query(
        r#"
        INSERT INTO access_role_permissions (role_id, permission_id)
        SELECT $1, id
        FROM access_permissions
        WHERE id = $2
        ON CONFLICT (role_id, permission_id) DO NOTHING
        "#,
    )
    .bind(role_id)
    .bind(permission_id.as_uuid())
    .execute(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to attach permission: {error}")))?
    .rows_affected();

    if rows_affected == 0 {
        return Err(AppError::NotFound(format!(
            "permission '{permission_id}' was not found"
        )));
    }

    Ok(())
}

fn map_assignment_row(row: AssignmentRow) -> RoleAssignment {
    RoleAssignment {
        principal_id: PrincipalId::from_uuid(row.principal_id),
        role_id: RoleId::from_uuid(row.role_id),
        assigned_by: PrincipalId::from_uuid(row.assigned_by),
        assigned_at: row.assigned_at,
    }
}

fn map_permission_row(row: PermissionRow) -> AppResult<Permission> {
    let actions = row
        .actions
        .iter()
        .map(|action| {
            PermissionAction::from_str(action).map_err(|_| {
                AppError::Internal(format!(
                    "permission '{}' carries unknown action '{action}'",
                    row.name
                ))
            })
        })
        .collect::<AppResult<BTreeSet<_>>>()?;

    Ok(Permission {
        id: PermissionId::from_uuid(row.id),
        name: row.name,
        description: row.description,
        category: row.category,
        actions,
        scope: row.scope,
    })
}

fn map_role_name_conflict(error: sqlx::Error, role_name: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!("role '{role_name}' already exists"));
    }

    AppError::Internal(format!("failed to persist role: {error}"))
}
