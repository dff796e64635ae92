use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use praetoria_core::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Verbs a permission may authorize on its resource class.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PermissionAction {
    /// Create new resources.
    Create,
    /// Read existing resources.
    Read,
    /// Update existing resources.
    Update,
    /// Delete existing resources.
    Delete,
    /// Full administrative control over the resource class.
    Manage,
    /// Approve pending resources.
    Approve,
    /// Assign resources to other principals.
    Assign,
    /// Share resources with other principals.
    Share,
}

impl PermissionAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Manage => "manage",
            Self::Approve => "approve",
            Self::Assign => "assign",
            Self::Share => "share",
        }
    }

    /// Returns all known actions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[PermissionAction] = &[
            PermissionAction::Create,
            PermissionAction::Read,
            PermissionAction::Update,
            PermissionAction::Delete,
            PermissionAction::Manage,
            PermissionAction::Approve,
            PermissionAction::Assign,
            PermissionAction::Share,
        ];

        ALL
    }
}

impl FromStr for PermissionAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "manage" => Ok(Self::Manage),
            "approve" => Ok(Self::Approve),
            "assign" => Ok(Self::Assign),
            "share" => Ok(Self::Share),
            _ => Err(AppError::Validation(format!(
                "unknown permission action '{value}'"
            ))),
        }
    }
}

/// Stable permission identifier.
///
/// Permission identity, not content, is the deduplication key when effective
/// permission sets are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionId(Uuid);

impl PermissionId {
    /// Creates a random permission identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a permission identifier from an existing UUID value.
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

impl Default for PermissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PermissionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A named capability grantable through roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Stable permission identifier.
    pub id: PermissionId,
    /// Unique capability name, e.g. `document_create`.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Grouping label for presentation, e.g. "Document Management".
    pub category: String,
    /// Verbs this permission authorizes.
    pub actions: BTreeSet<PermissionAction>,
    /// Optional resource class the permission is narrowed to.
    pub scope: Option<String>,
}

impl Permission {
    /// Returns whether this permission satisfies the given constraints.
    ///
    /// The name must match exactly; a required scope excludes permissions
    /// without that scope; a required action must be in the action set.
    #[must_use]
    pub fn satisfies(
        &self,
        name: &str,
        scope: Option<&str>,
        action: Option<PermissionAction>,
    ) -> bool {
        if self.name != name {
            return false;
        }

        if let Some(required_scope) = scope
            && self.scope.as_deref() != Some(required_scope)
        {
            return false;
        }

        if let Some(required_action) = action
            && !self.actions.contains(&required_action)
        {
            return false;
        }

        true
    }
}
