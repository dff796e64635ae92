use async_trait::async_trait;
use praetoria_core::{AppResult, PrincipalId};
use praetoria_domain::AuditAction;

/// Audit trail entry appended by administrative use-cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Acting principal.
    pub principal_id: PrincipalId,
    /// Stable action identifier.
    pub action: AuditAction,
    /// Affected resource type.
    pub resource_type: String,
    /// Affected resource identifier.
    pub resource_id: String,
    /// Optional event detail.
    pub detail: Option<String>,
}

/// Repository port for the append-only audit trail.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Appends one audit event.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}
