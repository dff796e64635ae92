use serde::{Deserialize, Serialize};

use crate::PrincipalId;

/// Identity resolved by the authenticating gateway for the current request.
///
/// Credentials are verified upstream; this value is trusted as-is and passed
/// explicitly through the call chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    principal_id: PrincipalId,
    display_name: String,
    email: Option<String>,
}

impl UserIdentity {
    /// Creates a user identity from gateway-supplied attributes.
    #[must_use]
    pub fn new(
        principal_id: PrincipalId,
        display_name: impl Into<String>,
        email: Option<String>,
    ) -> Self {
        Self {
            principal_id,
            display_name: display_name.into(),
            email,
        }
    }

    /// Returns the stable principal identifier.
    #[must_use]
    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the email, if the gateway supplied one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}
