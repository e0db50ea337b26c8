use thiserror::Error;

use crate::{Permission, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Check that `principal` holds `required` (directly or via the wildcard).
///
/// - No IO
/// - No panics
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let granted = principal
        .permissions
        .iter()
        .any(|p| p.is_wildcard() || p == required);

    if granted {
        Ok(())
    } else {
        tracing::debug!(user_id = %principal.user_id, permission = %required, "permission denied");
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}
