//! Route-level authorization guard.
//!
//! Checks run in the handler, before any service call, so domain and infra stay
//! auth-agnostic.

use axum::http::StatusCode;
use axum::response::Response;

use marketplace_auth::{Permission, authorize};

use crate::app::errors::json_error;
use crate::context::PrincipalContext;

/// Require `permission` for the current principal, or produce a 403 response.
pub fn require(principal: &PrincipalContext, permission: Permission) -> Result<(), Response> {
    authorize(principal.principal(), &permission)
        .map_err(|e| json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))
}
