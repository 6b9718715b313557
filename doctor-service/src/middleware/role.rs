use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use std::sync::Arc;

use crate::models::{Identity, DOCTOR_ROLE};

/// The set of roles a caller must hold. Passes when every required role is
/// granted to the identity.
#[derive(Debug, Clone)]
pub struct RoleRequirement {
    required: Arc<[String]>,
}

impl RoleRequirement {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn doctor() -> Self {
        Self::new([DOCTOR_ROLE])
    }

    pub fn permits(&self, identity: &Identity) -> bool {
        self.required
            .iter()
            .all(|role| identity.has_capability(role))
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }
}

/// Authorization gate. Must be layered inside the authentication gate: it
/// only inspects the identity that gate attached.
pub async fn require_role(
    State(requirement): State<RoleRequirement>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = req.extensions().get::<Identity>().ok_or_else(|| {
        AppError::InternalError(anyhow::anyhow!(
            "Identity missing from request extensions"
        ))
    })?;

    if !requirement.permits(identity) {
        tracing::warn!(
            subject = %identity.subject,
            role = %identity.role,
            required_roles = ?requirement.required(),
            "Insufficient role"
        );

        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Insufficient role. Required: {}",
            requirement.required().join(", ")
        )));
    }

    Ok(next.run(req).await)
}
