pub mod auth;
pub mod role;

pub use auth::{auth_middleware, AuthUser};
pub use role::{require_role, RoleRequirement};
