pub mod appointments;
pub mod health;

pub use appointments::{cancel_appointment, list_appointments, route_not_found};
pub use health::{health_check, metrics_endpoint, readiness_check};
