pub mod database;
pub mod jwt;
pub mod metrics;
pub mod store;

pub use database::MongoStore;
pub use jwt::{AccessTokenClaims, JwtService};
pub use metrics::{get_metrics, init_metrics};
pub use store::{AppointmentFilter, AppointmentStore, InMemoryStore};
