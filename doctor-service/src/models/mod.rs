pub mod appointment;
pub mod identity;

pub use appointment::{Appointment, AppointmentStatus};
pub use identity::{Identity, DOCTOR_ROLE};
