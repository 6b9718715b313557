pub mod appointments;

pub use appointments::{
    AppointmentListParams, AppointmentListResponse, AppointmentResponse,
    CancelAppointmentRequest, CancelAppointmentResponse,
};
