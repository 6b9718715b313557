use crate::models::{Appointment, AppointmentStatus};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize)]
pub struct AppointmentResponse {
    pub id: String,
    pub doctor_id: String,
    pub patient_id: String,
    pub scheduled_at: String,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub cancelled_at: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Appointment> for AppointmentResponse {
    fn from(appointment: Appointment) -> Self {
        Self {
            id: appointment.id,
            doctor_id: appointment.doctor_id,
            patient_id: appointment.patient_id,
            scheduled_at: appointment.scheduled_at.to_rfc3339(),
            reason: appointment.reason,
            status: appointment.status,
            cancelled_at: appointment
                .cancelled_at
                .map(|at| at.to_chrono().to_rfc3339()),
            cancellation_reason: appointment.cancellation_reason,
            created_at: appointment.created_at.to_rfc3339(),
            updated_at: appointment.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AppointmentListParams {
    /// Raw status filter; parsed by the handler so a bad value gets the
    /// service's JSON error body.
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppointmentListResponse {
    pub appointments: Vec<AppointmentResponse>,
    pub total: usize,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CancelAppointmentRequest {
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelAppointmentResponse {
    pub message: String,
    pub appointment: AppointmentResponse,
}
