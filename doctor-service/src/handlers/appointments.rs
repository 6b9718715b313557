use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use metrics::counter;
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::{
    AppointmentListParams, AppointmentListResponse, AppointmentResponse,
    CancelAppointmentRequest, CancelAppointmentResponse,
};
use crate::middleware::AuthUser;
use crate::models::AppointmentStatus;
use crate::services::metrics::{APPOINTMENTS_CANCELLED_TOTAL, APPOINTMENTS_LISTED_TOTAL};
use crate::services::AppointmentFilter;
use crate::startup::AppState;

/// `GET /api/doctors/appointments`: the calling doctor's appointments.
pub async fn list_appointments(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(params): Query<AppointmentListParams>,
) -> Result<Json<AppointmentListResponse>, AppError> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<AppointmentStatus>)
        .transpose()
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let appointments = state
        .store
        .list_for_doctor(&identity.subject, &AppointmentFilter { status })
        .await?;

    counter!(APPOINTMENTS_LISTED_TOTAL).increment(1);
    tracing::debug!(
        doctor_id = %identity.subject,
        count = appointments.len(),
        "Listed appointments"
    );

    let appointments: Vec<AppointmentResponse> =
        appointments.into_iter().map(AppointmentResponse::from).collect();

    Ok(Json(AppointmentListResponse {
        total: appointments.len(),
        appointments,
    }))
}

/// `PUT /api/doctors/appointments/:id/cancel`: cancel one of the calling
/// doctor's scheduled appointments. The JSON body is optional.
pub async fn cancel_appointment(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(appointment_id): Path<String>,
    body: Bytes,
) -> Result<Json<CancelAppointmentResponse>, AppError> {
    let mut request = parse_cancel_request(&body)?;
    request.reason = request
        .reason
        .map(|reason| reason.trim().to_string())
        .filter(|reason| !reason.is_empty());
    request.validate()?;

    let reason = request.reason;

    let appointment = state
        .store
        .cancel(&identity.subject, &appointment_id, reason)
        .await
        .map_err(|e| {
            tracing::info!(
                doctor_id = %identity.subject,
                appointment_id = %appointment_id,
                reason = %e,
                "Appointment cancellation refused"
            );
            e
        })?;

    counter!(APPOINTMENTS_CANCELLED_TOTAL).increment(1);
    tracing::info!(
        doctor_id = %identity.subject,
        appointment_id = %appointment.id,
        "Appointment cancelled"
    );

    Ok(Json(CancelAppointmentResponse {
        message: "Appointment cancelled".to_string(),
        appointment: AppointmentResponse::from(appointment),
    }))
}

/// Fallback for anything under the doctor scope that matches no route.
/// Runs behind the same gates as the routes.
pub async fn route_not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Route not found"))
}

fn parse_cancel_request(body: &[u8]) -> Result<CancelAppointmentRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CancelAppointmentRequest::default());
    }

    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid request body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_means_no_reason() {
        assert!(parse_cancel_request(b"").unwrap().reason.is_none());
        assert!(parse_cancel_request(b"  \n").unwrap().reason.is_none());
        assert!(parse_cancel_request(b"{}").unwrap().reason.is_none());
    }

    #[test]
    fn test_reason_is_read_from_body() {
        let request = parse_cancel_request(br#"{"reason":"Clinic closed"}"#).unwrap();
        assert_eq!(request.reason.as_deref(), Some("Clinic closed"));
    }

    #[test]
    fn test_malformed_body_is_bad_request() {
        assert!(matches!(
            parse_cancel_request(b"{reason"),
            Err(AppError::BadRequest(_))
        ));
    }
}
