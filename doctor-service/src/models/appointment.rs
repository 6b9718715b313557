use chrono::{DateTime, Utc};
use mongodb::bson;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            "completed" => Ok(AppointmentStatus::Completed),
            _ => Err(format!("Invalid appointment status: {}", s)),
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(rename = "_id")]
    pub id: String,
    pub doctor_id: String,
    pub patient_id: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub scheduled_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub cancelled_at: Option<bson::DateTime>,
    pub cancellation_reason: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn new(
        doctor_id: impl Into<String>,
        patient_id: impl Into<String>,
        scheduled_at: DateTime<Utc>,
        reason: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            doctor_id: doctor_id.into(),
            patient_id: patient_id.into(),
            scheduled_at,
            reason,
            status: AppointmentStatus::Scheduled,
            cancelled_at: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Only scheduled appointments can be cancelled. Cancelling twice is a
    /// conflict, not a no-op.
    pub fn ensure_cancellable(&self) -> Result<(), AppError> {
        match self.status {
            AppointmentStatus::Scheduled => Ok(()),
            AppointmentStatus::Cancelled => Err(AppError::Conflict(anyhow::anyhow!(
                "Appointment is already cancelled"
            ))),
            AppointmentStatus::Completed => Err(AppError::Conflict(anyhow::anyhow!(
                "Completed appointments cannot be cancelled"
            ))),
        }
    }

    pub fn cancel(&mut self, reason: Option<String>, now: DateTime<Utc>) -> Result<(), AppError> {
        self.ensure_cancellable()?;
        self.status = AppointmentStatus::Cancelled;
        self.cancelled_at = Some(bson::DateTime::from_chrono(now));
        self.cancellation_reason = reason;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn scheduled() -> Appointment {
        Appointment::new("doc-1", "pat-1", Utc::now() + Duration::days(1), None)
    }

    #[test]
    fn test_cancel_scheduled_appointment() {
        let mut appointment = scheduled();
        let now = Utc::now();

        appointment
            .cancel(Some("Doctor unavailable".to_string()), now)
            .unwrap();

        assert_eq!(appointment.status, AppointmentStatus::Cancelled);
        assert_eq!(
            appointment.cancellation_reason.as_deref(),
            Some("Doctor unavailable")
        );
        assert_eq!(appointment.updated_at, now);
        assert!(appointment.cancelled_at.is_some());
    }

    #[test]
    fn test_cancel_twice_is_conflict() {
        let mut appointment = scheduled();
        appointment.cancel(None, Utc::now()).unwrap();

        let err = appointment.cancel(None, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_completed_appointment_is_not_cancellable() {
        let mut appointment = scheduled();
        appointment.status = AppointmentStatus::Completed;

        assert!(matches!(
            appointment.ensure_cancellable(),
            Err(AppError::Conflict(_))
        ));
        assert_eq!(appointment.status, AppointmentStatus::Completed);
    }

    #[test]
    fn test_status_parsing_accepts_american_spelling() {
        assert_eq!(
            "canceled".parse::<AppointmentStatus>(),
            Ok(AppointmentStatus::Cancelled)
        );
        assert!("pending".parse::<AppointmentStatus>().is_err());
    }
}
