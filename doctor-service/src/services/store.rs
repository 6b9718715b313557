use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use service_core::error::AppError;
use std::sync::Arc;

use crate::models::{Appointment, AppointmentStatus};

#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
}

/// Persistence for appointments, scoped by the owning doctor.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Appointments owned by `doctor_id`, earliest first.
    async fn list_for_doctor(
        &self,
        doctor_id: &str,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, AppError>;

    /// Cancel a scheduled appointment owned by `doctor_id`.
    ///
    /// Unknown ids and appointments owned by another doctor are both
    /// `NotFound`. Appointments that are not scheduled are `Conflict`.
    async fn cancel(
        &self,
        doctor_id: &str,
        appointment_id: &str,
        reason: Option<String>,
    ) -> Result<Appointment, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

/// Process-local store used in development and tests.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    appointments: Arc<DashMap<String, Appointment>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, appointment: Appointment) {
        self.appointments
            .insert(appointment.id.clone(), appointment);
    }

    pub fn get(&self, appointment_id: &str) -> Option<Appointment> {
        self.appointments
            .get(appointment_id)
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl AppointmentStore for InMemoryStore {
    async fn list_for_doctor(
        &self,
        doctor_id: &str,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, AppError> {
        let mut appointments: Vec<Appointment> = self
            .appointments
            .iter()
            .filter(|entry| entry.doctor_id == doctor_id)
            .filter(|entry| filter.status.map_or(true, |status| entry.status == status))
            .map(|entry| entry.value().clone())
            .collect();

        appointments.sort_by(|a, b| {
            a.scheduled_at
                .cmp(&b.scheduled_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(appointments)
    }

    async fn cancel(
        &self,
        doctor_id: &str,
        appointment_id: &str,
        reason: Option<String>,
    ) -> Result<Appointment, AppError> {
        // The entry guard serializes concurrent cancels of the same appointment.
        let mut entry = self
            .appointments
            .get_mut(appointment_id)
            .filter(|entry| entry.doctor_id == doctor_id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Appointment not found")))?;

        entry.cancel(reason, Utc::now())?;

        Ok(entry.value().clone())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
