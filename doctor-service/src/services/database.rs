use async_trait::async_trait;
use chrono::Utc;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{self, doc},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

use crate::models::{Appointment, AppointmentStatus};
use crate::services::store::{AppointmentFilter, AppointmentStore};

#[derive(Clone)]
pub struct MongoStore {
    client: MongoClient,
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for doctor-service");

        let appointments = self.appointments();

        // Listing filters on the owner and sorts on the schedule
        let doctor_schedule_index = IndexModel::builder()
            .keys(doc! { "doctor_id": 1, "scheduled_at": 1 })
            .options(
                IndexOptions::builder()
                    .name("doctor_schedule_lookup".to_string())
                    .build(),
            )
            .build();

        appointments
            .create_index(doctor_schedule_index, None)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to create doctor_schedule index on appointments collection: {}",
                    e
                );
                AppError::from(e)
            })?;
        tracing::info!("Created index on appointments.(doctor_id, scheduled_at)");

        let doctor_status_index = IndexModel::builder()
            .keys(doc! { "doctor_id": 1, "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("doctor_status_lookup".to_string())
                    .build(),
            )
            .build();

        appointments
            .create_index(doctor_status_index, None)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to create doctor_status index on appointments collection: {}",
                    e
                );
                AppError::from(e)
            })?;
        tracing::info!("Created index on appointments.(doctor_id, status)");

        Ok(())
    }

    pub fn appointments(&self) -> Collection<Appointment> {
        self.db.collection("appointments")
    }
}

#[async_trait]
impl AppointmentStore for MongoStore {
    async fn list_for_doctor(
        &self,
        doctor_id: &str,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, AppError> {
        let mut query = doc! { "doctor_id": doctor_id };
        if let Some(status) = filter.status {
            query.insert("status", status.as_str());
        }

        let find_options = FindOptions::builder()
            .sort(doc! { "scheduled_at": 1, "_id": 1 })
            .build();

        let cursor = self
            .appointments()
            .find(query, find_options)
            .await
            .map_err(AppError::from)?;

        cursor.try_collect().await.map_err(AppError::from)
    }

    async fn cancel(
        &self,
        doctor_id: &str,
        appointment_id: &str,
        reason: Option<String>,
    ) -> Result<Appointment, AppError> {
        let existing = self
            .appointments()
            .find_one(doc! { "_id": appointment_id, "doctor_id": doctor_id }, None)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Appointment not found")))?;

        existing.ensure_cancellable()?;

        let now = bson::DateTime::from_chrono(Utc::now());
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        // Filtering on the current status makes the transition atomic.
        self.appointments()
            .find_one_and_update(
                doc! {
                    "_id": appointment_id,
                    "doctor_id": doctor_id,
                    "status": AppointmentStatus::Scheduled.as_str(),
                },
                doc! {
                    "$set": {
                        "status": AppointmentStatus::Cancelled.as_str(),
                        "cancelled_at": now,
                        "cancellation_reason": reason,
                        "updated_at": now,
                    }
                },
                options,
            )
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| {
                AppError::Conflict(anyhow::anyhow!("Appointment is no longer scheduled"))
            })
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }
}
