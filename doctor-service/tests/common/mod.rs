#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use doctor_service::config::{DoctorConfig, Environment, JwtConfig, StoreBackend, StoreConfig};
use doctor_service::models::Appointment;
use doctor_service::services::{AppointmentFilter, AppointmentStore, InMemoryStore, JwtService};
use doctor_service::{build_router, AppState};
use http_body_util::BodyExt;
use secrecy::Secret;
use service_core::config::Config as CoreConfig;
use service_core::error::AppError;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

pub const TEST_SECRET: &str = "doctor-service-test-secret";
pub const DOCTOR_ID: &str = "doc-1";
pub const OTHER_DOCTOR_ID: &str = "doc-2";
pub const PATIENT_ID: &str = "pat-1";

pub fn test_config() -> DoctorConfig {
    DoctorConfig {
        common: CoreConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
        },
        environment: Environment::Dev,
        service_name: "doctor-service".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        jwt: JwtConfig {
            secret: Secret::new(TEST_SECRET.to_string()),
            issuer: None,
            leeway_seconds: 0,
        },
        store: StoreConfig {
            backend: StoreBackend::Memory,
            mongodb: None,
        },
        allowed_origins: vec![],
    }
}

/// Wraps the in-memory store and records every call, so tests can tell
/// whether (and with what) a handler reached persistence.
#[derive(Default)]
pub struct CountingStore {
    pub inner: InMemoryStore,
    list_calls: Mutex<Vec<String>>,
    cancel_calls: Mutex<Vec<(String, String)>>,
    unreachable: AtomicBool,
}

impl CountingStore {
    pub fn list_calls(&self) -> Vec<String> {
        self.list_calls.lock().unwrap().clone()
    }

    pub fn cancel_calls(&self) -> Vec<(String, String)> {
        self.cancel_calls.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.list_calls().len() + self.cancel_calls().len()
    }

    /// Make `health_check` fail as if the backing database were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl AppointmentStore for CountingStore {
    async fn list_for_doctor(
        &self,
        doctor_id: &str,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, AppError> {
        self.list_calls.lock().unwrap().push(doctor_id.to_string());
        self.inner.list_for_doctor(doctor_id, filter).await
    }

    async fn cancel(
        &self,
        doctor_id: &str,
        appointment_id: &str,
        reason: Option<String>,
    ) -> Result<Appointment, AppError> {
        self.cancel_calls
            .lock()
            .unwrap()
            .push((doctor_id.to_string(), appointment_id.to_string()));
        self.inner.cancel(doctor_id, appointment_id, reason).await
    }

    async fn health_check(&self) -> Result<(), AppError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "appointment store unreachable"
            )));
        }
        self.inner.health_check().await
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<CountingStore>,
    pub jwt: JwtService,
}

impl TestApp {
    pub fn spawn() -> Self {
        let config = test_config();
        let store = Arc::new(CountingStore::default());
        let state = AppState::new(config, store.clone());
        let jwt = state.jwt.clone();

        TestApp {
            router: build_router(state),
            store,
            jwt,
        }
    }

    /// Seed a scheduled appointment with a fixed id.
    pub fn seed(&self, id: &str, doctor_id: &str, in_hours: i64) -> Appointment {
        let mut appointment = Appointment::new(
            doctor_id,
            PATIENT_ID,
            Utc::now() + Duration::hours(in_hours),
            Some("Follow-up".to_string()),
        );
        appointment.id = id.to_string();
        self.store.inner.insert(appointment.clone());
        appointment
    }

    pub fn token(&self, subject: &str, role: &str) -> String {
        self.jwt
            .generate_access_token(subject, role, Duration::minutes(15))
            .expect("Failed to mint test token")
    }

    pub fn expired_token(&self, subject: &str, role: &str) -> String {
        self.jwt
            .generate_access_token(subject, role, Duration::hours(-1))
            .expect("Failed to mint test token")
    }

    pub fn doctor_token(&self) -> String {
        self.token(DOCTOR_ID, "doctor")
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        authorization: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        let authorization = token.map(|t| format!("Bearer {}", t));
        self.send(Method::GET, uri, authorization.as_deref(), None)
            .await
    }

    pub async fn put(
        &self,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> TestResponse {
        let authorization = token.map(|t| format!("Bearer {}", t));
        self.send(Method::PUT, uri, authorization.as_deref(), body)
            .await
    }
}
