use crate::config::{DoctorConfig, StoreBackend};
use crate::handlers;
use crate::middleware::{auth_middleware, require_role, RoleRequirement};
use crate::services::{AppointmentStore, InMemoryStore, JwtService, MongoStore};
use axum::{
    http::{HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware,
};
use service_core::observability::http_request_span;
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Path prefix the doctor routes are mounted under.
pub const DOCTOR_SCOPE: &str = "/api/doctors";

#[derive(Clone)]
pub struct AppState {
    pub config: DoctorConfig,
    pub jwt: JwtService,
    pub store: Arc<dyn AppointmentStore>,
}

impl AppState {
    pub fn new(config: DoctorConfig, store: Arc<dyn AppointmentStore>) -> Self {
        let jwt = JwtService::new(&config.jwt);
        Self { config, jwt, store }
    }
}

/// Routes under [`DOCTOR_SCOPE`], gated by authentication then the doctor
/// role. The gates wrap the scope's fallback too, so an unknown path is only
/// reported as 404 to an authenticated doctor.
pub fn doctor_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/appointments",
            get(handlers::list_appointments).fallback(handlers::route_not_found),
        )
        .route(
            "/appointments/:id/cancel",
            put(handlers::cancel_appointment).fallback(handlers::route_not_found),
        )
        .fallback(handlers::route_not_found)
        // Layers run outermost-last: authentication executes before the role check
        .layer(from_fn_with_state(RoleRequirement::doctor(), require_role))
        .layer(from_fn_with_state(state, auth_middleware))
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .nest(DOCTOR_SCOPE, doctor_routes(state.clone()))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(http_request_span))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::PUT])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
}

/// Builds the configured appointment store, creating MongoDB indexes when
/// that backend is selected.
pub async fn build_store(config: &DoctorConfig) -> Result<Arc<dyn AppointmentStore>, AppError> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory appointment store; data is lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
        StoreBackend::MongoDb => {
            let mongo = config.store.mongodb.as_ref().ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!(
                    "MongoDB settings are required for the mongodb store backend"
                ))
            })?;

            let store = MongoStore::connect(&mongo.uri, &mongo.database).await?;
            store.initialize_indexes().await.map_err(|e| {
                tracing::error!("Failed to initialize database indexes: {}", e);
                e
            })?;

            Ok(Arc::new(store))
        }
    }
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: DoctorConfig) -> Result<Self, AppError> {
        let store = build_store(&config).await?;
        Self::build_with_store(config, store).await
    }

    pub async fn build_with_store(
        config: DoctorConfig,
        store: Arc<dyn AppointmentStore>,
    ) -> Result<Self, AppError> {
        let addr = config.common.socket_addr();
        let app = build_router(AppState::new(config, store));

        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
