//! # SlotBook API
//!
//! The API crate provides the web server for the SlotBook booking service.
//! It exposes RESTful endpoints for lecturers publishing consultation slots
//! and students booking, moving and cancelling appointments on them.
//!
//! ## Architecture
//!
//! This crate follows a layered architecture:
//!
//! - **Routes**: Define API endpoints and URL structure
//! - **Handlers**: Translate HTTP requests into registry, engine and query calls
//! - **Middleware**: Identity extraction, body validation and error mapping
//! - **Config**: Handle environment and application configuration
//!
//! The business rules live in `slotbook-core`; this crate only wires them to
//! axum and picks the storage backend and notifier at startup.

/// Configuration module for API settings
pub mod config;
/// Request handlers that call into the booking core
pub mod handlers;
/// Middleware for identity, validation and error handling
pub mod middleware;
/// Outbound notifier implementations
pub mod notifications;
/// Route definitions and API endpoint structure
pub mod routes;

use std::{sync::Arc, time::Duration};

use axum::{
    BoxError, Router,
    error_handling::HandleErrorLayer,
    http::{HeaderName, HeaderValue, Method, header},
    response::{IntoResponse, Response},
};
use eyre::{Result, WrapErr};
use slotbook_core::{
    booking::BookingEngine,
    errors::BookingError,
    notify::{LogNotifier, Notifier},
    query::AppointmentQueries,
    registry::SlotRegistry,
    store::{BookingStore, StoreHandle},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use crate::middleware::{
    auth::{PRINCIPAL_ID_HEADER, PRINCIPAL_ROLE_HEADER},
    error_handling::AppError,
};
use crate::notifications::WebhookNotifier;

/// Shared application state that is accessible to all request handlers
///
/// All three services share one [`StoreHandle`], so every request sees the
/// same store and the same per-call deadline.
#[derive(Clone)]
pub struct ApiState {
    pub registry: SlotRegistry,
    pub engine: BookingEngine,
    pub queries: AppointmentQueries,
}

impl ApiState {
    pub fn new(store: Arc<dyn BookingStore>, store_timeout: Duration, notifier: Arc<dyn Notifier>) -> Self {
        let handle = StoreHandle::new(store, store_timeout);
        Self {
            registry: SlotRegistry::new(handle.clone()),
            engine: BookingEngine::new(handle.clone(), notifier),
            queries: AppointmentQueries::new(handle),
        }
    }
}

/// Builds the router with every endpoint and the shared state attached.
///
/// Cross-cutting layers that depend on configuration (CORS, request timeout)
/// are added by [`start_server`]; tests drive this router directly.
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        // Health check endpoints
        .merge(routes::health::routes())
        // Slot management endpoints
        .merge(routes::slots::routes())
        // Appointment lifecycle and reporting endpoints
        .merge(routes::appointments::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn handle_layer_error(err: BoxError) -> Response {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError(BookingError::Storage(eyre::eyre!("request timed out"))).into_response()
    } else {
        AppError(BookingError::Internal(err.to_string())).into_response()
    }
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .wrap_err_with(|| format!("Invalid CORS origin: {}", origin))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(PRINCIPAL_ID_HEADER),
            HeaderName::from_static(PRINCIPAL_ROLE_HEADER),
        ])
        .allow_origin(origins))
}

/// Picks the webhook notifier when a URL is configured, the log notifier otherwise.
pub fn build_notifier(config: &config::ApiConfig) -> Result<Arc<dyn Notifier>> {
    Ok(match &config.notify_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url)?),
        None => Arc::new(LogNotifier),
    })
}

/// Starts the API server with the provided configuration and booking store
///
/// This function initializes logging, wires the booking services to the
/// store, configures routes and layers, and serves HTTP until shutdown.
///
/// # Example
///
/// ```ignore
/// let config = ApiConfig::from_env()?;
/// let store = Arc::new(MemoryStore::new());
/// start_server(config, store).await?;
/// ```
pub async fn start_server(config: config::ApiConfig, store: Arc<dyn BookingStore>) -> Result<()> {
    // Initialize tracing for logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let notifier = build_notifier(&config)?;
    let state = Arc::new(ApiState::new(store, config.store_timeout, notifier));
    let app = build_router(state);

    // Apply CORS configuration if origins are specified
    let app = match &config.cors_origins {
        Some(origins) => app.layer(cors_layer(origins)?),
        None => app,
    };

    // Add request timeout middleware
    let app = app.layer(
        tower::ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_layer_error))
            .timeout(Duration::from_secs(config.request_timeout))
            .into_inner(),
    );

    // Start the HTTP server
    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(backend = %config.storage_backend, "Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
