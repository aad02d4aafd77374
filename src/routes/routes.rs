//! Defines routes for the model API.
//!
//! ## Structure
//! - `GET    /api/models`              : list models with their URNs
//! - `POST   /api/models`              : upload a model (multipart) and queue translation
//! - `GET    /api/models/{urn}/status` : translation manifest or `null`
//! - `DELETE /api/models/{objectKey}`  : delete a stored model
//! - `GET    /api/auth/token`          : read-only viewer token
//! - `GET    /healthz`, `GET /readyz`  : liveness and readiness

use crate::{
    handlers::{
        auth_handlers::public_token,
        health_handlers::{healthz, readyz},
        model_handlers::{delete_model, list_models, model_status, upload_model},
    },
    services::gateway::ResourceGateway,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get},
};

/// Build and return the router for the model API.
///
/// The router carries shared state (`ResourceGateway`) to all handlers.
/// `max_upload_bytes` bounds the multipart body of `POST /api/models`.
pub fn routes(max_upload_bytes: usize) -> Router<ResourceGateway> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(
            "/api/models",
            get(list_models)
                .post(upload_model)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/models/{model}/status", get(model_status))
        .route("/api/models/{model}", delete(delete_model))
        .route("/api/auth/token", get(public_token))
}
