//! Token handout for browser-side viewers.

use crate::{errors::AppError, models::credential::Credential, services::gateway::ResourceGateway};
use axum::{Json, extract::State};

/// `GET /api/auth/token`: a read-only credential.
pub async fn public_token(
    State(gateway): State<ResourceGateway>,
) -> Result<Json<Credential>, AppError> {
    Ok(Json(gateway.public_token().await?))
}
