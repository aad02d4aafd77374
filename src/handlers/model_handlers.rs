//! HTTP handlers for model operations.
//! Buffers the uploaded file, then delegates sequencing (bucket, upload,
//! translation) to `ResourceGateway`.

use crate::{
    errors::AppError,
    models::{
        object::{DeleteAck, ModelSummary},
        translation::Manifest,
    },
    services::gateway::ResourceGateway,
};
use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
};
use bytes::Bytes;

/// Multipart field carrying the model file.
pub const MODEL_FILE_FIELD: &str = "model-file";
/// Multipart field naming the root design inside an uploaded archive.
pub const ENTRYPOINT_FIELD: &str = "model-zip-entrypoint";

/// `GET /api/models`: every stored model with its URN.
pub async fn list_models(
    State(gateway): State<ResourceGateway>,
) -> Result<Json<Vec<ModelSummary>>, AppError> {
    Ok(Json(gateway.list_models().await?))
}

/// `GET /api/models/{urn}/status`: translation manifest, or `null` when
/// nothing has been submitted for this URN.
///
/// URNs are standard base64 and may contain `/` or `+`, so clients must
/// percent-encode the segment (`encodeURIComponent`); a raw `/` does not
/// match this route.
pub async fn model_status(
    State(gateway): State<ResourceGateway>,
    Path(urn): Path<String>,
) -> Result<Json<Option<Manifest>>, AppError> {
    Ok(Json(gateway.get_manifest(&urn).await?))
}

/// `POST /api/models`: upload a model and queue its translation.
pub async fn upload_model(
    State(gateway): State<ResourceGateway>,
    mut multipart: Multipart,
) -> Result<Json<ModelSummary>, AppError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut entrypoint = String::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            MODEL_FILE_FIELD => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| {
                        AppError::bad_request(format!("`{}` has no file name", MODEL_FILE_FIELD))
                    })?;
                let data = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, data));
            }
            ENTRYPOINT_FIELD => {
                entrypoint = field.text().await.map_err(multipart_error)?.trim().to_string();
            }
            _ => {}
        }
    }

    let (file_name, data) = file
        .ok_or_else(|| AppError::bad_request(format!("missing `{}` field", MODEL_FILE_FIELD)))?;

    // Abandoning the request aborts the transfer.
    let cancel = gateway.upload_token();
    let _abort_on_drop = cancel.clone().drop_guard();

    let summary = gateway
        .upload_and_translate(&file_name, data, &entrypoint, cancel)
        .await?;
    Ok(Json(summary))
}

/// `DELETE /api/models/{objectKey}`
pub async fn delete_model(
    State(gateway): State<ResourceGateway>,
    Path(object_key): Path<String>,
) -> Result<Json<DeleteAck>, AppError> {
    Ok(Json(gateway.delete_object(&object_key).await?))
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::new(err.status(), err.body_text())
}
