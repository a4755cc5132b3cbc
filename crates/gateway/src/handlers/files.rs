//! Document upload and management handlers

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    Json,
};
use serde::Serialize;

use crate::AppState;
use docchat_common::errors::{AppError, Result};

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::InvalidFormat {
        message: e.body_text(),
    }
}

fn join_error(e: tokio::task::JoinError) -> AppError {
    AppError::Internal {
        message: format!("Storage task failed: {}", e),
    }
}

/// Store the multipart `file` field under its sanitized name
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<MessageResponse>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;

        let store = state.store.clone();
        let name = tokio::task::spawn_blocking(move || store.save(&filename, &bytes))
            .await
            .map_err(join_error)??;

        return Ok(Json(MessageResponse {
            message: format!("{} uploaded successfully", name),
        }));
    }

    Err(AppError::MissingField {
        field: "file".to_string(),
    })
}

/// Names of the stored documents
pub async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let store = state.store.clone();
    let names = tokio::task::spawn_blocking(move || store.list())
        .await
        .map_err(join_error)??;
    Ok(Json(names))
}

/// Remove a stored document
pub async fn delete_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>> {
    let store = state.store.clone();
    let deleted = name.clone();
    tokio::task::spawn_blocking(move || store.delete(&deleted))
        .await
        .map_err(join_error)??;

    Ok(Json(MessageResponse {
        message: format!("{} deleted successfully", name),
    }))
}
