use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use tracing::{error, info};

use crate::cv::processor::process_cv_file;
use crate::errors::AppError;
use crate::models::cv::{CvDocument, CvUploadResponse};
use crate::state::AppState;

const FILE_FIELD: &str = "file";

/// POST /upload
///
/// Validates the upload and acknowledges it immediately. Extraction,
/// indexing and archiving run on a background task whose failures are
/// only logged.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CvUploadResponse>, AppError> {
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read multipart field", e))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error("Failed to read file", e))?;
        upload = Some((filename, data));
        break;
    }

    let (filename, data) = upload
        .filter(|(filename, _)| !filename.is_empty())
        .ok_or_else(|| AppError::Validation("A CV file is required".to_string()))?;

    if !is_pdf_filename(&filename) {
        return Err(AppError::Validation(
            "Only PDF files are supported".to_string(),
        ));
    }

    info!("Accepted upload {filename} ({} bytes)", data.len());

    let message = format!("CV uploaded and being processed: {filename}");
    tokio::spawn(async move {
        match process_cv_file(&state, &filename, &data).await {
            Ok(cv) => info!(
                "Indexed {} as {} (candidate: {}, archived: {})",
                cv.filename,
                cv.id,
                cv.metadata.name,
                cv.archived_uri.as_deref().unwrap_or("no")
            ),
            Err(e) => error!("Error processing CV {filename}: {e}"),
        }
    });

    Ok(Json(CvUploadResponse { message }))
}

/// GET /cv
pub async fn handle_list_cvs(
    State(state): State<AppState>,
) -> Result<Json<Vec<CvDocument>>, AppError> {
    let documents = state.vectors.get_all().await?;
    Ok(Json(documents))
}

/// Over-limit bodies surface as 413; anything else is a malformed request.
fn multipart_error(context: &str, e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("{context}: {e}"))
    } else {
        AppError::Validation(format!("{context}: {e}"))
    }
}

fn is_pdf_filename(filename: &str) -> bool {
    filename.to_lowercase().ends_with(".pdf")
}
