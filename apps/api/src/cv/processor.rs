use std::io::Write;
use std::path::Path;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::metadata::extract_metadata;
use super::pdf::extract_text_from_pdf;
use crate::errors::AppError;
use crate::models::cv::CvMetadata;
use crate::state::AppState;
use crate::vector_db::StoredCv;

/// Outcome of a completed ingest, logged by the background task.
#[derive(Debug, Clone)]
pub struct ProcessedCv {
    pub id: String,
    pub filename: String,
    pub metadata: CvMetadata,
    pub archived_uri: Option<String>,
}

/// Runs the full ingest for one uploaded PDF: extract text, derive metadata,
/// embed, index, then archive the original file.
///
/// The uploaded bytes live in a temp file for the duration of the call and
/// are removed on every exit path.
pub async fn process_cv_file(
    state: &AppState,
    filename: &str,
    data: &[u8],
) -> Result<ProcessedCv, AppError> {
    let mut temp = tempfile::Builder::new()
        .prefix("cv-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| AppError::CvProcessing(format!("Failed to stage upload: {e}")))?;
    temp.write_all(data)
        .and_then(|_| temp.flush())
        .map_err(|e| AppError::CvProcessing(format!("Failed to stage upload: {e}")))?;

    info!("Processing CV: {filename}");
    let text = extract_text_from_pdf(temp.path()).await?;
    if text.is_empty() {
        return Err(AppError::CvProcessing(format!(
            "No extractable text in {filename}"
        )));
    }

    info!("Extracting metadata from {filename}");
    let metadata = extract_metadata(state.ai.as_ref(), &text).await;
    debug!("Metadata for {filename}: {metadata:?}");

    let id = Uuid::new_v4().to_string();
    let embedding = state.ai.embed(&text).await?;
    state
        .vectors
        .add_document(StoredCv {
            id: id.clone(),
            filename: filename.to_string(),
            text,
            embedding,
            metadata: metadata.clone(),
            uploaded_at: Utc::now(),
        })
        .await?;

    let archived_uri = match &state.archive {
        Some(archive) => {
            let key = archive_key(&id, filename);
            match archive.upload_file(temp.path(), &key).await {
                Ok(uri) => Some(uri),
                Err(e) => {
                    warn!("S3 upload failed, but continuing: {e}");
                    None
                }
            }
        }
        None => {
            debug!("S3 archive disabled, skipping upload of {filename}");
            None
        }
    };

    info!("Successfully processed CV {filename} as {id}");
    Ok(ProcessedCv {
        id,
        filename: filename.to_string(),
        metadata,
        archived_uri,
    })
}

/// `{id}/{basename}` so re-uploads of the same filename never collide.
fn archive_key(id: &str, filename: &str) -> String {
    let basename = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("cv.pdf");
    format!("{id}/{basename}")
}
