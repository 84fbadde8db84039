//! Vector store seam: the writer used by CV ingestion and the reader used by
//! question answering. The only production backend is ChromaDB.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::cv::{CvDocument, CvMetadata};

pub mod chroma;
pub mod record;

pub use chroma::ChromaStore;

#[derive(Debug, Error)]
pub enum VectorDbError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Vector DB API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed vector DB response: {0}")]
    Malformed(String),
}

/// Everything written for one CV.
#[derive(Debug, Clone)]
pub struct StoredCv {
    pub id: String,
    pub filename: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: CvMetadata,
    pub uploaded_at: DateTime<Utc>,
}

/// A similarity hit. Lower distance is closer.
#[derive(Debug, Clone)]
pub struct ScoredCv {
    pub document: CvDocument,
    pub distance: Option<f32>,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn add_document(&self, cv: StoredCv) -> Result<(), VectorDbError>;

    /// Nearest `n_results` documents, closest first.
    async fn query(
        &self,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<Vec<ScoredCv>, VectorDbError>;

    async fn get_all(&self) -> Result<Vec<CvDocument>, VectorDbError>;

    async fn count(&self) -> Result<usize, VectorDbError>;

    fn name(&self) -> &str;
}
