use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN: &str = "Unknown";

/// Structured candidate data extracted from a CV by the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvMetadata {
    pub name: String,
    pub location: String,
    pub skills: Vec<String>,
    pub languages: Vec<String>,
    pub experience_years: f64,
    pub job_titles: Vec<String>,
    pub education: String,
}

impl Default for CvMetadata {
    /// The record used whenever extraction fails.
    fn default() -> Self {
        Self {
            name: UNKNOWN.to_string(),
            location: UNKNOWN.to_string(),
            skills: vec![],
            languages: vec![],
            experience_years: 0.0,
            job_titles: vec![],
            education: String::new(),
        }
    }
}

/// A CV as stored in the vector database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvDocument {
    pub id: String,
    pub filename: String,
    pub content: String,
    pub metadata: CvMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvUploadResponse {
    pub message: String,
}
