//! Flattening between `CvMetadata` and Chroma's flat metadata map.
//!
//! Chroma metadata values must be scalars, so list fields are stored joined
//! with `", "` and split back on read.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::models::cv::{CvMetadata, UNKNOWN};

pub const LIST_SEPARATOR: &str = ", ";

/// Builds the Chroma metadata map for a CV.
pub fn to_chroma_metadata(
    filename: &str,
    metadata: &CvMetadata,
    uploaded_at: DateTime<Utc>,
) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("filename".into(), Value::from(filename));
    map.insert("name".into(), Value::from(metadata.name.as_str()));
    map.insert("location".into(), Value::from(metadata.location.as_str()));
    map.insert("skills".into(), Value::from(metadata.skills.join(LIST_SEPARATOR)));
    map.insert(
        "languages".into(),
        Value::from(metadata.languages.join(LIST_SEPARATOR)),
    );
    map.insert(
        "experience_years".into(),
        Value::from(metadata.experience_years),
    );
    map.insert(
        "job_titles".into(),
        Value::from(metadata.job_titles.join(LIST_SEPARATOR)),
    );
    map.insert("education".into(), Value::from(metadata.education.as_str()));
    map.insert("uploaded_at".into(), Value::from(uploaded_at.to_rfc3339()));
    map
}

pub struct FlatRecord {
    pub filename: String,
    pub metadata: CvMetadata,
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Reads a Chroma metadata map back. Missing keys take the "unknown" defaults.
pub fn from_chroma_metadata(map: Option<&Map<String, Value>>) -> FlatRecord {
    let empty = Map::new();
    let map = map.unwrap_or(&empty);

    let text = |key: &str| -> Option<String> {
        match map.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    };
    let list = |key: &str| -> Vec<String> {
        text(key)
            .map(|s| split_list(&s))
            .unwrap_or_default()
    };

    let experience_years = match map.get("experience_years") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };

    FlatRecord {
        filename: text("filename").unwrap_or_else(|| UNKNOWN.to_string()),
        metadata: CvMetadata {
            name: text("name").unwrap_or_else(|| UNKNOWN.to_string()),
            location: text("location").unwrap_or_else(|| UNKNOWN.to_string()),
            skills: list("skills"),
            languages: list("languages"),
            experience_years,
            job_titles: list("job_titles"),
            education: text("education").unwrap_or_default(),
        },
        uploaded_at: text("uploaded_at")
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

fn split_list(joined: &str) -> Vec<String> {
    if joined.trim().is_empty() {
        return vec![];
    }
    joined
        .split(LIST_SEPARATOR)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
