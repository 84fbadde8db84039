//! Metadata Extractor: one LLM call per CV, with lenient parsing of the reply.
//!
//! Models return the requested fields in many shapes (strings vs arrays,
//! nested objects, title-cased keys). `normalize_metadata` folds all of them
//! into `CvMetadata`. Extraction never fails the pipeline: any AI or parse
//! error yields the default "Unknown" record.

use serde_json::{Map, Value};
use tracing::{error, info};

use crate::ai_client::prompts::{truncate_chars, JSON_ONLY_INSTRUCTION};
use crate::ai_client::{extract_json_object, strip_json_fences, AiService, CompletionRequest};
use crate::cv::prompts::{METADATA_PROMPT_TEMPLATE, METADATA_SYSTEM, METADATA_TEXT_LIMIT};
use crate::models::cv::{CvMetadata, UNKNOWN};
use crate::vector_db::record::LIST_SEPARATOR;

const ITEM_INNER_SEPARATOR: &str = "; ";

pub async fn extract_metadata(ai: &dyn AiService, text: &str) -> CvMetadata {
    let prompt = build_metadata_prompt(text);
    let system = format!("{METADATA_SYSTEM} {JSON_ONLY_INSTRUCTION}");

    let reply = match ai.complete(CompletionRequest::json(&system, &prompt)).await {
        Ok(reply) => reply,
        Err(e) => {
            error!("Error extracting metadata with {}: {e}", ai.name());
            info!("Using default metadata");
            return CvMetadata::default();
        }
    };

    match parse_metadata_reply(&reply) {
        Some(metadata) => metadata,
        None => {
            error!("Error extracting metadata: reply did not contain a JSON object");
            info!("Using default metadata");
            CvMetadata::default()
        }
    }
}

pub fn build_metadata_prompt(text: &str) -> String {
    METADATA_PROMPT_TEMPLATE.replace("{cv_text}", truncate_chars(text, METADATA_TEXT_LIMIT))
}

/// Fence-strips the reply, cuts out the JSON object and normalizes it.
pub fn parse_metadata_reply(reply: &str) -> Option<CvMetadata> {
    let json = extract_json_object(strip_json_fences(reply))?;
    let value: Value = serde_json::from_str(json).ok()?;
    value.is_object().then(|| normalize_metadata(&value))
}

// ────────────────────────────────────────────────────────────────────────────
// Normalization
// ────────────────────────────────────────────────────────────────────────────

const KNOWN_FIELDS: [&str; 7] = [
    "name",
    "location",
    "skills",
    "languages",
    "experience_years",
    "job_titles",
    "education",
];

pub fn normalize_metadata(value: &Value) -> CvMetadata {
    let Some(obj) = value.as_object() else {
        return CvMetadata::default();
    };
    let obj = unwrap_envelope(obj);

    let mut fields: Map<String, Value> = Map::new();
    for (key, v) in obj {
        // First spelling wins if a model sends both "Skills" and "skills".
        fields.entry(canonical_key(key)).or_insert_with(|| v.clone());
    }

    let text_or_unknown = |key: &str| {
        fields
            .get(key)
            .map(render_scalar_text)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string())
    };
    let list = |key: &str| fields.get(key).map(flatten_list).unwrap_or_default();

    CvMetadata {
        name: text_or_unknown("name"),
        location: text_or_unknown("location"),
        skills: list("skills"),
        languages: list("languages"),
        experience_years: fields
            .get("experience_years")
            .map(parse_years)
            .unwrap_or(0.0),
        job_titles: list("job_titles"),
        education: fields.get("education").map(render_education).unwrap_or_default(),
    }
}

/// `{"cv": {...}}` or `{"metadata": {...}}`: descend when the top level has
/// none of the expected keys and a single object value.
fn unwrap_envelope(obj: &Map<String, Value>) -> &Map<String, Value> {
    let has_known = obj
        .keys()
        .any(|k| KNOWN_FIELDS.contains(&canonical_key(k).as_str()));
    if !has_known && obj.len() == 1 {
        if let Some(Value::Object(inner)) = obj.values().next() {
            return unwrap_envelope(inner);
        }
    }
    obj
}

fn canonical_key(key: &str) -> String {
    let key = key.trim().to_lowercase().replace([' ', '-'], "_");
    let canonical = match key.as_str() {
        "full_name" | "candidate_name" => "name",
        "skill" | "skill_set" | "skillset" => "skills",
        "language" | "spoken_languages" => "languages",
        "experience"
        | "years_of_experience"
        | "total_experience"
        | "experience_in_years"
        | "total_years_of_experience" => "experience_years",
        "job_title" | "titles" | "positions" => "job_titles",
        other => other,
    };
    canonical.to_string()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Scalar values of an object joined with `sep`, e.g. a language entry
/// `{"language": "English", "proficiency": "C1"}` → `"English - C1"`.
fn render_object(obj: &Map<String, Value>, sep: &str) -> String {
    obj.values()
        .filter_map(|v| match v {
            Value::Array(items) => {
                let joined = items
                    .iter()
                    .filter_map(scalar_to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(joined).filter(|s| !s.is_empty())
            }
            other => scalar_to_string(other),
        })
        .collect::<Vec<_>>()
        .join(sep)
}

/// Name and location: single text value.
fn render_scalar_text(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(scalar_to_string)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(obj) => render_object(obj, ", "),
        other => scalar_to_string(other).unwrap_or_default(),
    }
}

/// List items are stored joined with `LIST_SEPARATOR`, so no item may
/// contain it: object renderings like `"Cloud - AWS, GCP"` become
/// `"Cloud - AWS; GCP"`.
fn flatten_list(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    push_items(value, &mut out);
    let mut seen = std::collections::HashSet::new();
    out.into_iter()
        .map(|item| item.replace(LIST_SEPARATOR, ITEM_INNER_SEPARATOR).trim().to_string())
        .filter(|item| !item.is_empty() && seen.insert(item.to_lowercase()))
        .collect()
}

fn push_items(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.extend(
            s.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from),
        ),
        Value::Number(_) | Value::Bool(_) => out.extend(scalar_to_string(value)),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Object(obj) => {
                        let rendered = render_object(obj, " - ");
                        if !rendered.is_empty() {
                            out.push(rendered);
                        }
                    }
                    other => push_items(other, out),
                }
            }
        }
        // Category maps: {"technical": [...], "soft": [...]} or
        // {"English": "Native", "Spanish": "B2"}.
        Value::Object(obj) => {
            for (key, v) in obj {
                match v {
                    Value::Array(_) | Value::Object(_) => push_items(v, out),
                    other => {
                        if let Some(s) = scalar_to_string(other) {
                            out.push(format!("{key} ({s})"));
                        }
                    }
                }
            }
        }
        Value::Null => {}
    }
}

fn render_education(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(obj) => Some(render_object(obj, " - ")).filter(|s| !s.is_empty()),
                other => scalar_to_string(other),
            })
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(obj) => render_object(obj, " - "),
        other => scalar_to_string(other).unwrap_or_default(),
    }
}

/// Numbers pass through; strings like "7+ years" or "about 5.5" yield their
/// first number.
fn parse_years(value: &Value) -> f64 {
    let years = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => leading_number(s).unwrap_or(0.0),
        _ => 0.0,
    };
    if years.is_finite() {
        years.max(0.0)
    } else {
        0.0
    }
}

fn leading_number(s: &str) -> Option<f64> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let rest = &s[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    rest[..end].trim_end_matches('.').parse().ok()
}
