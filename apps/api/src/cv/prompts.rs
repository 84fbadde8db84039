// CV ingestion LLM prompt templates.

pub const METADATA_SYSTEM: &str =
    "You are a helpful assistant that extracts structured information from CVs.";

/// Metadata extraction prompt. Replace `{cv_text}` before sending.
pub const METADATA_PROMPT_TEMPLATE: &str = r#"Extract the following structured information from this CV:
- Name
- Location (city and country)
- Skills (technical and soft skills)
- Languages (spoken languages and proficiency)
- Experience (years of total professional experience)
- Job titles (all job titles mentioned)
- Education (degrees and institutions)

Return the information as a JSON object with these fields:
{
  "name": "string",
  "location": "City, Country",
  "skills": ["string"],
  "languages": ["Language (proficiency)"],
  "experience_years": number,
  "job_titles": ["string"],
  "education": ["Degree - Institution"]
}

CV Text:
{cv_text}"#;

/// Characters of CV text sent for metadata extraction.
pub const METADATA_TEXT_LIMIT: usize = 4000;
