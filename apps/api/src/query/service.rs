use std::fmt::Write;

use tracing::{info, warn};

use super::prompts::{answer_prompt, ANSWER_SYSTEM};
use crate::ai_client::prompts::truncate_chars;
use crate::ai_client::CompletionRequest;
use crate::errors::AppError;
use crate::state::AppState;
use crate::vector_db::ScoredCv;

/// CVs retrieved per question.
pub const N_RESULTS: usize = 3;
pub const NO_CV_DATA_ANSWER: &str =
    "No CV data is available. Please upload CVs to the system first.";

const PREVIEW_CHARS: usize = 500;
const NOT_SPECIFIED: &str = "Not specified";

pub async fn process_question(state: &AppState, question: &str) -> Result<String, AppError> {
    info!("Processing question: {question}");

    let embedding = state.ai.embed(question).await?;
    let hits = state.vectors.query(&embedding, N_RESULTS).await?;
    if hits.is_empty() {
        warn!("No CVs found in the database");
        return Ok(NO_CV_DATA_ANSWER.to_string());
    }

    let cv_context = build_cv_context(&hits);
    let prompt = answer_prompt(&cv_context, question);

    info!("Using {} for question answering", state.ai.name());
    let answer = state
        .ai
        .complete(CompletionRequest::text(ANSWER_SYSTEM, &prompt))
        .await?;

    info!("Successfully generated answer");
    Ok(answer)
}

/// One labelled block per hit, in retrieval order.
pub fn build_cv_context(hits: &[ScoredCv]) -> String {
    let mut out = String::new();
    for hit in hits {
        let doc = &hit.document;
        let meta = &doc.metadata;
        // Writing into a String cannot fail.
        let _ = writeln!(out, "CV ID: {}", doc.id);
        let _ = writeln!(out, "Name: {}", meta.name);
        let _ = writeln!(out, "Location: {}", meta.location);
        let _ = writeln!(out, "Skills: {}", list_or_default(&meta.skills));
        let _ = writeln!(out, "Languages: {}", list_or_default(&meta.languages));
        let _ = writeln!(out, "Experience: {} years", meta.experience_years);
        let _ = writeln!(out, "Job Titles: {}", list_or_default(&meta.job_titles));
        let _ = writeln!(out, "Education: {}", text_or_default(&meta.education));
        let _ = writeln!(
            out,
            "Content Preview: {}...\n",
            truncate_chars(&doc.content, PREVIEW_CHARS)
        );
    }
    out
}

fn list_or_default(items: &[String]) -> String {
    if items.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        items.join(", ")
    }
}

fn text_or_default(value: &str) -> &str {
    if value.trim().is_empty() {
        NOT_SPECIFIED
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cv::{CvDocument, CvMetadata};
    use crate::testing::{
        letter_histogram, test_state, FakeAi, InMemoryVectorStore, FAKE_ANSWER,
    };
    use crate::vector_db::{StoredCv, VectorStore};
    use chrono::Utc;
    use std::sync::Arc;

    fn hit(id: &str, name: &str, content: &str) -> ScoredCv {
        ScoredCv {
            document: CvDocument {
                id: id.to_string(),
                filename: format!("{id}.pdf"),
                content: content.to_string(),
                metadata: CvMetadata {
                    name: name.to_string(),
                    location: "Lisbon, Portugal".to_string(),
                    skills: vec!["Rust".to_string(), "Go".to_string()],
                    languages: vec![],
                    experience_years: 7.0,
                    job_titles: vec!["Backend Engineer".to_string()],
                    education: "MSc Computer Science".to_string(),
                },
                uploaded_at: None,
            },
            distance: Some(0.1),
        }
    }

    async fn seed(store: &InMemoryVectorStore, id: &str, name: &str, text: &str) {
        store
            .add_document(StoredCv {
                id: id.to_string(),
                filename: format!("{id}.pdf"),
                text: text.to_string(),
                embedding: letter_histogram(text),
                metadata: CvMetadata {
                    name: name.to_string(),
                    ..CvMetadata::default()
                },
                uploaded_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    #[test]
    fn test_context_block_lists_every_field() {
        let context = build_cv_context(&[hit("cv-1", "Ana Souza", "Ana builds Rust services.")]);

        assert!(context.contains("CV ID: cv-1\n"));
        assert!(context.contains("Name: Ana Souza\n"));
        assert!(context.contains("Location: Lisbon, Portugal\n"));
        assert!(context.contains("Skills: Rust, Go\n"));
        assert!(context.contains("Languages: Not specified\n"));
        assert!(context.contains("Experience: 7 years\n"));
        assert!(context.contains("Job Titles: Backend Engineer\n"));
        assert!(context.contains("Education: MSc Computer Science\n"));
        assert!(context.contains("Content Preview: Ana builds Rust services....\n\n"));
    }

    #[test]
    fn test_content_preview_is_truncated() {
        let long = "x".repeat(2000);
        let context = build_cv_context(&[hit("cv-1", "Ana", &long)]);
        let preview = format!("Content Preview: {}...", "x".repeat(PREVIEW_CHARS));
        assert!(context.contains(&preview));
        assert!(!context.contains(&"x".repeat(PREVIEW_CHARS + 1)));
    }

    #[test]
    fn test_hits_keep_retrieval_order() {
        let context = build_cv_context(&[
            hit("first", "Ana", "a"),
            hit("second", "Bruno", "b"),
        ]);
        let first = context.find("CV ID: first").unwrap();
        let second = context.find("CV ID: second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_blank_education_renders_not_specified() {
        let mut h = hit("cv-1", "Ana", "a");
        h.document.metadata.education = String::new();
        assert!(build_cv_context(&[h]).contains("Education: Not specified\n"));
    }

    #[tokio::test]
    async fn test_empty_store_short_circuits_without_llm_call() {
        let ai = Arc::new(FakeAi::new());
        let state = test_state(ai.clone(), Arc::new(InMemoryVectorStore::new()));

        let answer = process_question(&state, "Who knows Rust?").await.unwrap();

        assert_eq!(answer, NO_CV_DATA_ANSWER);
        assert!(ai.completions().is_empty());
    }

    #[tokio::test]
    async fn test_answer_is_grounded_in_retrieved_cvs() {
        let ai = Arc::new(FakeAi::new());
        let store = Arc::new(InMemoryVectorStore::new());
        seed(&store, "cv-ana", "Ana Souza", "Rust engineer, tokio, axum").await;
        let state = test_state(ai.clone(), store);

        let answer = process_question(&state, "Who knows Rust?").await.unwrap();

        assert_eq!(answer, FAKE_ANSWER);
        let calls = ai.completions();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].system, ANSWER_SYSTEM);
        assert!(!calls[0].json_output);
        assert!(calls[0].prompt.contains("Name: Ana Souza"));
        assert!(calls[0].prompt.ends_with("Question: Who knows Rust?"));
        assert_eq!(ai.embedded(), vec!["Who knows Rust?".to_string()]);
    }

    #[tokio::test]
    async fn test_at_most_three_cvs_in_context() {
        let ai = Arc::new(FakeAi::new());
        let store = Arc::new(InMemoryVectorStore::new());
        for i in 0..5 {
            seed(&store, &format!("cv-{i}"), "Candidate", "python data").await;
        }
        let state = test_state(ai.clone(), store);

        process_question(&state, "python").await.unwrap();

        let prompt = &ai.completions()[0].prompt;
        assert_eq!(prompt.matches("CV ID: ").count(), N_RESULTS);
    }

    #[tokio::test]
    async fn test_llm_failure_maps_to_ai_error() {
        let ai = Arc::new(FakeAi::new().failing_completions());
        let store = Arc::new(InMemoryVectorStore::new());
        seed(&store, "cv-ana", "Ana Souza", "Rust").await;
        let state = test_state(ai, store);

        let err = process_question(&state, "Who knows Rust?").await.unwrap_err();
        assert!(matches!(err, AppError::Ai(_)));
    }
}
