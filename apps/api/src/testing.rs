//! In-process fakes for the AI service and vector store, plus PDF fixtures.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::ai_client::{AiError, AiService, CompletionRequest};
use crate::config::Config;
use crate::models::cv::CvDocument;
use crate::state::AppState;
use crate::vector_db::{ScoredCv, StoredCv, VectorDbError, VectorStore};

pub const FAKE_ANSWER: &str = "Ana Souza is the strongest Rust candidate.";
const EMBEDDING_DIMS: usize = 26;

#[derive(Debug, Clone)]
pub struct RecordedCompletion {
    pub system: String,
    pub prompt: String,
    pub json_output: bool,
}

/// Queued replies are returned first; afterwards every completion returns
/// `FAKE_ANSWER`. Embeddings are letter histograms so similar texts land
/// close together.
#[derive(Default)]
pub struct FakeAi {
    replies: Mutex<VecDeque<String>>,
    fail_completions: bool,
    fail_embeddings: bool,
    completions: Mutex<Vec<RecordedCompletion>>,
    embedded: Mutex<Vec<String>>,
}

impl FakeAi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, reply: &str) -> Self {
        self.replies.lock().unwrap().push_back(reply.to_string());
        self
    }

    pub fn failing_completions(mut self) -> Self {
        self.fail_completions = true;
        self
    }

    pub fn failing_embeddings(mut self) -> Self {
        self.fail_embeddings = true;
        self
    }

    pub fn completions(&self) -> Vec<RecordedCompletion> {
        self.completions.lock().unwrap().clone()
    }

    pub fn embedded(&self) -> Vec<String> {
        self.embedded.lock().unwrap().clone()
    }
}

pub fn letter_histogram(text: &str) -> Vec<f32> {
    let mut v = vec![0.0_f32; EMBEDDING_DIMS];
    for c in text.chars().filter(char::is_ascii_alphabetic) {
        v[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
    }
    v
}

#[async_trait]
impl AiService for FakeAi {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        self.embedded.lock().unwrap().push(text.to_string());
        if self.fail_embeddings {
            return Err(AiError::Provider("embedding backend unavailable".into()));
        }
        Ok(letter_histogram(text))
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, AiError> {
        self.completions.lock().unwrap().push(RecordedCompletion {
            system: request.system.to_string(),
            prompt: request.prompt.to_string(),
            json_output: request.json_output,
        });
        if self.fail_completions {
            return Err(AiError::Api {
                status: 500,
                message: "model overloaded".into(),
            });
        }
        let queued = self.replies.lock().unwrap().pop_front();
        Ok(queued.unwrap_or_else(|| FAKE_ANSWER.to_string()))
    }

    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}

/// Brute-force cosine ranking over an in-memory list.
#[derive(Default)]
pub struct InMemoryVectorStore {
    docs: Mutex<Vec<StoredCv>>,
    failing: bool,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn stored(&self) -> Vec<StoredCv> {
        self.docs.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), VectorDbError> {
        if self.failing {
            return Err(VectorDbError::Api {
                status: 503,
                message: "chroma unavailable".into(),
            });
        }
        Ok(())
    }
}

fn to_document(cv: &StoredCv) -> CvDocument {
    CvDocument {
        id: cv.id.clone(),
        filename: cv.filename.clone(),
        content: cv.text.clone(),
        metadata: cv.metadata.clone(),
        uploaded_at: Some(cv.uploaded_at),
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm = |v: &[f32]| v.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm(a) * norm(b);
    if denom == 0.0 {
        1.0
    } else {
        1.0 - dot / denom
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add_document(&self, cv: StoredCv) -> Result<(), VectorDbError> {
        self.check()?;
        self.docs.lock().unwrap().push(cv);
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<Vec<ScoredCv>, VectorDbError> {
        self.check()?;
        let docs = self.docs.lock().unwrap();
        let mut hits: Vec<ScoredCv> = docs
            .iter()
            .map(|cv| ScoredCv {
                document: to_document(cv),
                distance: Some(cosine_distance(embedding, &cv.embedding)),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());
        hits.truncate(n_results);
        Ok(hits)
    }

    async fn get_all(&self) -> Result<Vec<CvDocument>, VectorDbError> {
        self.check()?;
        Ok(self.docs.lock().unwrap().iter().map(to_document).collect())
    }

    async fn count(&self) -> Result<usize, VectorDbError> {
        self.check()?;
        Ok(self.docs.lock().unwrap().len())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

/// Serves `router` on an ephemeral localhost port and returns its base URL.
pub async fn serve_fake(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn test_config() -> Config {
    Config::from_lookup(|_| None).expect("defaults are valid")
}

pub fn test_state(ai: Arc<FakeAi>, vectors: Arc<InMemoryVectorStore>) -> AppState {
    AppState {
        config: test_config(),
        ai,
        vectors,
        archive: None,
    }
}

/// A one-page PDF with each line drawn in Courier.
pub fn sample_pdf(lines: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("Td", vec![72.into(), 720.into()]),
    ];
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            operations.push(Operation::new("Td", vec![0.into(), (-20).into()]));
        }
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
