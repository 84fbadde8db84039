use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub question: String,
    pub answer: String,
}
