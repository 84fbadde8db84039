// CV ingestion: upload handling, PDF text extraction, LLM metadata
// extraction and indexing into the vector store.

pub mod handlers;
pub mod metadata;
pub mod pdf;
pub mod processor;
pub mod prompts;
