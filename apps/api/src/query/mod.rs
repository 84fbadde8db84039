// Question answering: embed the question, retrieve the closest CVs and ask
// the LLM for an answer grounded in them.

pub mod handlers;
pub mod prompts;
pub mod service;
