// Answer synthesis prompts.

pub const ANSWER_SYSTEM: &str = "You are a helpful assistant for HR.";

/// Answer prompt over the retrieved CV context block.
pub fn answer_prompt(cv_context: &str, question: &str) -> String {
    format!(
        "You are an AI assistant for a Human Resources department. Answer the following question \
about job candidates based ONLY on the CV information provided below. If the information \
needed to answer the question is not in the provided CVs, say that you don't have that \
information. Always cite the specific candidates by name in your answer.

CV Information:
{cv_context}
Question: {question}"
    )
}
