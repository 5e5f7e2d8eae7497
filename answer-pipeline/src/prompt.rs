use common::storage::types::message::{format_history, ChatMessage};

/// Asked on behalf of the user when a conversation opens without history.
pub const OPENING_PROMPT: &str = "summarize the pdf";

pub const CORE_INSTRUCTIONS: &str = "\
- Analyze the provided context carefully, focus on the PDF and Current Prompt
- Provide concise, and direct responses, with essential information.
- Adapt your tone and depth to the specific query
- If the PDF context is relevant, incorporate its insights";

/// Single prompt carrying the instructions, prior turns, document text and
/// the current question.
pub fn build_prompt(prompt: &str, history: &[ChatMessage], document_text: &str) -> String {
    format!(
        "
Core Instructions:
{CORE_INSTRUCTIONS}

Context History:
{}

PDF: {document_text}

Current Prompt: {prompt}
",
        format_history(history)
    )
}
