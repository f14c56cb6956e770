//! Prompt text sent to the answer generator.

/// Default cap on generated answer length, in tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Build the single-shot question-answering prompt.
///
/// The generator is told to stay within `context`, name the documents it
/// draws on and admit when the context is not enough.
pub fn build_answer_prompt(query: &str, context: &str) -> String {
    format!(
        r#"You are a helpful assistant that answers questions using only the documents provided below.

Context from documents:
{context}

Question: {query}

Answer using only the information in the documents above. Name the documents you relied on. If the documents do not contain enough information to answer the question, say so plainly."#
    )
}
