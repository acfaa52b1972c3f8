/// Refusal phrase the backend is told to use when the context falls short.
pub const REFUSAL_PHRASE: &str = "I don't have sufficient information to answer this question.";

pub fn system_prompt() -> String {
    // Keep the contract explicit:
    // - Use ONLY the supplied context.
    // - Fixed refusal phrase when the context is insufficient.
    format!(
        r#"You are a helpful assistant that answers questions based ONLY on the provided context.

Rules:
1. Answer ONLY using information from the provided context.
2. If the context doesn't contain enough information, say "{REFUSAL_PHRASE}"
3. Do not make up or hallucinate information.
4. Be precise and cite specific details from the context.
5. If the question cannot be answered from the context, politely decline."#
    )
}

pub fn user_prompt(question: &str, context: &str) -> String {
    format!(
        r#"Context:
{context}

Question: {question}

Answer based ONLY on the context above:"#
    )
}
