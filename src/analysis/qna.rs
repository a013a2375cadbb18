use serde::{Deserialize, Serialize};

use crate::llm::{prompts, ModelClient};
use crate::Result;

/// Answer to a question about a stored transcript; returned to the caller, never stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QnaResponse {
    pub question: String,
    pub answer: String,
    pub transcript_file: String,
}

/// Ask the model a question about a transcript and return its answer verbatim
pub async fn answer_question(
    client: &ModelClient,
    transcript: &str,
    question: &str,
) -> Result<String> {
    tracing::info!(
        "Answering question against transcript ({} chars)",
        transcript.chars().count()
    );

    client
        .complete(&prompts::transcript_question(transcript, question))
        .await
}
