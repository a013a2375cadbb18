use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::llm::{prompts, ModelClient};
use crate::utils::truncate_chars;
use crate::Result;

pub mod qna;

pub use qna::answer_question;

/// Characters of the raw reply kept in a degraded document's summary
pub const SUMMARY_CHARS: usize = 500;

/// Marker stored in degraded documents
pub const PARSE_ERROR: &str = "Failed to parse structured response";

/// Structured analysis of a call, or the raw reply when it could not be parsed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisDocument {
    Degraded {
        summary: String,
        error: String,
        raw_response: String,
    },
    Parsed(Map<String, Value>),
}

impl AnalysisDocument {
    /// Best-effort extraction of the JSON object embedded in a model reply.
    ///
    /// Takes everything from the first `{` to the last `}`. Never fails: anything that
    /// does not parse as a JSON object becomes [`AnalysisDocument::Degraded`].
    pub fn from_reply(reply: &str) -> Self {
        match Self::parse_object(reply) {
            Ok(object) => AnalysisDocument::Parsed(object),
            Err(reason) => {
                tracing::error!("Error parsing model response as JSON: {}", reason);
                AnalysisDocument::Degraded {
                    summary: truncate_chars(reply, SUMMARY_CHARS).to_string(),
                    error: PARSE_ERROR.to_string(),
                    raw_response: reply.to_string(),
                }
            }
        }
    }

    fn parse_object(reply: &str) -> std::result::Result<Map<String, Value>, String> {
        let start = reply.find('{').ok_or("no opening brace")?;
        let end = reply.rfind('}').ok_or("no closing brace")?;
        if end < start {
            return Err("closing brace precedes opening brace".to_string());
        }

        match serde_json::from_str::<Value>(&reply[start..=end]) {
            Ok(Value::Object(object)) => Ok(object),
            Ok(_) => Err("not a JSON object".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, AnalysisDocument::Degraded { .. })
    }

    /// `leadScore` of a parsed analysis, when the model produced a number
    pub fn lead_score(&self) -> Option<f64> {
        match self {
            AnalysisDocument::Parsed(object) => object.get("leadScore").and_then(Value::as_f64),
            AnalysisDocument::Degraded { .. } => None,
        }
    }
}

/// Run the sales-call analysis prompt over a transcript
pub async fn analyze_transcript(
    client: &ModelClient,
    transcript: &str,
) -> Result<AnalysisDocument> {
    tracing::info!("Analyzing transcript ({} chars)", transcript.chars().count());

    let reply = client.complete(&prompts::sales_analysis(transcript)).await?;
    let document = AnalysisDocument::from_reply(&reply);

    if let Some(score) = document.lead_score() {
        tracing::info!(lead_score = score, "Analysis complete");
    }
    Ok(document)
}
