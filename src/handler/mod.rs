//! Event routing: turns an invocation payload into a status code and JSON body.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::analysis::answer_question;
use crate::analysis::qna::QnaResponse;
use crate::audio::validate_audio_key;
use crate::pipeline::process_audio_object;
use crate::service::ServiceContext;
use crate::storage::transcripts::fetch_transcript_text;
use crate::utils::{decode_object_key, filename_from_key};
use crate::{AnalyzerError, Result};

pub const OP_TRANSCRIBE: &str = "transcribe";
pub const OP_QNA: &str = "q_n_a";

/// Invocation result in the API Gateway / Lambda proxy shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "statusCode")]
    pub status_code: u16,

    /// JSON-encoded body
    pub body: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

impl Response {
    pub fn json<T: Serialize>(status_code: u16, body: &T) -> Self {
        match serde_json::to_string(body) {
            Ok(body) => Self {
                status_code,
                body,
                headers: None,
            },
            Err(e) => Self::error(500, &format!("Failed to encode response: {}", e)),
        }
    }

    pub fn error(status_code: u16, message: &str) -> Self {
        Self {
            status_code,
            body: json!({ "error": message }).to_string(),
            headers: None,
        }
    }

    /// Response for failures that escaped routing
    fn internal_error(message: &str) -> Self {
        let headers = BTreeMap::from([
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        ]);
        Self {
            headers: Some(headers),
            ..Self::error(500, message)
        }
    }

    /// Decoded body
    pub fn body_json(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.body)
    }
}

#[derive(Debug, Deserialize)]
struct S3EventRecord {
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,
}

/// Handle one invocation event. Always produces a response.
pub async fn handle_event(ctx: &ServiceContext, event: &Value) -> Response {
    let limit = ctx.config().app.invocation_timeout_secs;

    let err = match tokio::time::timeout(Duration::from_secs(limit), route(ctx, event)).await {
        Ok(Ok(response)) => return response,
        Ok(Err(e)) => e,
        Err(_) => AnalyzerError::Timeout(limit),
    };

    tracing::error!("Error: {}", err);
    Response::internal_error(&err.to_string())
}

async fn route(ctx: &ServiceContext, event: &Value) -> Result<Response> {
    let operation = match event.get("operation") {
        None => OP_TRANSCRIBE.to_string(),
        Some(Value::String(op)) => op.clone(),
        Some(other) => other.to_string(),
    };
    tracing::info!(operation = %operation, "Handling event");

    match operation.as_str() {
        OP_TRANSCRIBE => transcribe(ctx, event).await,
        OP_QNA => Ok(question_and_answer(ctx, event).await),
        _ => Ok(Response::error(400, &format!("Invalid operation: {}", operation))),
    }
}

async fn transcribe(ctx: &ServiceContext, event: &Value) -> Result<Response> {
    let records = match event.get("Records").and_then(Value::as_array) {
        Some(records) if !records.is_empty() => records,
        _ => {
            return Ok(Response::error(
                400,
                "Missing S3 event records for transcription",
            ))
        }
    };

    if records.len() > 1 {
        tracing::warn!("Only the first of {} records is processed", records.len());
    }

    let record = match S3EventRecord::deserialize(&records[0]) {
        Ok(record) => record,
        Err(e) => return Ok(Response::error(400, &format!("Malformed S3 event record: {}", e))),
    };

    let bucket = record.s3.bucket.name;
    let key = decode_object_key(&record.s3.object.key).into_owned();
    let filename = filename_from_key(&key).to_string();

    if !validate_audio_key(&key) {
        return Ok(Response::error(
            400,
            "Invalid file type or location. Please upload audio files to the audio/ folder.",
        ));
    }

    match process_audio_object(ctx, &bucket, &key, &filename).await {
        Ok(document) => Ok(Response::json(200, &document)),
        Err(e) if e.is_client_error() => Ok(Response::error(400, &e.to_string())),
        Err(e) => Err(e),
    }
}

fn non_empty_str<'a>(event: &'a Value, field: &str) -> Option<&'a str> {
    event
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

async fn question_and_answer(ctx: &ServiceContext, event: &Value) -> Response {
    let params = (
        non_empty_str(event, "transcript_file"),
        non_empty_str(event, "transcript_bucket"),
        non_empty_str(event, "question"),
    );
    let (transcript_file, transcript_bucket, question) = match params {
        (Some(file), Some(bucket), Some(question)) => (file, bucket, question),
        _ => {
            return Response::error(
                400,
                "Missing required parameters: transcript_file, transcript_bucket, and question",
            )
        }
    };

    let transcript =
        match fetch_transcript_text(ctx.store(), transcript_bucket, transcript_file).await {
            Ok(Some(text)) => text,
            Ok(None) | Err(AnalyzerError::NotFound(_)) => {
                return Response::error(404, "Transcript not found or empty")
            }
            Err(e) => return qna_failure(e),
        };

    match answer_question(ctx.model(), &transcript, question).await {
        Ok(answer) => Response::json(
            200,
            &QnaResponse {
                question: question.to_string(),
                answer,
                transcript_file: transcript_file.to_string(),
            },
        ),
        Err(e) => qna_failure(e),
    }
}

fn qna_failure(err: AnalyzerError) -> Response {
    tracing::error!("Error in Q&A: {}", err);
    Response::error(500, &format!("Error processing Q&A: {}", err))
}
