//! Stored transcript documents under `transcripts/`.

use futures_util::stream::{self, StreamExt};
use serde_json::Value;
use std::time::Duration;

use super::ObjectStore;
use crate::{AnalyzerError, Result};

pub const TRANSCRIPTS_PREFIX: &str = "transcripts/";
pub const EXPORTS_PREFIX: &str = "exports/";

/// Field names that may hold transcript text, in lookup order
pub const TRANSCRIPT_FIELDS: [&str; 3] = ["original_transcript", "transcript", "text"];

/// Object key of a stored transcript document
pub fn transcript_key(id: &str) -> String {
    format!("{}{}.json", TRANSCRIPTS_PREFIX, id)
}

/// Transcript text of a stored document.
///
/// The first of [`TRANSCRIPT_FIELDS`] present in the document decides the outcome: a
/// non-empty string is returned, anything else (empty, null, non-string) yields `None`
/// without consulting the remaining fields.
pub fn extract_transcript_text(document: &Value) -> Option<&str> {
    let object = document.as_object()?;
    let value = TRANSCRIPT_FIELDS
        .iter()
        .find_map(|field| object.get(*field))?;

    value.as_str().filter(|text| !text.is_empty())
}

/// Read a stored document and pull out its transcript text
pub async fn fetch_transcript_text(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
) -> Result<Option<String>> {
    tracing::info!("Retrieving transcript from bucket: {}, key: {}", bucket, key);

    let document = fetch_document(store, bucket, key).await?;
    let text = extract_transcript_text(&document).map(str::to_string);

    if text.is_none() {
        let available: Vec<&String> = document
            .as_object()
            .map(|object| object.keys().collect())
            .unwrap_or_default();
        tracing::warn!(?available, "Transcript is empty or not found in the expected format");
    }

    Ok(text)
}

async fn fetch_document(store: &dyn ObjectStore, bucket: &str, key: &str) -> Result<Value> {
    let body = store.get_object(bucket, key).await?;
    serde_json::from_slice(&body).map_err(|e| {
        AnalyzerError::transport(format!("Failed to parse s3://{}/{} as JSON", bucket, key), e)
    })
}

/// Every stored transcript document in the bucket.
///
/// Objects that cannot be read or parsed are logged and skipped.
pub async fn list_transcripts(
    store: &dyn ObjectStore,
    bucket: &str,
    concurrency: usize,
) -> Result<Vec<Value>> {
    let keys: Vec<String> = store
        .list_keys(bucket, TRANSCRIPTS_PREFIX)
        .await?
        .into_iter()
        .filter(|key| key.ends_with(".json"))
        .collect();

    tracing::debug!("Found {} transcript objects", keys.len());

    let documents: Vec<Value> = stream::iter(keys)
        .map(|key| async move {
            let result = fetch_document(store, bucket, &key).await;
            (key, result)
        })
        .buffered(concurrency.max(1))
        .filter_map(|(key, result)| async move {
            match result {
                Ok(document) => Some(document),
                Err(e) => {
                    tracing::warn!("Skipping transcript {}: {}", key, e);
                    None
                }
            }
        })
        .collect()
        .await;

    Ok(documents)
}

/// Stored transcript by id, `None` when no such object exists
pub async fn get_transcript(
    store: &dyn ObjectStore,
    bucket: &str,
    id: &str,
) -> Result<Option<Value>> {
    match fetch_document(store, bucket, &transcript_key(id)).await {
        Ok(document) => Ok(Some(document)),
        Err(AnalyzerError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Upload the transcript text of a document to `exports/` and return a download link
pub async fn export_transcript(
    store: &dyn ObjectStore,
    bucket: &str,
    document: &Value,
    link_ttl: Duration,
) -> Result<String> {
    let id = document
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| AnalyzerError::Validation("Transcript document has no id".to_string()))?;

    let text = extract_transcript_text(document)
        .ok_or_else(|| AnalyzerError::NotFound(format!("transcript text for {}", id)))?;

    let export_key = format!("{}export_{}.txt", EXPORTS_PREFIX, id);
    store
        .put_object(bucket, &export_key, text.as_bytes().to_vec(), "text/plain; charset=utf-8")
        .await?;

    tracing::info!("Exported transcript {} to {}", id, export_key);
    store.presign_get(bucket, &export_key, link_ttl).await
}
