use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analysis::{analyze_transcript, AnalysisDocument};
use crate::audio::AudioFormat;
use crate::service::ServiceContext;
use crate::storage::transcripts::transcript_key;
use crate::utils::{format_file_size, sanitize_filename};
use crate::{AnalyzerError, Result};

/// Stored outcome of one processed recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultDocument {
    /// Processing timestamp, `YYYYMMDD_HHMMSS`
    pub id: String,

    /// Base name of the source audio object
    pub filename: String,

    pub metadata: ResultMetadata,

    pub original_transcript: String,

    pub analysis: AnalysisDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub processed_at: String,

    /// Audio duration in seconds, 0 when unknown
    pub audio_duration: f64,

    pub model_used: String,

    pub whisper_model: String,
}

/// Local file removed when the guard goes out of scope
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::info!("Cleaned up temporary file: {}", self.path.display()),
            Err(e) => {
                tracing::warn!("Failed to remove temporary file {}: {}", self.path.display(), e)
            }
        }
    }
}

/// Timestamp used as both document id and storage key suffix
pub fn processing_timestamp() -> String {
    chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Download, transcribe, analyze and store one audio object.
///
/// The scratch copy is removed on every exit path, and nothing is written to the
/// bucket unless every earlier step succeeded.
pub async fn process_audio_object(
    ctx: &ServiceContext,
    bucket: &str,
    key: &str,
    filename: &str,
) -> Result<ResultDocument> {
    let scratch_dir = ctx.scratch_dir();
    tokio::fs::create_dir_all(scratch_dir).await?;

    let scratch = ScratchFile::new(scratch_dir.join(sanitize_filename(filename)));

    tracing::info!("Downloading file {} from bucket {}", key, bucket);
    ctx.store().download(bucket, key, scratch.path()).await?;

    let size = match tokio::fs::metadata(scratch.path()).await {
        Ok(metadata) => metadata.len(),
        Err(_) => {
            return Err(AnalyzerError::NotFound(format!(
                "File not found: {}",
                scratch.path().display()
            )))
        }
    };
    if size == 0 {
        return Err(AnalyzerError::EmptyFile("Downloaded file is empty".to_string()));
    }
    tracing::info!(
        format = AudioFormat::from_key(filename).map(|f| f.as_str()).unwrap_or("unknown"),
        "Downloaded {} ({})",
        filename,
        format_file_size(size)
    );

    let transcription = ctx.transcriber().transcribe(scratch.path()).await?;
    tracing::info!(
        "Transcribed {} ({} chars)",
        filename,
        transcription.text.chars().count()
    );

    let analysis = analyze_transcript(ctx.model(), &transcription.text).await?;
    if analysis.is_degraded() {
        tracing::warn!("Storing unstructured analysis for {}", filename);
    }

    let timestamp = processing_timestamp();
    let document = ResultDocument {
        id: timestamp.clone(),
        filename: filename.to_string(),
        metadata: ResultMetadata {
            processed_at: timestamp.clone(),
            audio_duration: transcription.duration.unwrap_or(0.0),
            model_used: ctx.config().aws.model_label.clone(),
            whisper_model: ctx.transcriber().model_name().to_string(),
        },
        original_transcript: transcription.text,
        analysis,
    };

    let result_key = transcript_key(&timestamp);
    let body = serde_json::to_vec_pretty(&document)
        .map_err(|e| AnalyzerError::transport("Failed to encode result document", e))?;
    ctx.store()
        .put_object(bucket, &result_key, body, "application/json")
        .await?;

    tracing::info!("Result saved to {}", result_key);
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::llm::{reply_with_text, MockLanguageModel};
    use crate::storage::memory::MemoryStore;
    use crate::transcribe::FakeTranscriber;
    use std::sync::Arc;

    const ANALYSIS_REPLY: &str = r#"<json>{
  "leadAnalysis": {"interestLevel": "High"},
  "leadScore": 85,
  "status": "COMPLETE",
  "ambiguities": []
}</json>"#;

    struct Harness {
        _dir: tempfile::TempDir,
        scratch: PathBuf,
        store: Arc<MemoryStore>,
        transcriber: Arc<FakeTranscriber>,
    }

    impl Harness {
        fn new(store: MemoryStore, transcriber: FakeTranscriber) -> Self {
            let dir = tempfile::tempdir().unwrap();
            Self {
                scratch: dir.path().to_path_buf(),
                _dir: dir,
                store: Arc::new(store),
                transcriber: Arc::new(transcriber),
            }
        }

        fn context(&self, reply: &'static str) -> ServiceContext {
            let mut model = MockLanguageModel::new();
            model
                .expect_invoke()
                .returning(move |_, _| Ok(reply_with_text(reply)));

            let mut config = Config::default();
            config.app.scratch_dir = Some(self.scratch.clone());
            config.aws.inference_profile_arn = Some("arn".to_string());

            ServiceContext::from_parts(
                config,
                self.store.clone(),
                self.transcriber.clone(),
                Arc::new(model),
            )
        }

        fn scratch_is_empty(&self) -> bool {
            std::fs::read_dir(&self.scratch).unwrap().next().is_none()
        }
    }

    fn store_with_audio(body: &[u8]) -> MemoryStore {
        let store = MemoryStore::new();
        store.insert("b", "audio/call1.mp3", body.to_vec());
        store
    }

    #[tokio::test]
    async fn test_successful_run_persists_document_and_cleans_up() {
        let harness = Harness::new(
            store_with_audio(b"ID3 audio"),
            FakeTranscriber::returning("I want a Python course", Some(42.5)),
        );
        let ctx = harness.context(ANALYSIS_REPLY);

        let document = process_audio_object(&ctx, "b", "audio/call1.mp3", "call1.mp3")
            .await
            .unwrap();

        assert_eq!(document.filename, "call1.mp3");
        assert_eq!(document.id.len(), "YYYYMMDD_HHMMSS".len());
        assert_eq!(document.metadata.processed_at, document.id);
        assert_eq!(document.metadata.audio_duration, 42.5);
        assert_eq!(document.metadata.whisper_model, "medium");
        assert_eq!(document.metadata.model_used, "Claude 3.5");
        assert_eq!(document.original_transcript, "I want a Python course");
        assert_eq!(document.analysis.lead_score(), Some(85.0));

        let stored = harness
            .store
            .object("b", &format!("transcripts/{}.json", document.id))
            .unwrap();
        assert_eq!(stored.content_type, "application/json");
        let stored_doc: ResultDocument = serde_json::from_slice(&stored.body).unwrap();
        assert_eq!(stored_doc, document);
        assert!(String::from_utf8(stored.body).unwrap().contains("\n  \"id\""));

        let seen = harness.transcriber.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![harness.scratch.join("call1.mp3")]);
        assert!(harness.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_missing_duration_is_recorded_as_zero() {
        let harness = Harness::new(
            store_with_audio(b"ID3"),
            FakeTranscriber::returning("hello", None),
        );
        let ctx = harness.context(ANALYSIS_REPLY);

        let document = process_audio_object(&ctx, "b", "audio/call1.mp3", "call1.mp3")
            .await
            .unwrap();
        assert_eq!(document.metadata.audio_duration, 0.0);
    }

    #[tokio::test]
    async fn test_unparseable_analysis_is_still_persisted() {
        let harness = Harness::new(
            store_with_audio(b"ID3"),
            FakeTranscriber::returning("hello", Some(1.0)),
        );
        let ctx = harness.context("no structure here");

        let document = process_audio_object(&ctx, "b", "audio/call1.mp3", "call1.mp3")
            .await
            .unwrap();
        assert!(document.analysis.is_degraded());
        assert_eq!(harness.store.keys("b").len(), 2);
    }

    #[tokio::test]
    async fn test_empty_download_fails_and_cleans_up() {
        let harness = Harness::new(
            store_with_audio(b""),
            FakeTranscriber::returning("unused", None),
        );
        let ctx = harness.context(ANALYSIS_REPLY);

        let err = process_audio_object(&ctx, "b", "audio/call1.mp3", "call1.mp3")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::EmptyFile(_)));
        assert!(harness.transcriber.seen.lock().unwrap().is_empty());
        assert!(harness.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_missing_object_fails_without_writing() {
        let harness = Harness::new(MemoryStore::new(), FakeTranscriber::returning("unused", None));
        let ctx = harness.context(ANALYSIS_REPLY);

        let err = process_audio_object(&ctx, "b", "audio/call1.mp3", "call1.mp3")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::NotFound(_)));
        assert!(harness.store.keys("b").is_empty());
        assert!(harness.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_transcription_failure_cleans_up_and_persists_nothing() {
        let harness = Harness::new(
            store_with_audio(b"ID3"),
            FakeTranscriber::failing("model exploded"),
        );
        let ctx = harness.context(ANALYSIS_REPLY);

        let err = process_audio_object(&ctx, "b", "audio/call1.mp3", "call1.mp3")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Transcription(_)));
        assert_eq!(harness.store.keys("b"), vec!["audio/call1.mp3".to_string()]);
        assert!(harness.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_upload_failure_cleans_up() {
        let mut store = store_with_audio(b"ID3");
        store.fail_puts = true;
        let harness = Harness::new(store, FakeTranscriber::returning("hello", Some(1.0)));
        let ctx = harness.context(ANALYSIS_REPLY);

        let err = process_audio_object(&ctx, "b", "audio/call1.mp3", "call1.mp3")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Transport { .. }));
        assert!(harness.scratch_is_empty());
    }

    #[test]
    fn test_scratch_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("call.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        {
            let scratch = ScratchFile::new(path.clone());
            assert!(scratch.path().exists());
        }
        assert!(!path.exists());

        // Dropping a guard whose file never appeared is a no-op
        drop(ScratchFile::new(dir.path().join("never-written.wav")));
    }
}
