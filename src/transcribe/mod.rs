use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::{AnalyzerError, Result};

pub mod cache;
pub mod command;
#[cfg(feature = "whisper")]
pub mod whisper;

/// Transcribed text with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// The transcribed text
    pub text: String,

    /// Audio duration in seconds (if known)
    pub duration: Option<f64>,
}

/// Local speech-to-text backend
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe an audio file on local disk
    async fn transcribe(&self, audio: &Path) -> Result<TranscriptionResult>;

    /// Model size class reported in result metadata
    fn model_name(&self) -> &str;
}

/// Make sure an audio file exists and has content before handing it to a model
pub async fn check_audio_file(path: &Path) -> Result<u64> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        AnalyzerError::Transcription(format!("Audio file not accessible {}: {}", path.display(), e))
    })?;

    if !metadata.is_file() {
        return Err(AnalyzerError::Transcription(format!(
            "Path is not a file: {}",
            path.display()
        )));
    }
    if metadata.len() == 0 {
        return Err(AnalyzerError::Transcription(format!(
            "Audio file is empty: {}",
            path.display()
        )));
    }

    Ok(metadata.len())
}

/// Speech backend for this build. The model itself is loaded lazily on first use.
pub fn build_transcriber(config: &Config) -> Arc<dyn SpeechToText> {
    #[cfg(feature = "whisper")]
    {
        Arc::new(whisper::WhisperTranscriber::new(
            config.whisper.model.clone(),
            config.whisper_model_path(),
            config.whisper.threads,
        ))
    }

    #[cfg(not(feature = "whisper"))]
    {
        Arc::new(UnavailableTranscriber {
            model_name: config.whisper.model.clone(),
        })
    }
}

/// Stand-in used when the crate is built without the `whisper` feature
#[cfg(not(feature = "whisper"))]
struct UnavailableTranscriber {
    model_name: String,
}

#[cfg(not(feature = "whisper"))]
#[async_trait]
impl SpeechToText for UnavailableTranscriber {
    async fn transcribe(&self, audio: &Path) -> Result<TranscriptionResult> {
        check_audio_file(audio).await?;
        Err(AnalyzerError::Configuration(
            "local transcription requires building with the `whisper` feature".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Scripted transcriber for tests
#[cfg(test)]
pub(crate) struct FakeTranscriber {
    pub result: std::result::Result<TranscriptionResult, String>,
    pub seen: std::sync::Mutex<Vec<std::path::PathBuf>>,
}

#[cfg(test)]
impl FakeTranscriber {
    pub fn returning(text: &str, duration: Option<f64>) -> Self {
        Self {
            result: Ok(TranscriptionResult {
                text: text.to_string(),
                duration,
            }),
            seen: Default::default(),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            seen: Default::default(),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl SpeechToText for FakeTranscriber {
    async fn transcribe(&self, audio: &Path) -> Result<TranscriptionResult> {
        self.seen.lock().unwrap().push(audio.to_path_buf());
        check_audio_file(audio).await?;
        self.result.clone().map_err(AnalyzerError::Transcription)
    }

    fn model_name(&self) -> &str {
        "medium"
    }
}
