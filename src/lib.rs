//! Call Analyzer - serverless transcription and analysis of recorded sales calls
//!
//! Audio uploaded under `audio/` in an S3 bucket is transcribed with a local Whisper
//! model, analyzed by a Bedrock-hosted language model, and the result is stored back
//! under `transcripts/`. Stored transcripts can then be queried with free-form questions.

pub mod analysis;
pub mod audio;
pub mod cli;
pub mod config;
pub mod handler;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod service;
pub mod storage;
pub mod transcribe;
pub mod utils;

pub use analysis::AnalysisDocument;
pub use cli::{Cli, Commands};
pub use config::Config;
pub use handler::{handle_event, Response};
pub use pipeline::ResultDocument;
pub use service::ServiceContext;
pub use transcribe::{SpeechToText, TranscriptionResult};

/// Result type used throughout the library
pub type Result<T, E = AnalyzerError> = std::result::Result<T, E>;

/// Error kinds surfaced across adapter boundaries
#[derive(thiserror::Error, Debug)]
pub enum AnalyzerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Empty file: {0}")]
    EmptyFile(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("{context}: {message}")]
    Transport { context: String, message: String },

    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invocation timed out after {0}s")]
    Timeout(u64),
}

impl AnalyzerError {
    pub fn transport(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AnalyzerError::Transport {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Input problems the caller can fix, as opposed to failures on our side
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AnalyzerError::Validation(_) | AnalyzerError::NotFound(_) | AnalyzerError::EmptyFile(_)
        )
    }
}
