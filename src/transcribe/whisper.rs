//! Local Whisper inference through whisper.cpp.
//!
//! Audio is normalized to 16 kHz mono PCM with ffmpeg, read with hound and fed to a
//! ggml model that is loaded once and shared by every later call.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::cache::ModelCache;
use super::command::run_tool;
use super::{check_audio_file, SpeechToText, TranscriptionResult};
use crate::pipeline::ScratchFile;
use crate::utils::format_duration;
use crate::{AnalyzerError, Result};

/// Sample rate Whisper models are trained on
const SAMPLE_RATE: u32 = 16_000;

pub struct WhisperTranscriber {
    model_name: String,
    model_path: PathBuf,
    threads: i32,
    context: ModelCache<WhisperContext>,
}

impl WhisperTranscriber {
    pub fn new(model_name: String, model_path: PathBuf, threads: i32) -> Self {
        Self {
            model_name,
            model_path,
            threads,
            context: ModelCache::new(),
        }
    }

    /// Loaded model, initializing it on first use
    async fn context(&self) -> Result<Arc<WhisperContext>> {
        self.context
            .get_or_load(|| async {
                let path = self.model_path.clone();
                tracing::info!(
                    "Loading Whisper model {} from {}",
                    self.model_name,
                    path.display()
                );
                let started = Instant::now();

                let context = tokio::task::spawn_blocking(move || load_model(&path))
                    .await
                    .map_err(|e| {
                        AnalyzerError::Transcription(format!("Model loading task failed: {}", e))
                    })??;

                tracing::info!("Whisper model loaded in {:.1}s", started.elapsed().as_secs_f64());
                Ok(context)
            })
            .await
    }
}

fn load_model(path: &Path) -> Result<WhisperContext> {
    let path = path.to_str().ok_or_else(|| {
        AnalyzerError::Configuration(format!("Model path is not valid UTF-8: {}", path.display()))
    })?;

    // CPU only, full precision
    let mut params = WhisperContextParameters::default();
    params.use_gpu(false);
    params.flash_attn(false);

    WhisperContext::new_with_params(path, params)
        .map_err(|e| AnalyzerError::Transcription(format!("Whisper load failed: {}", e)))
}

/// Convert any supported input to 16 kHz mono 16-bit WAV
async fn normalize_audio(input: &Path, output: &Path) -> Result<()> {
    tracing::debug!("Normalizing {} to 16 kHz mono PCM", input.display());

    let mut command = Command::new("ffmpeg");
    command
        .arg("-nostdin")
        .arg("-i")
        .arg(input)
        .args(["-vn", "-ac", "1", "-ar", "16000", "-c:a", "pcm_s16le"])
        .arg("-y")
        .arg(output);

    run_tool(command, "ffmpeg").await?;
    Ok(())
}

fn read_samples(wav: &Path) -> Result<Vec<f32>> {
    let mut reader = hound::WavReader::open(wav)
        .map_err(|e| AnalyzerError::Transcription(format!("Failed to open decoded audio: {}", e)))?;

    let spec = reader.spec();
    if spec.sample_rate != SAMPLE_RATE || spec.channels != 1 {
        return Err(AnalyzerError::Transcription(format!(
            "Decoded audio is {} Hz / {} channels, expected 16000 Hz mono",
            spec.sample_rate, spec.channels
        )));
    }

    reader
        .samples::<i16>()
        .map(|sample| sample.map(|s| s as f32 / i16::MAX as f32))
        .collect::<std::result::Result<Vec<f32>, _>>()
        .map_err(|e| AnalyzerError::Transcription(format!("Failed to read decoded audio: {}", e)))
}

fn run_inference(context: &WhisperContext, samples: &[f32], threads: i32) -> Result<String> {
    let mut state = context
        .create_state()
        .map_err(|e| AnalyzerError::Transcription(format!("Whisper state init failed: {}", e)))?;

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_n_threads(threads);
    params.set_language(Some("en"));
    params.set_translate(false);
    params.set_print_progress(true);
    params.set_print_timestamps(true);
    params.set_print_realtime(false);

    state
        .full(params, samples)
        .map_err(|e| AnalyzerError::Transcription(format!("Whisper inference failed: {}", e)))?;

    let mut text = String::new();
    for segment in state.as_iter() {
        if let Ok(segment_text) = segment.to_str() {
            tracing::debug!(segment = segment_text, "Transcribed segment");
            text.push_str(segment_text);
        }
    }

    Ok(text.trim().to_string())
}

#[async_trait]
impl SpeechToText for WhisperTranscriber {
    async fn transcribe(&self, audio: &Path) -> Result<TranscriptionResult> {
        check_audio_file(audio).await?;

        let wav = ScratchFile::new(audio.with_extension("16k.wav"));
        normalize_audio(audio, wav.path()).await?;
        let samples = read_samples(wav.path())?;
        drop(wav);

        let duration = samples.len() as f64 / SAMPLE_RATE as f64;
        tracing::info!(
            "Transcribing {} ({} of audio)",
            audio.display(),
            format_duration(duration)
        );

        let context = self.context().await?;
        let threads = self.threads;
        let started = Instant::now();

        // A blocking task cannot be cancelled; a timed-out invocation still runs it to the end
        tracing::debug!("Running Whisper inference on a blocking thread");
        let text = tokio::task::spawn_blocking(move || run_inference(&context, &samples, threads))
            .await
            .map_err(|e| AnalyzerError::Transcription(format!("Inference task failed: {}", e)))??;

        tracing::info!(
            "Transcription finished in {:.1}s ({} chars)",
            started.elapsed().as_secs_f64(),
            text.chars().count()
        );

        Ok(TranscriptionResult {
            text,
            duration: Some(duration),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
