use anyhow::{Context, Result};
use aws_config::Region;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// AWS configuration
    pub aws: AwsConfig,

    /// Speech recognition settings
    pub whisper: WhisperConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    /// AWS region
    pub region: String,

    /// Bedrock inference profile ARN or model id used for every model call
    pub inference_profile_arn: Option<String>,

    /// Label recorded in result metadata for the analysis model
    pub model_label: String,

    /// Total attempts per AWS call, including the first one
    pub max_attempts: u32,

    /// Per-operation timeout for AWS calls in seconds
    pub operation_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperConfig {
    /// Model size class (tiny, base, small, medium, large)
    pub model: String,

    /// Path to the ggml model file; defaults to `/opt/models/ggml-<model>.bin`
    pub model_path: Option<PathBuf>,

    /// Inference threads
    pub threads: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory for scratch copies of downloaded audio
    pub scratch_dir: Option<PathBuf>,

    /// Upper bound for handling a single event
    pub invocation_timeout_secs: u64,

    /// Lifetime of presigned export links
    pub export_link_ttl_secs: u64,

    /// Concurrent object fetches when listing transcripts
    pub max_concurrent_fetches: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aws: AwsConfig {
                region: "us-east-1".to_string(),
                inference_profile_arn: None,
                model_label: "Claude 3.5".to_string(),
                max_attempts: 3,
                operation_timeout_secs: 120,
            },
            whisper: WhisperConfig {
                model: "medium".to_string(),
                model_path: None,
                threads: 4,
            },
            app: AppConfig {
                scratch_dir: None,
                invocation_timeout_secs: 900,
                export_link_ttl_secs: 3600,
                max_concurrent_fetches: 8,
            },
        }
    }
}

impl Config {
    /// Load configuration from file (or defaults) and apply environment overrides
    pub async fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => {
                let content = fs_err::read_to_string(&path)
                    .context("Failed to read config file")?;

                serde_yaml::from_str::<Config>(&content)
                    .context("Failed to parse config file")?
            }
            _ => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Get configuration file path
    pub fn config_path() -> Option<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir().map(|dir| dir.join("call-analyzer").join("config.yaml"))
    }

    /// Override file settings with the variables a Lambda deployment sets
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(region) = var("AWS_REGION").filter(|v| !v.is_empty()) {
            self.aws.region = region;
        }
        if let Some(arn) = var("INFERENCE_PROFILE_ARN") {
            self.aws.inference_profile_arn = Some(arn);
        }
        if let Some(path) = var("WHISPER_MODEL_PATH").filter(|v| !v.is_empty()) {
            self.whisper.model_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = var("SCRATCH_DIR").filter(|v| !v.is_empty()) {
            self.app.scratch_dir = Some(PathBuf::from(dir));
        }
        if let Some(secs) = var("INVOCATION_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.app.invocation_timeout_secs = secs;
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.aws.region.trim().is_empty() {
            anyhow::bail!("AWS region must be configured");
        }
        if self.aws.max_attempts == 0 {
            anyhow::bail!("aws.max_attempts must be at least 1");
        }
        if self.aws.operation_timeout_secs == 0 || self.app.invocation_timeout_secs == 0 {
            anyhow::bail!("Timeouts must be greater than zero");
        }

        Ok(())
    }

    /// Deployment identifier for the hosted model, if one is set
    pub fn inference_profile(&self) -> Option<&str> {
        self.aws
            .inference_profile_arn
            .as_deref()
            .map(str::trim)
            .filter(|arn| !arn.is_empty())
    }

    /// Where the ggml weights for the configured model size live
    pub fn whisper_model_path(&self) -> PathBuf {
        self.whisper.model_path.clone().unwrap_or_else(|| {
            PathBuf::from(format!("/opt/models/ggml-{}.bin", self.whisper.model))
        })
    }

    /// Scratch directory; Lambda only allows writes under /tmp
    pub fn scratch_dir(&self) -> PathBuf {
        if let Some(dir) = &self.app.scratch_dir {
            return dir.clone();
        }
        if std::env::var_os("AWS_LAMBDA_FUNCTION_NAME").is_some() {
            PathBuf::from("/tmp")
        } else {
            PathBuf::from(".")
        }
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  AWS Region: {}", self.aws.region);
        println!(
            "  Inference Profile: {}",
            self.inference_profile().unwrap_or("(not set)")
        );
        println!("  Max Attempts: {}", self.aws.max_attempts);
        println!("  Whisper Model: {}", self.whisper.model);
        println!("  Whisper Model Path: {}", self.whisper_model_path().display());
        println!("  Scratch Dir: {}", self.scratch_dir().display());
        println!("  Invocation Timeout: {}s", self.app.invocation_timeout_secs);
    }

    /// Get AWS region
    pub fn aws_region(&self) -> Region {
        Region::new(self.aws.region.clone())
    }
}
