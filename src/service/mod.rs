use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_types::SdkConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::llm::{BedrockModel, LanguageModel, ModelClient};
use crate::storage::{ObjectStore, S3Store};
use crate::transcribe::{build_transcriber, SpeechToText};

/// Long-lived handles shared by every invocation in a process.
///
/// Built once at start-up and passed to the handler; the speech model it owns is
/// loaded on first use and reused while the process stays warm.
#[derive(Clone)]
pub struct ServiceContext {
    config: Arc<Config>,
    scratch_dir: PathBuf,
    store: Arc<dyn ObjectStore>,
    transcriber: Arc<dyn SpeechToText>,
    model: ModelClient,
}

impl ServiceContext {
    /// Build AWS-backed clients from configuration
    pub async fn new(config: Config) -> Self {
        let sdk_config = load_sdk_config(&config).await;

        let store = Arc::new(S3Store::new(aws_sdk_s3::Client::new(&sdk_config)));
        let model = Arc::new(BedrockModel::new(aws_sdk_bedrockruntime::Client::new(&sdk_config)));
        let transcriber = build_transcriber(&config);

        Self::from_parts(config, store, transcriber, model)
    }

    /// Assemble a context from explicit collaborators
    pub fn from_parts(
        config: Config,
        store: Arc<dyn ObjectStore>,
        transcriber: Arc<dyn SpeechToText>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        let model = ModelClient::new(model, config.inference_profile().map(str::to_string));
        let scratch_dir = config.scratch_dir();

        Self {
            config: Arc::new(config),
            scratch_dir,
            store,
            transcriber,
            model,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn transcriber(&self) -> &dyn SpeechToText {
        self.transcriber.as_ref()
    }

    pub fn model(&self) -> &ModelClient {
        &self.model
    }
}

/// Shared AWS configuration with bounded retries and per-operation timeouts
async fn load_sdk_config(config: &Config) -> SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(config.aws_region())
        .retry_config(RetryConfig::standard().with_max_attempts(config.aws.max_attempts))
        .timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(Duration::from_secs(config.aws.operation_timeout_secs))
                .build(),
        )
        .load()
        .await
}
