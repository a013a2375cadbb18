use anyhow::{Context, Result};
use clap::Parser;
use lambda_runtime::{service_fn, LambdaEvent};
use serde_json::Value;
use std::io::Read;
use std::time::Duration;
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use call_analyzer::cli::{Cli, Commands, TranscriptAction};
use call_analyzer::storage::transcripts;
use call_analyzer::utils::format_duration;
use call_analyzer::{handle_event, output, Config, ServiceContext};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load().await?;

    match cli.command {
        Commands::Serve => serve(config).await?,
        Commands::Invoke { event, output } => {
            let payload = read_event(&event)?;
            let ctx = ServiceContext::new(config).await;

            let request_id = uuid::Uuid::new_v4().to_string();
            let span = tracing::info_span!("invocation", request_id = %request_id);
            let response = handle_event(&ctx, &payload).instrument(span).await;

            match output {
                Some(path) => {
                    output::save_to_file(&response, &path).await?;
                    println!("Response saved to: {}", path.display());
                }
                None => output::print_to_console(&response)?,
            }
        }
        Commands::Transcripts { bucket, action } => {
            let bucket = bucket.context("A bucket is required (--bucket or TRANSCRIPTS_BUCKET)")?;
            let ctx = ServiceContext::new(config).await;
            run_transcripts(&ctx, &bucket, action).await?;
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                match Config::config_path() {
                    Some(path) if path.exists() => {
                        println!("Configuration file: {}", path.display())
                    }
                    Some(path) => {
                        println!("No configuration file at {}, using defaults", path.display())
                    }
                    None => println!("No configuration directory available, using defaults"),
                }
                println!("Run with --show to print the effective configuration");
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "call_analyzer=debug"
    } else {
        "call_analyzer=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);

    // CloudWatch ingests one JSON object per line
    if std::env::var_os("AWS_LAMBDA_FUNCTION_NAME").is_some() {
        registry
            .with(tracing_subscriber::fmt::layer().json().without_time())
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Serve Lambda invocations until the runtime shuts the process down
async fn serve(config: Config) -> Result<()> {
    let ctx = ServiceContext::new(config).await;
    let ctx = &ctx;

    tracing::info!("Starting Lambda runtime");
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        let (payload, context) = event.into_parts();
        let span = tracing::info_span!("invocation", request_id = %context.request_id);
        Ok::<_, lambda_runtime::Error>(handle_event(ctx, &payload).instrument(span).await)
    }))
    .await
    .map_err(|e| anyhow::anyhow!("Lambda runtime error: {}", e))
}

fn read_event(source: &str) -> Result<Value> {
    let raw = if source == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read event from stdin")?;
        raw
    } else {
        fs_err::read_to_string(source)?
    };

    serde_json::from_str(&raw).context("Failed to parse event JSON")
}

async fn run_transcripts(
    ctx: &ServiceContext,
    bucket: &str,
    action: TranscriptAction,
) -> Result<()> {
    match action {
        TranscriptAction::List => {
            let documents = transcripts::list_transcripts(
                ctx.store(),
                bucket,
                ctx.config().app.max_concurrent_fetches,
            )
            .await?;
            output::print_to_console(&documents)?;
        }
        TranscriptAction::Get { id } => {
            let document = transcripts::get_transcript(ctx.store(), bucket, &id)
                .await?
                .with_context(|| format!("Transcript {} not found in bucket {}", id, bucket))?;
            output::print_to_console(&document)?;
        }
        TranscriptAction::Export { id } => {
            let document = transcripts::get_transcript(ctx.store(), bucket, &id)
                .await?
                .with_context(|| format!("Transcript {} not found in bucket {}", id, bucket))?;

            let ttl = ctx.config().app.export_link_ttl_secs;
            let url = transcripts::export_transcript(
                ctx.store(),
                bucket,
                &document,
                Duration::from_secs(ttl),
            )
            .await?;
            println!("Download link (valid for {}): {}", format_duration(ttl as f64), url);
        }
    }

    Ok(())
}
