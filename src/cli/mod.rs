use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "call-analyzer",
    about = "Call Analyzer - Transcribe sales calls with Whisper and analyze them with Bedrock",
    version,
    long_about = "Serverless handler for audio uploaded to S3: transcribes recordings with a local Whisper model, scores the call with a Bedrock-hosted model and stores the result under transcripts/. Stored transcripts can be queried with free-form questions."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as an AWS Lambda function
    Serve,

    /// Handle a single event locally and print the response
    Invoke {
        /// Event JSON file ("-" reads from stdin)
        #[arg(short, long, value_name = "FILE", default_value = "-")]
        event: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Browse stored transcripts
    Transcripts {
        /// Bucket holding the transcripts/ folder
        #[arg(short, long, env = "TRANSCRIPTS_BUCKET", global = true)]
        bucket: Option<String>,

        #[command(subcommand)]
        action: TranscriptAction,
    },

    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum TranscriptAction {
    /// List every stored transcript
    List,

    /// Show one transcript by id
    Get {
        /// Transcript id (YYYYMMDD_HHMMSS)
        id: String,
    },

    /// Export transcript text and print a download link
    Export {
        /// Transcript id (YYYYMMDD_HHMMSS)
        id: String,
    },
}
