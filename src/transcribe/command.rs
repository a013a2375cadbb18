use tokio::process::Command;

use crate::{AnalyzerError, Result};

/// Run an external tool to completion and return its stdout.
///
/// The child is killed if the returned future is dropped, so an abandoned
/// invocation leaves no process writing into the scratch directory.
pub async fn run_tool(mut command: Command, tool: &str) -> Result<Vec<u8>> {
    command.kill_on_drop(true);

    let output = command
        .output()
        .await
        .map_err(|e| AnalyzerError::Transcription(format!("Failed to run {}: {}", tool, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AnalyzerError::Transcription(format!(
            "{} exited with {}: {}",
            tool,
            output.status,
            stderr.trim()
        )));
    }

    Ok(output.stdout)
}
