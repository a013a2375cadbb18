use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Pretty-printed JSON for console or file output
pub fn format_as_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize output")
}

/// Save a value as pretty-printed JSON
pub async fn save_to_file<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let content = format_as_json(value)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print a value as pretty-printed JSON
pub fn print_to_console<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", format_as_json(value)?);
    Ok(())
}
