use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Maps model names to their HuggingFace filenames
fn model_filename(model_name: &str) -> String {
    format!("ggml-{model_name}.bin")
}

/// Ensures the model is on disk, returns true if it was downloaded just now
///
/// # Errors
/// Returns error if the download or filesystem operations fail
pub fn ensure_model(model_name: &str, model_path: &Path) -> Result<bool> {
    if model_path.exists() {
        tracing::info!(
            path = %model_path.display(),
            "model already exists, skipping download"
        );
        return Ok(false);
    }

    tracing::info!(
        model = model_name,
        path = %model_path.display(),
        "model not found, starting download"
    );

    download_model(model_name, model_path)?;

    Ok(true)
}

fn download_model(model_name: &str, model_path: &Path) -> Result<()> {
    let filename = model_filename(model_name);
    let url = format!("{MODEL_BASE_URL}/{filename}");

    if let Some(parent) = model_path.parent() {
        fs::create_dir_all(parent).context("failed to create model directory")?;
    }

    // Download into a temp file, rename into place once complete so an
    // interrupted download never leaves a truncated model behind
    let temp_path = model_path.with_extension("tmp");
    if temp_path.exists() {
        tracing::debug!(path = %temp_path.display(), "removing stale partial download");
        let _ = fs::remove_file(&temp_path);
    }

    tracing::info!(url = %url, "downloading model");

    let mut response = reqwest::blocking::get(&url)
        .with_context(|| format!("failed to download model from {url}"))?;

    if !response.status().is_success() {
        anyhow::bail!("download failed with status {}: {}", response.status(), url);
    }

    // Models run to gigabytes, stream to disk rather than buffering
    let mut file = fs::File::create(&temp_path)
        .with_context(|| format!("failed to create temp file at {}", temp_path.display()))?;
    let bytes_written = response
        .copy_to(&mut file)
        .context("failed to stream model to temp file")?;
    drop(file);

    fs::rename(&temp_path, model_path).with_context(|| {
        format!(
            "failed to rename {} to {}",
            temp_path.display(),
            model_path.display()
        )
    })?;

    tracing::info!(
        path = %model_path.display(),
        size = bytes_written,
        "model downloaded"
    );

    Ok(())
}
