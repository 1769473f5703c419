// Model bundle download helper.
//
// Fetches the toxicity model bundle (quantized ONNX weights + tokenizer)
// from a configurable base URL. Files are stored in a platform-appropriate
// directory (~/.local/share/palisade/models/ on Linux) so they persist
// across runs; files already present are not re-downloaded.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Default bundle location: the unbiased-toxic-roberta ONNX export, which
/// produces the seven categories the detector evaluates.
pub const DEFAULT_MODEL_URL: &str =
    "https://huggingface.co/protectai/unbiased-toxic-roberta-onnx/resolve/main";

/// Files making up the bundle.
pub const MODEL_FILE: &str = "model_quantized.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Returns the default directory for storing model files.
/// Uses the platform data directory: ~/.local/share/palisade/models/ on Linux.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("palisade")
        .join("models")
}

/// Check whether both bundle files exist.
pub fn bundle_present(dir: &Path) -> bool {
    dir.join(MODEL_FILE).exists() && dir.join(TOKENIZER_FILE).exists()
}

/// Download the model bundle into `dir`, skipping files already present.
///
/// Shows a progress bar for the large weights file. Creates the directory
/// as needed. Any failure (connection, non-2xx status, write) is reported
/// to the caller; nothing is left half-initialized because the classifier
/// is only constructed after this returns Ok.
pub async fn download_bundle(base_url: &str, dir: &Path) -> Result<()> {
    if bundle_present(dir) {
        info!("Model bundle already present in {}, skipping download", dir.display());
        return Ok(());
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

    let tokenizer_path = dir.join(TOKENIZER_FILE);
    if tokenizer_path.exists() {
        info!("Tokenizer already exists, skipping");
    } else {
        download_file(&format!("{}/{}", base_url, TOKENIZER_FILE), &tokenizer_path, false).await?;
    }

    let model_path = dir.join(MODEL_FILE);
    if model_path.exists() {
        info!("Model already exists, skipping");
    } else {
        download_file(&format!("{}/{}", base_url, MODEL_FILE), &model_path, true).await?;
    }

    Ok(())
}

/// Download a single file from a URL to a local path.
/// If `show_progress` is true, display a progress bar.
async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let total_size = response.content_length();

    let pb = if show_progress {
        let pb = if let Some(size) = total_size {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                    .expect("valid template")
                    .progress_chars("=> "),
            );
            pb
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("    {spinner} {bytes}")
                    .expect("valid template"),
            );
            pb
        };
        Some(pb)
    } else {
        None
    };

    let bytes = response
        .bytes()
        .await
        .context("Failed to read response body")?;

    if let Some(ref pb) = pb {
        pb.set_position(bytes.len() as u64);
    }

    std::fs::write(dest, &bytes).with_context(|| format!("Failed to write {}", dest.display()))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!("Downloaded {} to {}", url, dest.display());
    Ok(())
}
