//! Model downloader for the classification and generation models.
//!
//! Downloads model files from HuggingFace if not present locally.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{DaemonError, Result};

use super::classifier::REQUIRED_AUDIO_MODEL_FILES;
use super::generator::REQUIRED_TEXT_MODEL_FILES;

/// HuggingFace URLs for the audio-classification model files.
pub const AUDIO_MODEL_URLS: &[(&str, &str)] = &[
    (
        "model.onnx",
        "https://huggingface.co/dima806/music_genres_classification/resolve/main/onnx/model.onnx",
    ),
    (
        "config.json",
        "https://huggingface.co/dima806/music_genres_classification/resolve/main/config.json",
    ),
];

/// HuggingFace URLs for the text-generation model files.
pub const TEXT_MODEL_URLS: &[(&str, &str)] = &[
    (
        "config.json",
        "https://huggingface.co/Xenova/flan-t5-base/resolve/main/config.json",
    ),
    (
        "tokenizer.json",
        "https://huggingface.co/Xenova/flan-t5-base/resolve/main/tokenizer.json",
    ),
    (
        "encoder_model.onnx",
        "https://huggingface.co/Xenova/flan-t5-base/resolve/main/onnx/encoder_model.onnx",
    ),
    (
        "decoder_model.onnx",
        "https://huggingface.co/Xenova/flan-t5-base/resolve/main/onnx/decoder_model.onnx",
    ),
    (
        "decoder_with_past_model.onnx",
        "https://huggingface.co/Xenova/flan-t5-base/resolve/main/onnx/decoder_with_past_model.onnx",
    ),
];

/// Downloads the audio-classification model files if not present.
pub fn ensure_audio_models(model_dir: &Path) -> Result<()> {
    ensure_files(model_dir, REQUIRED_AUDIO_MODEL_FILES, AUDIO_MODEL_URLS)
}

/// Downloads the text-generation model files if not present.
///
/// `config.json` is optional for the text model and a failed download of it
/// is ignored; the flan-t5-base defaults cover it.
pub fn ensure_text_models(model_dir: &Path) -> Result<()> {
    ensure_files(model_dir, REQUIRED_TEXT_MODEL_FILES, TEXT_MODEL_URLS)?;

    let config_path = model_dir.join("config.json");
    if !config_path.exists() {
        if let Some((_, url)) = TEXT_MODEL_URLS.iter().find(|(name, _)| *name == "config.json") {
            let _ = download_file_streaming(url, &config_path); // Ignore error, config is optional
        }
    }

    Ok(())
}

/// Downloads all required files for one model if not present.
///
/// Returns Ok(()) if all files exist or were successfully downloaded.
fn ensure_files(model_dir: &Path, required: &[&str], urls: &[(&str, &str)]) -> Result<()> {
    // Create model directory if it doesn't exist
    if !model_dir.exists() {
        fs::create_dir_all(model_dir).map_err(|e| {
            DaemonError::model_download_failed(format!(
                "Failed to create model directory {}: {}",
                model_dir.display(),
                e
            ))
        })?;
    }

    // Check which files are missing
    let mut missing: Vec<&str> = Vec::new();
    for file in required {
        let path = model_dir.join(file);
        if !path.exists() {
            missing.push(file);
        }
    }

    if missing.is_empty() {
        return Ok(());
    }

    eprintln!("Downloading {} missing model files...", missing.len());
    eprintln!("(This may take several minutes on first run)");
    eprintln!();

    // Download missing files
    for file in &missing {
        // Find the URL for this file
        let url = urls
            .iter()
            .find(|(name, _)| name == file)
            .map(|(_, url)| *url);

        if let Some(url) = url {
            download_file_streaming(url, &model_dir.join(file))?;
        } else {
            return Err(DaemonError::model_download_failed(format!(
                "No download URL for {}",
                file
            )));
        }
    }

    eprintln!();
    eprintln!("All models downloaded successfully.");
    Ok(())
}

/// Downloads a file using streaming to handle large files.
fn download_file_streaming(url: &str, dest: &Path) -> Result<()> {
    let filename = dest.file_name().unwrap_or_default().to_string_lossy();
    eprint!("  Downloading {}... ", filename);

    // Create a client with longer timeout for large files
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(3600)) // 1 hour timeout
        .build()
        .map_err(|e| {
            DaemonError::model_download_failed(format!("Failed to create HTTP client: {}", e))
        })?;

    let mut response = client.get(url).send().map_err(|e| {
        DaemonError::model_download_failed(format!("Failed to download {}: {}", url, e))
    })?;

    if !response.status().is_success() {
        return Err(DaemonError::model_download_failed(format!(
            "HTTP {} for {}",
            response.status(),
            url
        )));
    }

    // Get content length for progress
    let total_size = response.content_length().unwrap_or(0);

    // Create output file
    let mut file = fs::File::create(dest).map_err(|e| {
        DaemonError::model_download_failed(format!(
            "Failed to create file {}: {}",
            dest.display(),
            e
        ))
    })?;

    // Stream the download in chunks
    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; 65536]; // 64KB buffer
    let mut last_progress = 0;

    loop {
        let bytes_read = response.read(&mut buffer).map_err(|e| {
            DaemonError::model_download_failed(format!("Failed to read response: {}", e))
        })?;

        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read]).map_err(|e| {
            DaemonError::model_download_failed(format!("Failed to write file: {}", e))
        })?;

        downloaded += bytes_read as u64;

        // Print progress every 10%
        if total_size > 0 {
            let progress = (downloaded * 100 / total_size) as usize;
            if progress >= last_progress + 10 {
                eprint!("{}%... ", progress);
                last_progress = progress;
            }
        }
    }

    let size_mb = downloaded as f64 / (1024.0 * 1024.0);
    eprintln!("done ({:.1} MB)", size_mb);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_model_urls_are_configured() {
        // Verify all required classifier files have URLs
        for file in REQUIRED_AUDIO_MODEL_FILES {
            let has_url = AUDIO_MODEL_URLS.iter().any(|(name, _)| name == file);
            assert!(has_url, "Missing URL for required file: {}", file);
        }
    }

    #[test]
    fn text_model_urls_are_configured() {
        // Verify all required generator files have URLs
        for file in REQUIRED_TEXT_MODEL_FILES {
            let has_url = TEXT_MODEL_URLS.iter().any(|(name, _)| name == file);
            assert!(has_url, "Missing URL for required file: {}", file);
        }
    }
}
