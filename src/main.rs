//! genre-daemon: music genre classification with generated recommendations.
//!
//! This binary can run in two modes:
//! - CLI mode: Classify a single audio file and print the result as JSON
//! - Daemon mode: JSON-RPC server over stdio for transport integration

use std::time::Instant;

use genre_daemon::cli::Cli;
use genre_daemon::error::Result;
use genre_daemon::models::{ensure_audio_models, ensure_text_models};
use genre_daemon::pipeline::ClassificationPipeline;
use genre_daemon::rpc::{run_server, ServerState};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();

    if cli.is_daemon_mode() {
        run_daemon_mode(&cli)
    } else if cli.is_cli_mode() {
        run_cli_mode(&cli)
    } else {
        print_usage();
        Ok(())
    }
}

/// Runs the CLI mode: classify one file and print the result.
fn run_cli_mode(cli: &Cli) -> Result<()> {
    let input = cli.input.as_ref().expect("Input required in CLI mode");
    let config = cli.to_config();

    if let Some(problem) = config.validate() {
        eprintln!("Invalid configuration: {}", problem);
        std::process::exit(2);
    }

    eprintln!("=== genre-daemon CLI ===");
    eprintln!("Input: {}", input.display());
    eprintln!("Audio model directory: {}", config.effective_audio_model_path().display());
    eprintln!("Text model directory: {}", config.effective_text_model_path().display());
    eprintln!("Sample rate: {} Hz", config.sample_rate);
    eprintln!("Max duration: {}s", config.max_audio_duration_sec);
    if let Some(seed) = config.generation.seed {
        eprintln!("Seed: {}", seed);
    }
    eprintln!();

    let pipeline = build_pipeline(&config)?;

    let bytes = std::fs::read(input).map_err(|e| {
        genre_daemon::DaemonError::invalid_audio(format!(
            "cannot read {}: {}",
            input.display(),
            e
        ))
    })?;

    let start_time = Instant::now();
    let result = pipeline.classify_with_recommendations(&bytes)?;
    let elapsed = start_time.elapsed().as_secs_f32();

    eprintln!();
    eprintln!("Classification complete!");
    eprintln!("  Time: {:.2}s", elapsed);
    eprintln!("  Genre: {}", result.genre);
    eprintln!("  Recommendations: {}", result.recommendations.len());
    eprintln!();

    println!(
        "{}",
        serde_json::to_string_pretty(&result).unwrap_or_default()
    );

    Ok(())
}

/// Runs the daemon mode (JSON-RPC server).
fn run_daemon_mode(cli: &Cli) -> Result<()> {
    let config = cli.to_config();

    if let Some(problem) = config.validate() {
        eprintln!("Invalid configuration: {}", problem);
        std::process::exit(2);
    }

    eprintln!("=== genre-daemon JSON-RPC Server ===");
    eprintln!("Reading from stdin, writing to stdout.");
    eprintln!("Send JSON-RPC requests to control the daemon.");
    eprintln!();

    let pipeline = build_pipeline(&config)?;
    let status = pipeline.status();

    eprintln!(
        "Audio classifier: loaded ({} genre labels)",
        status.genre_labels
    );
    if status.generator_available {
        eprintln!("Text generator: available");
    } else {
        eprintln!("Text generator: unavailable (serving without recommendations)");
    }
    eprintln!();

    let state = ServerState::new(pipeline, config);
    run_server(state)
}

/// Ensures model files are present and constructs the pipeline.
///
/// The classifier download and load are strict: a failure aborts startup.
/// The text model download is best-effort; when it fails, the generator
/// starts in the unavailable state and the service runs degraded.
fn build_pipeline(config: &genre_daemon::DaemonConfig) -> Result<ClassificationPipeline> {
    eprintln!("Checking model files...");
    ensure_audio_models(&config.effective_audio_model_path())?;

    if let Err(e) = ensure_text_models(&config.effective_text_model_path()) {
        eprintln!("Text model download failed, continuing without recommendations: {}", e);
    }
    eprintln!();

    ClassificationPipeline::new(config)
}

/// Prints usage information.
fn print_usage() {
    eprintln!("genre-daemon: music genre classification with generated recommendations");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  Classify a file:");
    eprintln!("    genre-daemon --input song.mp3");
    eprintln!();
    eprintln!("  Reproducible recommendation sampling:");
    eprintln!("    genre-daemon --input song.mp3 --seed 42");
    eprintln!();
    eprintln!("  Daemon mode (JSON-RPC server):");
    eprintln!("    genre-daemon --daemon");
    eprintln!();
    eprintln!("Run 'genre-daemon --help' for full options.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_usage_doesnt_panic() {
        print_usage();
    }
}
