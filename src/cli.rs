//! CLI argument parser for standalone mode.
//!
//! Provides a command-line interface for classifying a single file
//! without the full daemon infrastructure.

use std::path::PathBuf;

use clap::Parser;

use crate::config::DaemonConfig;

/// genre-daemon: music genre classification with generated recommendations
#[derive(Parser, Debug)]
#[command(name = "genre-daemon")]
#[command(about = "Music genre classification daemon with ONNX audio-classification and text-generation backends")]
#[command(version)]
pub struct Cli {
    /// Path to the audio file to classify
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Path to directory containing the audio-classification ONNX model
    #[arg(long)]
    pub audio_model_dir: Option<PathBuf>,

    /// Path to directory containing the text-generation ONNX models
    #[arg(long)]
    pub text_model_dir: Option<PathBuf>,

    /// Maximum accepted clip duration in seconds
    #[arg(long)]
    pub max_duration: Option<u32>,

    /// Number of threads for intra-op parallelism in ONNX Runtime
    #[arg(long)]
    pub threads: Option<u32>,

    /// Random seed for reproducible recommendation sampling
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Run in daemon mode (JSON-RPC over stdio)
    #[arg(long)]
    pub daemon: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Returns true if running in CLI mode (not daemon mode).
    pub fn is_cli_mode(&self) -> bool {
        !self.daemon && self.input.is_some()
    }

    /// Returns true if running in daemon mode.
    pub fn is_daemon_mode(&self) -> bool {
        self.daemon
    }

    /// Builds the daemon configuration: environment first, flags override.
    pub fn to_config(&self) -> DaemonConfig {
        let mut config = DaemonConfig::from_env();

        if let Some(ref path) = self.audio_model_dir {
            config.audio_model_path = Some(path.clone());
        }
        if let Some(ref path) = self.text_model_dir {
            config.text_model_path = Some(path.clone());
        }
        if let Some(max_duration) = self.max_duration {
            config.max_audio_duration_sec = max_duration;
        }
        if let Some(threads) = self.threads {
            config.threads = Some(threads);
        }
        if let Some(seed) = self.seed {
            config.generation.seed = Some(seed);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> Cli {
        Cli {
            input: None,
            audio_model_dir: None,
            text_model_dir: None,
            max_duration: None,
            threads: None,
            seed: None,
            daemon: false,
        }
    }

    #[test]
    fn cli_mode_detection() {
        let cli_mode = Cli {
            input: Some(PathBuf::from("clip.mp3")),
            ..base_cli()
        };
        assert!(cli_mode.is_cli_mode());
        assert!(!cli_mode.is_daemon_mode());

        let daemon_mode = Cli {
            daemon: true,
            ..base_cli()
        };
        assert!(!daemon_mode.is_cli_mode());
        assert!(daemon_mode.is_daemon_mode());

        let neither = base_cli();
        assert!(!neither.is_cli_mode());
        assert!(!neither.is_daemon_mode());
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli {
            audio_model_dir: Some(PathBuf::from("/opt/audio")),
            text_model_dir: Some(PathBuf::from("/opt/text")),
            max_duration: Some(60),
            threads: Some(2),
            seed: Some(42),
            ..base_cli()
        };

        let config = cli.to_config();
        assert_eq!(config.audio_model_path, Some(PathBuf::from("/opt/audio")));
        assert_eq!(config.text_model_path, Some(PathBuf::from("/opt/text")));
        assert_eq!(config.max_audio_duration_sec, 60);
        assert_eq!(config.threads, Some(2));
        assert_eq!(config.generation.seed, Some(42));
    }

    #[test]
    fn unset_flags_keep_generation_defaults() {
        let config = base_cli().to_config();
        assert_eq!(config.generation.seed, None);
        assert_eq!(config.generation.max_new_tokens, 200);
    }
}
