//! CLI argument definitions for the newslens binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use newslens_core::config::NewslensConfig;

/// newslens - semantic search over the current top news stories.
#[derive(Parser, Debug)]
#[command(name = "newslens", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Directory holding the document store.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Serve searches without running the ingestion loop.
    #[arg(long = "no-ingest")]
    pub no_ingest: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Set a user's request counter back to zero and exit.
    ResetLimit {
        /// The user whose quota is restored.
        user_id: String,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > NEWSLENS_CONFIG env var > ./newslens.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("NEWSLENS_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("newslens.toml")
    }

    /// Overlay flags onto a loaded configuration.
    pub fn apply_to(&self, config: &mut NewslensConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref dir) = self.data_dir {
            config.storage.persist_directory = dir.to_string_lossy().to_string();
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if self.no_ingest {
            config.ingest.enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = CliArgs::try_parse_from([
            "newslens",
            "--port",
            "8080",
            "--data-dir",
            "/tmp/store",
            "--log-level",
            "debug",
            "--no-ingest",
        ])
        .unwrap();

        let mut config = NewslensConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.persist_directory, "/tmp/store");
        assert_eq!(config.general.log_level, "debug");
        assert!(!config.ingest.enabled);
        assert!(args.command.is_none());
    }

    #[test]
    fn test_no_flags_leave_config_alone() {
        let args = CliArgs::try_parse_from(["newslens"]).unwrap();
        let mut config = NewslensConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config.server.port, 5000);
        assert!(config.ingest.enabled);
    }

    #[test]
    fn test_reset_limit_subcommand() {
        let args = CliArgs::try_parse_from(["newslens", "reset-limit", "alice"]).unwrap();
        assert_eq!(
            args.command,
            Some(Command::ResetLimit {
                user_id: "alice".to_string()
            })
        );
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let args = CliArgs::try_parse_from(["newslens", "-c", "/etc/newslens.toml"]).unwrap();
        assert_eq!(args.resolve_config_path(), PathBuf::from("/etc/newslens.toml"));
    }
}
