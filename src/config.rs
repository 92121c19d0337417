//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// How finished timers are removed by clear-finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RemovalMode {
    /// Delete the timer from backend storage
    #[default]
    Delete,
    /// Ask the backend to soft-finish the timer
    Clear,
    /// Hide it on this client only
    Dismiss,
}

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "timer-sync")]
#[command(about = "Countdown timers reconciled against a server-held clock")]
#[command(version)]
pub struct Config {
    /// Port for the local control API
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Base URL of the timer backend
    #[arg(short, long, default_value = "http://127.0.0.1:8000")]
    pub backend_url: String,

    /// Use a process-local backend instead of the remote one
    #[arg(long)]
    pub in_memory: bool,

    /// Countdown tick interval in milliseconds
    #[arg(long, default_value = "1000")]
    pub tick_ms: u64,

    /// Full resync interval in seconds
    #[arg(long, default_value = "15")]
    pub resync_secs: u64,

    /// How clear-finished removes timers
    #[arg(long, value_enum, default_value_t = RemovalMode::Delete)]
    pub removal: RemovalMode,

    /// File remembering timers dismissed on this client
    #[arg(long)]
    pub dismissed_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["timer-sync"]).unwrap();
        assert_eq!(config.address(), "127.0.0.1:20554");
        assert_eq!(config.removal, RemovalMode::Delete);
        assert_eq!(config.resync_secs, 15);
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn removal_mode_from_flag() {
        let config =
            Config::try_parse_from(["timer-sync", "--removal", "dismiss", "--in-memory", "-v"])
                .unwrap();
        assert_eq!(config.removal, RemovalMode::Dismiss);
        assert!(config.in_memory);
        assert_eq!(config.log_level(), "debug");
    }
}
