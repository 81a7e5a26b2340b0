// SocialSync - Cross-post a photo to Mastodon, Pixelfed, Bluesky and Threads
// Copyright (C) 2025 SocialSync Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Logging system for SocialSync
//!
//! Structured JSON logs go to a daily rolling file in the data directory;
//! a human readable layer goes to stderr.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Logger configuration
pub struct LoggerConfig {
    /// Log directory path
    pub log_dir: PathBuf,
    /// Log file prefix
    pub file_prefix: String,
    /// Maximum level recorded anywhere
    pub level: Level,
    /// Maximum level shown on the console
    pub console_level: Level,
    /// Whether to log to console
    pub console_output: bool,
    /// Whether to log to file
    pub file_output: bool,
    /// Log rotation strategy
    pub rotation: Rotation,
}

impl LoggerConfig {
    /// Defaults for a given log directory
    pub fn new(log_dir: &Path) -> Self {
        Self {
            log_dir: log_dir.to_path_buf(),
            file_prefix: "socialsync".to_string(),
            level: Level::INFO,
            console_level: Level::WARN,
            console_output: true,
            file_output: true,
            rotation: Rotation::DAILY,
        }
    }

    /// Show debug output on the console
    pub fn verbose(mut self, verbose: bool) -> Self {
        if verbose {
            self.level = Level::DEBUG;
            self.console_level = Level::DEBUG;
        }
        self
    }

    /// Default filter directives for our own targets
    fn directives(&self) -> String {
        [crate_target(), "api", "post"]
            .iter()
            .map(|target| format!("{}={}", target, self.level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Target prefix of every event emitted from this crate's modules
fn crate_target() -> &'static str {
    module_path!().split("::").next().unwrap_or(module_path!())
}

/// Main logger struct
pub struct Logger;

impl Logger {
    /// Initialize the logging system
    pub fn init_with_config(config: LoggerConfig) -> Result<()> {
        // Ensure log directory exists
        if config.file_output {
            std::fs::create_dir_all(&config.log_dir)?;
        }

        // RUST_LOG wins over our defaults
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(config.directives())?,
        };

        let file_layer = config.file_output.then(|| {
            let file_appender = RollingFileAppender::new(
                config.rotation.clone(),
                &config.log_dir,
                &config.file_prefix,
            );

            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE)
                .json()
        });

        let console_layer = config.console_output.then(|| {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(false)
                .with_filter(LevelFilter::from_level(config.console_level))
        });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(console_layer)
            .init();

        Ok(())
    }
}

/// Macro for logging API calls with timing
#[macro_export]
macro_rules! log_api_call {
    ($method:expr, $url:expr) => {
        tracing::info!(
            target: "api",
            method = $method,
            url = $url,
            "API call started"
        )
    };
    ($method:expr, $url:expr, $duration:expr) => {
        tracing::info!(
            target: "api",
            method = $method,
            url = $url,
            duration_ms = $duration,
            "API call completed"
        )
    };
}

/// Macro for logging per-account posting progress
#[macro_export]
macro_rules! log_post {
    (started, $key:expr) => {
        tracing::debug!(
            target: "post",
            account = $key,
            "Posting started"
        )
    };
    (posted, $key:expr, $url:expr) => {
        tracing::info!(
            target: "post",
            account = $key,
            url = $url,
            "Post published"
        )
    };
    (failed, $key:expr, $error:expr) => {
        tracing::warn!(
            target: "post",
            account = $key,
            error = $error,
            "Post failed"
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_both_levels() {
        let config = LoggerConfig::new(Path::new("/tmp/logs")).verbose(true);
        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.console_level, Level::DEBUG);

        let quiet = LoggerConfig::new(Path::new("/tmp/logs")).verbose(false);
        assert_eq!(quiet.console_level, Level::WARN);
    }

    #[test]
    fn directives_cover_our_targets() {
        let config = LoggerConfig::new(Path::new("/tmp/logs"));
        assert_eq!(crate_target(), "socialsync");
        assert_eq!(config.directives(), "socialsync=INFO,api=INFO,post=INFO");
        assert!(EnvFilter::try_new(config.directives()).is_ok());
    }

    #[test]
    fn directives_match_module_targets() {
        let target = module_path!().split("::").next().unwrap();
        let directives = LoggerConfig::new(Path::new("/tmp/logs")).directives();
        assert!(directives.split(',').any(|d| d.split('=').next() == Some(target)));
    }
}
