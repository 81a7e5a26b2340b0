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

//! Application configuration
//!
//! Paths come from the platform data directory (or `SOCIALSYNC_DATA_DIR`).
//! Tunables are stored in the settings table and layered on top of the
//! defaults at startup.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::api::ClientOptions;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "SOCIALSYNC_DATA_DIR";

/// Setting keys understood by [`AppConfig::apply_settings`]
pub mod keys {
    pub const HTTP_TIMEOUT_SECS: &str = "http.timeout_secs";
    pub const HTTP_UPLOAD_TIMEOUT_SECS: &str = "http.upload_timeout_secs";
    pub const POST_TRUNCATE: &str = "post.truncate";
    pub const BLUESKY_LANGS: &str = "bluesky.langs";

    pub const ALL: &[&str] = &[HTTP_TIMEOUT_SECS, HTTP_UPLOAD_TIMEOUT_SECS, POST_TRUNCATE, BLUESKY_LANGS];
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root of all SocialSync data
    pub data_dir: PathBuf,
    /// Network settings for the platform adapters
    pub client: ClientOptions,
    /// Cut over-long captions instead of failing the account
    pub truncate: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            client: ClientOptions::default(),
            truncate: false,
        }
    }
}

impl AppConfig {
    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        config
    }

    /// SQLite database path
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("socialsync.db")
    }

    /// Log directory
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    /// Layer stored settings over the current values. Bad values are
    /// logged and skipped.
    pub fn apply_settings(&mut self, settings: &HashMap<String, String>) {
        for (key, value) in settings {
            if let Err(e) = self.apply_setting(key, value) {
                warn!("Ignoring setting {}: {}", key, e);
            }
        }
    }

    /// Apply a single setting
    pub fn apply_setting(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            keys::HTTP_TIMEOUT_SECS => self.client.timeout = parse_secs(value)?,
            keys::HTTP_UPLOAD_TIMEOUT_SECS => self.client.upload_timeout = parse_secs(value)?,
            keys::POST_TRUNCATE => {
                self.truncate = value
                    .parse()
                    .with_context(|| format!("expected true or false, got {:?}", value))?
            }
            keys::BLUESKY_LANGS => {
                let langs: Vec<String> = value
                    .split(',')
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty())
                    .collect();
                if langs.is_empty() {
                    bail!("expected a comma separated list of language codes");
                }
                self.client.langs = langs;
            }
            _ => bail!("unknown setting (known: {})", keys::ALL.join(", ")),
        }
        Ok(())
    }
}

fn parse_secs(value: &str) -> Result<Duration> {
    let secs: u64 = value
        .parse()
        .with_context(|| format!("expected a number of seconds, got {:?}", value))?;
    if secs == 0 {
        bail!("timeout must be at least one second");
    }
    Ok(Duration::from_secs(secs))
}

/// Default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("SocialSync")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_live_under_data_dir() {
        let config = AppConfig {
            data_dir: PathBuf::from("/tmp/ss"),
            ..Default::default()
        };
        assert_eq!(config.db_path(), PathBuf::from("/tmp/ss/socialsync.db"));
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/ss/logs"));
    }

    #[test]
    fn applies_known_settings() {
        let mut config = AppConfig::default();
        let settings: HashMap<String, String> = [
            (keys::HTTP_TIMEOUT_SECS, "10"),
            (keys::HTTP_UPLOAD_TIMEOUT_SECS, "120"),
            (keys::POST_TRUNCATE, "true"),
            (keys::BLUESKY_LANGS, "en, de"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        config.apply_settings(&settings);
        assert_eq!(config.client.timeout, Duration::from_secs(10));
        assert_eq!(config.client.upload_timeout, Duration::from_secs(120));
        assert!(config.truncate);
        assert_eq!(config.client.langs, vec!["en".to_string(), "de".to_string()]);
    }

    #[test]
    fn rejects_bad_values_and_unknown_keys() {
        let mut config = AppConfig::default();
        assert!(config.apply_setting(keys::HTTP_TIMEOUT_SECS, "0").is_err());
        assert!(config.apply_setting(keys::HTTP_TIMEOUT_SECS, "soon").is_err());
        assert!(config.apply_setting(keys::POST_TRUNCATE, "maybe").is_err());
        assert!(config.apply_setting(keys::BLUESKY_LANGS, " , ").is_err());
        assert!(config.apply_setting("theme", "dark").is_err());

        // Failed settings leave defaults untouched
        assert_eq!(config.client.timeout, Duration::from_secs(30));
        assert!(!config.truncate);
    }
}
