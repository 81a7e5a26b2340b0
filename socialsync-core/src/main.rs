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

//! SocialSync - cross-post a photo to several social platforms
//!
//! Composes one post (caption, image, alt text) and sends it to every
//! selected Mastodon, Pixelfed, Bluesky and Threads account.

mod api;
mod cli;
mod config;
mod desktop;
mod logger;
mod models;
mod poster;
mod store;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error};

use cli::Cli;
use config::AppConfig;
use logger::{Logger, LoggerConfig};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    // Initialize logging system
    Logger::init_with_config(LoggerConfig::new(&config.log_dir()).verbose(cli.verbose))?;

    debug!("SocialSync starting up...");
    debug!("Version: {}", env!("CARGO_PKG_VERSION"));

    match cli::run(cli.command, config).await {
        Ok(code) => Ok(code),
        Err(e) => {
            error!("{:#}", e);
            Err(e)
        }
    }
}
