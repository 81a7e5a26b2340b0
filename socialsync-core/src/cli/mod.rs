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

//! Command line interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::Platform;

mod commands;

pub use commands::run;

#[derive(Parser)]
#[command(name = "socialsync")]
#[command(about = "Cross-post a photo to Mastodon, Pixelfed, Bluesky and Threads")]
#[command(version)]
pub struct Cli {
    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Data directory (database and logs)
    #[arg(long, global = true, env = "SOCIALSYNC_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Post a caption and/or image to the selected accounts
    Post {
        /// Caption text
        #[arg(short, long, default_value = "")]
        text: String,

        /// Image to attach
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Alt text for the image
        #[arg(short, long, default_value = "")]
        alt: String,

        /// Account key ("platform:username") or platform name; repeatable. Defaults to all accounts
        #[arg(short = 'A', long = "account")]
        accounts: Vec<String>,

        /// Cut captions that exceed a platform's limit instead of failing
        #[arg(long)]
        truncate: bool,
    },

    /// Show caption length against each account's limit without posting
    Check {
        /// Caption text
        #[arg(short, long)]
        text: String,

        /// Account key or platform name; repeatable. Defaults to all accounts
        #[arg(short = 'A', long = "account")]
        accounts: Vec<String>,
    },

    /// Manage accounts
    Accounts {
        #[command(subcommand)]
        action: AccountsAction,
    },

    /// Show recent post results
    History {
        /// Number of entries to show
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },

    /// Read and change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Register SocialSync in the desktop application menu
    Install {
        /// Applications directory (default: ~/.local/share/applications)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Icon file for the menu entry
        #[arg(long)]
        icon: Option<PathBuf>,

        /// Skip running update-desktop-database
        #[arg(long)]
        no_refresh: bool,
    },

    /// Remove the desktop menu entry
    Uninstall {
        /// Applications directory (default: ~/.local/share/applications)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// List supported platforms
    Platforms,
}

#[derive(Subcommand)]
pub enum AccountsAction {
    /// List stored accounts
    List,

    /// Add an account, replacing one with the same platform and username
    Add {
        /// Platform (mastodon, pixelfed, bluesky, threads)
        platform: Platform,

        /// Username or handle
        #[arg(short, long)]
        username: String,

        /// Access token, app password or Graph API token
        #[arg(short, long, env = "SOCIALSYNC_TOKEN", hide_env_values = true)]
        token: String,

        /// Instance URL (Mastodon, Pixelfed) or service host (Bluesky)
        #[arg(long)]
        instance: Option<String>,

        /// Threads user id
        #[arg(long)]
        user_id: Option<String>,

        /// Public image URL Threads fetches images from
        #[arg(long)]
        image_url: Option<String>,
    },

    /// Remove an account
    Remove {
        /// Account key ("platform:username")
        key: String,
    },

    /// Check an account's credentials against its platform
    Verify {
        /// Account key ("platform:username")
        key: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print a setting
    Get { key: String },
    /// Change a setting
    Set { key: String, value: String },
    /// Reset a setting to its default
    Unset { key: String },
    /// Print all stored settings
    List,
}
