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

//! Supported platforms and their static configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default Pixelfed instance used when an account leaves the URL blank
pub const DEFAULT_PIXELFED_INSTANCE: &str = "https://pixelfed.social";

/// Default Bluesky service host
pub const DEFAULT_BLUESKY_SERVICE: &str = "https://bsky.social";

/// A social platform SocialSync can post to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Mastodon,
    Pixelfed,
    Bluesky,
    Threads,
}

/// How an account on a platform authenticates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    /// OAuth bearer access token pasted from the instance settings
    AccessToken,
    /// Bluesky app password
    AppPassword,
    /// Meta Graph API long-lived token
    GraphApiToken,
}

impl AuthKind {
    /// Label shown when prompting for the credential
    pub fn label(&self) -> &'static str {
        match self {
            AuthKind::AccessToken => "Access Token",
            AuthKind::AppPassword => "App Password",
            AuthKind::GraphApiToken => "Graph API Token",
        }
    }
}

/// An account field a platform needs besides the username and token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountField {
    Instance,
    UserId,
}

/// Static per-platform data
#[derive(Debug, Clone, Copy)]
pub struct PlatformInfo {
    pub label: &'static str,
    pub icon: &'static str,
    pub char_limit: usize,
    pub auth: AuthKind,
    /// Where the credential is generated, shown as a hint
    pub token_hint: &'static str,
}

impl Platform {
    /// Every supported platform, in display order
    pub const ALL: [Platform; 4] = [
        Platform::Mastodon,
        Platform::Pixelfed,
        Platform::Bluesky,
        Platform::Threads,
    ];

    /// Static configuration for this platform
    pub fn info(&self) -> PlatformInfo {
        match self {
            Platform::Mastodon => PlatformInfo {
                label: "Mastodon",
                icon: "🐘",
                char_limit: 500,
                auth: AuthKind::AccessToken,
                token_hint: "Settings → Development → New Application → read+write+follow+push",
            },
            Platform::Pixelfed => PlatformInfo {
                label: "Pixelfed",
                icon: "📸",
                char_limit: 2200,
                auth: AuthKind::AccessToken,
                token_hint: "Settings → Applications → New Application",
            },
            Platform::Bluesky => PlatformInfo {
                label: "Bluesky",
                icon: "🦋",
                char_limit: 300,
                auth: AuthKind::AppPassword,
                token_hint: "Settings → Privacy and Security → App Passwords",
            },
            Platform::Threads => PlatformInfo {
                label: "Threads",
                icon: "@",
                char_limit: 500,
                auth: AuthKind::GraphApiToken,
                token_hint: "Use the Meta Graph API to get a long-lived token",
            },
        }
    }

    /// Stable key used in account identifiers and the database
    pub fn key(&self) -> &'static str {
        match self {
            Platform::Mastodon => "mastodon",
            Platform::Pixelfed => "pixelfed",
            Platform::Bluesky => "bluesky",
            Platform::Threads => "threads",
        }
    }

    /// Fields an account on this platform must carry, beyond username and token
    pub fn required_fields(&self) -> &'static [AccountField] {
        match self {
            Platform::Mastodon => &[AccountField::Instance],
            Platform::Pixelfed => &[],
            Platform::Bluesky => &[],
            Platform::Threads => &[AccountField::UserId],
        }
    }

    /// Whether the platform always cuts captions to its limit before sending
    pub fn truncates_caption(&self) -> bool {
        matches!(self, Platform::Bluesky | Platform::Threads)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().label)
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Platform::ALL
            .into_iter()
            .find(|p| p.key() == needle)
            .ok_or_else(|| format!("Unknown platform: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caption_limits_match_platform_table() {
        assert_eq!(Platform::Mastodon.info().char_limit, 500);
        assert_eq!(Platform::Pixelfed.info().char_limit, 2200);
        assert_eq!(Platform::Bluesky.info().char_limit, 300);
        assert_eq!(Platform::Threads.info().char_limit, 500);
    }

    #[test]
    fn auth_kinds_match_platform_table() {
        assert_eq!(Platform::Mastodon.info().auth, AuthKind::AccessToken);
        assert_eq!(Platform::Pixelfed.info().auth, AuthKind::AccessToken);
        assert_eq!(Platform::Bluesky.info().auth, AuthKind::AppPassword);
        assert_eq!(Platform::Threads.info().auth, AuthKind::GraphApiToken);
    }

    #[test]
    fn parses_keys_case_insensitively() {
        assert_eq!("Bluesky".parse::<Platform>(), Ok(Platform::Bluesky));
        assert_eq!(" threads ".parse::<Platform>(), Ok(Platform::Threads));
        assert!("myspace".parse::<Platform>().is_err());
    }

    #[test]
    fn serde_uses_platform_key() {
        let json = serde_json::to_string(&Platform::Pixelfed).unwrap();
        assert_eq!(json, "\"pixelfed\"");
        for platform in Platform::ALL {
            assert_eq!(format!("\"{}\"", platform.key()), serde_json::to_string(&platform).unwrap());
        }
    }
}
