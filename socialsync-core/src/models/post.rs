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

//! Compose and result models for a cross-post

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use super::Platform;

/// A photo post as composed by the user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Compose {
    /// Caption text
    pub text: String,
    /// Path to the image to attach
    pub image: Option<PathBuf>,
    /// Alt text describing the image
    pub alt_text: String,
}

impl Compose {
    /// Build a compose, trimming the caption and alt text
    pub fn new(text: &str, image: Option<PathBuf>, alt_text: &str) -> Self {
        Self {
            text: text.trim().to_string(),
            image,
            alt_text: alt_text.trim().to_string(),
        }
    }

    /// Nothing to post: no caption and no image
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.image.is_none()
    }

    /// Caption length in characters
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Outcome of posting to one account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostOutcome {
    /// Account key ("platform:username")
    pub key: String,
    pub platform: Platform,
    pub ok: bool,
    /// Link to the published post
    pub url: Option<String>,
    pub error: Option<String>,
}

impl PostOutcome {
    pub fn success(key: String, platform: Platform, url: String) -> Self {
        Self {
            key,
            platform,
            ok: true,
            url: Some(url),
            error: None,
        }
    }

    pub fn failure(key: String, platform: Platform, error: String) -> Self {
        Self {
            key,
            platform,
            ok: false,
            url: None,
            error: Some(error),
        }
    }
}

/// Results of one cross-post batch, in account selection order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostReport {
    pub batch_id: Uuid,
    pub outcomes: Vec<PostOutcome>,
}

impl PostReport {
    pub fn ok_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.ok).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.ok_count()
    }

    /// Human readable summary line
    pub fn summary(&self) -> String {
        let ok = self.ok_count();
        let failed = self.failed_count();
        if failed == 0 {
            format!("Successfully posted to {} platform(s)!", ok)
        } else {
            format!("Posted to {} platform(s). {} failed.", ok, failed)
        }
    }
}

/// A post outcome as kept in the history table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub batch_id: String,
    pub account_key: String,
    pub ok: bool,
    pub url: Option<String>,
    pub error: Option<String>,
    pub caption: String,
    pub posted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_trims_and_detects_empty() {
        let compose = Compose::new("   ", None, " alt ");
        assert!(compose.is_empty());
        assert_eq!(compose.alt_text, "alt");

        let with_image = Compose::new("", Some(PathBuf::from("/tmp/a.jpg")), "");
        assert!(!with_image.is_empty());
    }

    #[test]
    fn char_count_is_not_byte_count() {
        let compose = Compose::new("héllo 🐘", None, "");
        assert_eq!(compose.char_count(), 7);
        assert!(compose.text.len() > 7);
    }

    #[test]
    fn report_summary() {
        let mut report = PostReport {
            batch_id: Uuid::new_v4(),
            outcomes: vec![
                PostOutcome::success("mastodon:a".into(), Platform::Mastodon, "https://m/1".into()),
                PostOutcome::success("bluesky:b".into(), Platform::Bluesky, "https://b/1".into()),
            ],
        };
        assert_eq!(report.summary(), "Successfully posted to 2 platform(s)!");

        report.outcomes.push(PostOutcome::failure(
            "threads:c".into(),
            Platform::Threads,
            "boom".into(),
        ));
        assert_eq!(report.ok_count(), 2);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.summary(), "Posted to 2 platform(s). 1 failed.");
    }
}
