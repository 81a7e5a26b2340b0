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

//! Progress events sent from posting tasks back to the front end

use serde::{Deserialize, Serialize};

/// Longest error text shown in a progress line
pub const PROGRESS_ERROR_WIDTH: usize = 60;

/// Stage a single account has reached
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum PostStage {
    /// Queued, no request sent yet
    Waiting,
    /// Uploading media or creating the post
    Uploading,
    /// Published at the given URL
    Posted { url: String },
    /// Gave up with the given error
    Failed { error: String },
}

/// A progress update for one account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostProgress {
    /// Account key ("platform:username")
    pub key: String,
    #[serde(flatten)]
    pub stage: PostStage,
}

impl PostProgress {
    pub fn new(key: &str, stage: PostStage) -> Self {
        Self {
            key: key.to_string(),
            stage,
        }
    }

    /// Whether this is the last event for the account
    pub fn is_final(&self) -> bool {
        matches!(self.stage, PostStage::Posted { .. } | PostStage::Failed { .. })
    }

    /// Short status text for a progress line
    pub fn status_line(&self) -> String {
        match &self.stage {
            PostStage::Waiting => "Waiting…".to_string(),
            PostStage::Uploading => "Uploading…".to_string(),
            PostStage::Posted { .. } => "✓ Posted!".to_string(),
            PostStage::Failed { error } => {
                format!("✗ {}", error.chars().take(PROGRESS_ERROR_WIDTH).collect::<String>())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_line_is_truncated() {
        let error = "x".repeat(200);
        let progress = PostProgress::new("mastodon:me", PostStage::Failed { error });
        assert!(progress.is_final());
        assert_eq!(progress.status_line().chars().count(), PROGRESS_ERROR_WIDTH + 2);
    }

    #[test]
    fn serializes_with_flat_stage_tag() {
        let progress = PostProgress::new(
            "bluesky:me",
            PostStage::Posted { url: "https://bsky.app/profile/me/post/1".into() },
        );
        let value = serde_json::to_value(&progress).unwrap();
        assert_eq!(value["key"], "bluesky:me");
        assert_eq!(value["stage"], "posted");
        assert_eq!(value["url"], "https://bsky.app/profile/me/post/1");
        assert!(!PostProgress::new("bluesky:me", PostStage::Uploading).is_final());
    }
}
