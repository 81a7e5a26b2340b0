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

//! Caption length checks against per-platform limits

use crate::models::Platform;

use super::PostError;

/// Cut a caption to at most `limit` characters
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Produce the caption that will be sent to `platform`.
///
/// Bluesky and Threads always cut to their limit. For the others an
/// over-long caption is an error unless `truncate` is set.
pub fn fit_caption(text: &str, platform: Platform, truncate: bool) -> Result<String, PostError> {
    let limit = platform.info().char_limit;
    let len = text.chars().count();

    if len <= limit {
        return Ok(text.to_string());
    }
    if truncate || platform.truncates_caption() {
        return Ok(truncate_chars(text, limit));
    }
    Err(PostError::CaptionTooLong { platform, len, limit })
}

/// Caption length report for one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionCheck {
    pub key: String,
    pub platform: Platform,
    pub len: usize,
    pub limit: usize,
}

impl CaptionCheck {
    pub fn new(key: &str, platform: Platform, text: &str) -> Self {
        Self {
            key: key.to_string(),
            platform,
            len: text.chars().count(),
            limit: platform.info().char_limit,
        }
    }

    pub fn fits(&self) -> bool {
        self.len <= self.limit
    }

    /// Characters over the limit, zero when it fits
    pub fn overflow(&self) -> usize {
        self.len.saturating_sub(self.limit)
    }
}
