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

//! Errors raised while talking to a platform

use thiserror::Error;

use crate::models::Platform;

/// Longest response body kept in an HTTP error
const MAX_ERROR_BODY: usize = 200;

/// Error from posting to, or verifying, a single account
#[derive(Debug, Error)]
pub enum PostError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{platform} API error: {message}")]
    Api { platform: Platform, message: String },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Account is missing {0}")]
    MissingField(&'static str),

    #[error("Caption is {len} characters, {platform} allows {limit}")]
    CaptionTooLong {
        platform: Platform,
        len: usize,
        limit: usize,
    },

    #[error("Threads requires a public image URL. Please host your image and add the URL in account settings.")]
    ThreadsNeedsPublicImage,

    #[error("{0}")]
    InvalidMedia(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl PostError {
    /// Build an HTTP error, shortening long response bodies
    pub fn http(status: u16, body: &str) -> Self {
        let body = body.trim();
        let body = if body.chars().count() > MAX_ERROR_BODY {
            let mut short: String = body.chars().take(MAX_ERROR_BODY).collect();
            short.push('…');
            short
        } else {
            body.to_string()
        };
        PostError::Http { status, body }
    }
}

/// Turn a non-2xx response into an error, passing successful ones through
pub async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PostError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PostError::http(status.as_u16(), &body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_body_is_shortened() {
        let err = PostError::http(422, &"e".repeat(1000));
        match err {
            PostError::Http { status, body } => {
                assert_eq!(status, 422);
                assert_eq!(body.chars().count(), MAX_ERROR_BODY + 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn caption_error_message() {
        let err = PostError::CaptionTooLong {
            platform: Platform::Bluesky,
            len: 301,
            limit: 300,
        };
        assert_eq!(err.to_string(), "Caption is 301 characters, Bluesky allows 300");
    }
}
