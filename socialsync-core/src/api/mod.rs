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

//! Platform API adapters
//!
//! Every platform implements [`Poster`]. The dispatcher only ever sees the
//! trait object built by [`poster_for`].

mod bluesky;
mod caption;
mod error;
mod mastodon;
mod pixelfed;
mod threads;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;

use crate::models::{MediaFile, Platform, StoredAccount};

pub use bluesky::BlueskyClient;
pub use caption::{fit_caption, truncate_chars, CaptionCheck};
pub use error::{check_status, PostError};
pub use mastodon::MastodonClient;
pub use pixelfed::PixelfedClient;
pub use threads::ThreadsClient;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("SocialSync/", env!("CARGO_PKG_VERSION"));

/// Network settings shared by all adapters
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Timeout for regular API calls
    pub timeout: Duration,
    /// Timeout for media uploads
    pub upload_timeout: Duration,
    /// Languages tagged on Bluesky posts
    pub langs: Vec<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(60),
            langs: vec!["en".to_string()],
        }
    }
}

impl ClientOptions {
    /// Build a reqwest client with these settings
    pub(crate) fn http_client(&self) -> Result<reqwest::Client, PostError> {
        Ok(reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .build()?)
    }
}

/// A post ready to send: caption already fitted to the platform
#[derive(Debug, Clone)]
pub struct OutgoingPost {
    pub text: String,
    pub alt_text: String,
    pub media: Option<MediaFile>,
}

/// An authenticated connection to one account
#[async_trait]
pub trait Poster: Send + Sync {
    /// Platform served by this poster
    fn platform(&self) -> Platform;

    /// Publish the post, returning its public URL
    async fn publish(&self, post: &OutgoingPost) -> Result<String, PostError>;

    /// Check the credentials, returning the handle they belong to
    async fn verify(&self) -> Result<String, PostError>;
}

/// Build the poster for a stored account
pub fn poster_for(account: &StoredAccount, options: &ClientOptions) -> Result<Box<dyn Poster>, PostError> {
    let poster: Box<dyn Poster> = match account.platform {
        Platform::Mastodon => Box::new(MastodonClient::from_account(account, options)?),
        Platform::Pixelfed => Box::new(PixelfedClient::from_account(account, options)?),
        Platform::Bluesky => Box::new(BlueskyClient::from_account(account, options)?),
        Platform::Threads => Box::new(ThreadsClient::from_account(account, options)?),
    };
    Ok(poster)
}

/// Normalize an instance URL
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    let url = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    };

    // Remove trailing slash
    url.trim_end_matches('/').to_string()
}

/// Multipart body for a media upload built from the bytes already in memory
pub(crate) fn media_form(media: &MediaFile, alt_text: &str) -> Result<Form, PostError> {
    let part = Part::bytes(media.bytes.to_vec())
        .file_name(media.file_name.clone())
        .mime_str(&media.mime)?;
    Ok(Form::new()
        .part("file", part)
        .text("description", alt_text.to_string()))
}

/// Read an `id` field that may be a JSON string or number
pub(crate) fn json_id(value: &Value) -> Option<String> {
    match value.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
