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

//! Pixelfed adapter
//!
//! Pixelfed speaks the Mastodon client API but takes media on the v1
//! endpoint, so requests are built directly with reqwest.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Instant;
use tracing::info;

use crate::log_api_call;
use crate::models::{MediaFile, Platform, StoredAccount};

use super::{check_status, json_id, media_form, ClientOptions, OutgoingPost, PostError, Poster};

/// Pixelfed API client
pub struct PixelfedClient {
    http: reqwest::Client,
    instance_url: String,
    token: String,
    options: ClientOptions,
}

impl PixelfedClient {
    /// Create a client for a stored Pixelfed account
    pub fn from_account(account: &StoredAccount, options: &ClientOptions) -> Result<Self, PostError> {
        Ok(Self {
            http: options.http_client()?,
            instance_url: account.base_url(),
            token: account.token.clone(),
            options: options.clone(),
        })
    }

    /// Upload the image, returning the media id
    async fn upload_media(&self, media: &MediaFile, alt_text: &str) -> Result<String, PostError> {
        let url = format!("{}/api/v1/media", self.instance_url);
        let form = media_form(media, alt_text)?;

        log_api_call!("POST", url.as_str());
        let started = Instant::now();

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .multipart(form)
            .timeout(self.options.upload_timeout)
            .send()
            .await?;
        let body: Value = check_status(response).await?.json().await?;

        log_api_call!("POST", url.as_str(), started.elapsed().as_millis() as u64);

        let id = json_id(&body)
            .ok_or_else(|| PostError::UnexpectedResponse("media upload returned no id".to_string()))?;
        info!("Media uploaded: {}", id);
        Ok(id)
    }
}

/// Form fields for a new status
pub(crate) fn status_form(text: &str, media_id: Option<&str>) -> Vec<(&'static str, String)> {
    let mut fields = vec![("status", text.to_string())];
    if let Some(id) = media_id {
        fields.push(("media_ids[]", id.to_string()));
    }
    fields
}

#[async_trait]
impl Poster for PixelfedClient {
    fn platform(&self) -> Platform {
        Platform::Pixelfed
    }

    async fn publish(&self, post: &OutgoingPost) -> Result<String, PostError> {
        let media_id = match &post.media {
            Some(media) => Some(self.upload_media(media, &post.alt_text).await?),
            None => None,
        };

        let url = format!("{}/api/v1/statuses", self.instance_url);
        log_api_call!("POST", url.as_str());
        let started = Instant::now();

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .form(&status_form(&post.text, media_id.as_deref()))
            .send()
            .await?;
        let body: Value = check_status(response).await?.json().await?;

        log_api_call!("POST", url.as_str(), started.elapsed().as_millis() as u64);

        Ok(body
            .get("url")
            .and_then(|u| u.as_str())
            .unwrap_or_default()
            .to_string())
    }

    async fn verify(&self) -> Result<String, PostError> {
        let url = format!("{}/api/v1/accounts/verify_credentials", self.instance_url);
        log_api_call!("GET", url.as_str());

        let response = self.http.get(&url).bearer_auth(&self.token).send().await?;
        let body: Value = check_status(response).await?.json().await?;

        body.get("acct")
            .or_else(|| body.get("username"))
            .and_then(|v| v.as_str())
            .map(|acct| format!("@{}", acct))
            .ok_or_else(|| PostError::UnexpectedResponse("credentials response had no acct".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountDraft, DEFAULT_PIXELFED_INSTANCE};

    #[test]
    fn status_form_includes_media_only_when_uploaded() {
        assert_eq!(status_form("hello", None), vec![("status", "hello".to_string())]);
        assert_eq!(
            status_form("hello", Some("77")),
            vec![("status", "hello".to_string()), ("media_ids[]", "77".to_string())]
        );
    }

    #[test]
    fn falls_back_to_default_instance() {
        let account = AccountDraft {
            username: "me".into(),
            token: "token".into(),
            ..Default::default()
        }
        .into_account(Platform::Pixelfed)
        .unwrap();

        let client = PixelfedClient::from_account(&account, &ClientOptions::default()).unwrap();
        assert_eq!(client.instance_url, DEFAULT_PIXELFED_INSTANCE);
    }
}
