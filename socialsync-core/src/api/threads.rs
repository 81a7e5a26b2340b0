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

//! Threads adapter using the Graph API two-step publish flow

use async_trait::async_trait;
use serde_json::Value;
use std::time::Instant;
use tracing::info;

use crate::log_api_call;
use crate::models::{Platform, StoredAccount};

use super::{check_status, json_id, truncate_chars, ClientOptions, OutgoingPost, PostError, Poster};

/// Graph API base URL
const GRAPH_URL: &str = "https://graph.threads.net/v1.0";
/// Public web front end used for post links
const WEB_URL: &str = "https://www.threads.net";

/// Threads API client
pub struct ThreadsClient {
    http: reqwest::Client,
    user_id: String,
    token: String,
    image_url: Option<String>,
}

impl ThreadsClient {
    /// Create a client for a stored Threads account
    pub fn from_account(account: &StoredAccount, options: &ClientOptions) -> Result<Self, PostError> {
        let user_id = account
            .user_id
            .clone()
            .ok_or(PostError::MissingField("a Threads user id"))?;

        Ok(Self {
            http: options.http_client()?,
            user_id,
            token: account.token.clone(),
            image_url: account.image_url_override.clone(),
        })
    }

    async fn post_form(&self, url: &str, form: &[(&'static str, String)]) -> Result<String, PostError> {
        log_api_call!("POST", url);
        let started = Instant::now();

        let response = self.http.post(url).form(form).send().await?;
        let body: Value = check_status(response).await?.json().await?;

        log_api_call!("POST", url, started.elapsed().as_millis() as u64);

        json_id(&body).ok_or_else(|| PostError::UnexpectedResponse(format!("{} returned no id", url)))
    }
}

/// Form fields for the media container.
///
/// Threads fetches images itself, so a post with an image needs the
/// account's public image URL.
pub(crate) fn container_form(
    text: &str,
    has_image: bool,
    image_url: Option<&str>,
    token: &str,
) -> Result<Vec<(&'static str, String)>, PostError> {
    let limit = Platform::Threads.info().char_limit;
    let mut form = vec![
        ("media_type", if has_image { "IMAGE" } else { "TEXT" }.to_string()),
        ("text", truncate_chars(text, limit)),
        ("access_token", token.to_string()),
    ];

    if has_image {
        let url = image_url.ok_or(PostError::ThreadsNeedsPublicImage)?;
        form.push(("image_url", url.to_string()));
    }

    Ok(form)
}

/// Web link to a published post
pub(crate) fn post_url(post_id: &str) -> String {
    format!("{}/t/{}", WEB_URL, post_id)
}

#[async_trait]
impl Poster for ThreadsClient {
    fn platform(&self) -> Platform {
        Platform::Threads
    }

    async fn publish(&self, post: &OutgoingPost) -> Result<String, PostError> {
        let form = container_form(
            &post.text,
            post.media.is_some(),
            self.image_url.as_deref(),
            &self.token,
        )?;

        let container_url = format!("{}/{}/threads", GRAPH_URL, self.user_id);
        let creation_id = self.post_form(&container_url, &form).await?;

        let publish_url = format!("{}/{}/threads_publish", GRAPH_URL, self.user_id);
        let post_id = self
            .post_form(
                &publish_url,
                &[("creation_id", creation_id), ("access_token", self.token.clone())],
            )
            .await?;

        info!("Threads post published: {}", post_id);
        Ok(post_url(&post_id))
    }

    async fn verify(&self) -> Result<String, PostError> {
        let url = format!(
            "{}/me?fields=id,username&access_token={}",
            GRAPH_URL,
            urlencoding::encode(&self.token)
        );
        log_api_call!("GET", "https://graph.threads.net/v1.0/me");

        let response = self.http.get(&url).send().await?;
        let body: Value = check_status(response).await?.json().await?;

        body.get("username")
            .and_then(|v| v.as_str())
            .map(|u| format!("@{}", u))
            .ok_or_else(|| PostError::UnexpectedResponse("profile response had no username".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccountDraft;

    #[test]
    fn text_container() {
        let form = container_form("just words", false, None, "tok").unwrap();
        assert_eq!(
            form,
            vec![
                ("media_type", "TEXT".to_string()),
                ("text", "just words".to_string()),
                ("access_token", "tok".to_string()),
            ]
        );
    }

    #[test]
    fn image_container_needs_public_url() {
        let err = container_form("pic", true, None, "tok").unwrap_err();
        assert!(matches!(err, PostError::ThreadsNeedsPublicImage));

        let form = container_form("pic", true, Some("https://cdn.example/pic.jpg"), "tok").unwrap();
        assert_eq!(form[0], ("media_type", "IMAGE".to_string()));
        assert!(form.contains(&("image_url", "https://cdn.example/pic.jpg".to_string())));
    }

    #[test]
    fn container_text_is_cut_to_limit() {
        let form = container_form(&"t".repeat(900), false, None, "tok").unwrap();
        assert_eq!(form[1].1.chars().count(), 500);
    }

    #[test]
    fn builds_post_url() {
        assert_eq!(post_url("17890"), "https://www.threads.net/t/17890");
    }

    #[test]
    fn from_account_requires_user_id() {
        let mut account = AccountDraft {
            username: "me".into(),
            token: "tok".into(),
            user_id: Some("123".into()),
            ..Default::default()
        }
        .into_account(Platform::Threads)
        .unwrap();
        assert!(ThreadsClient::from_account(&account, &ClientOptions::default()).is_ok());

        account.user_id = None;
        let err = ThreadsClient::from_account(&account, &ClientOptions::default()).err().unwrap();
        assert!(matches!(err, PostError::MissingField(_)));
    }
}
