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

//! Bluesky adapter speaking XRPC to the user's PDS

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, info};

use crate::log_api_call;
use crate::models::{MediaFile, Platform, StoredAccount};

use super::{check_status, truncate_chars, ClientOptions, OutgoingPost, PostError, Poster};

/// Collection posts are written to
const POST_COLLECTION: &str = "app.bsky.feed.post";
/// Embed type for image attachments
const IMAGES_EMBED: &str = "app.bsky.embed.images";
/// Public web front end used for post links
const WEB_URL: &str = "https://bsky.app";

/// Session returned by createSession
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Session {
    did: String,
    access_jwt: String,
    #[serde(default)]
    handle: Option<String>,
}

/// Bluesky API client
pub struct BlueskyClient {
    http: reqwest::Client,
    service_url: String,
    handle: String,
    app_password: String,
    options: ClientOptions,
}

impl BlueskyClient {
    /// Create a client for a stored Bluesky account
    pub fn from_account(account: &StoredAccount, options: &ClientOptions) -> Result<Self, PostError> {
        Ok(Self {
            http: options.http_client()?,
            service_url: account.base_url(),
            handle: account.username.clone(),
            app_password: account.token.clone(),
            options: options.clone(),
        })
    }

    fn xrpc(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.service_url, method)
    }

    /// Log in with the app password
    async fn create_session(&self) -> Result<Session, PostError> {
        let url = self.xrpc("com.atproto.server.createSession");
        log_api_call!("POST", url.as_str());

        let response = self
            .http
            .post(&url)
            .json(&json!({
                "identifier": self.handle,
                "password": self.app_password,
            }))
            .send()
            .await?;
        let session: Session = check_status(response).await?.json().await?;

        debug!("Bluesky session created for {}", session.did);
        Ok(session)
    }

    /// Upload the image as a blob, returning the blob reference
    async fn upload_blob(&self, session: &Session, media: &MediaFile) -> Result<Value, PostError> {
        let url = self.xrpc("com.atproto.repo.uploadBlob");
        log_api_call!("POST", url.as_str());
        let started = Instant::now();

        let response = self
            .http
            .post(&url)
            .bearer_auth(&session.access_jwt)
            .header(CONTENT_TYPE, media.mime.as_str())
            .body(media.bytes.to_vec())
            .timeout(self.options.upload_timeout)
            .send()
            .await?;
        let body: Value = check_status(response).await?.json().await?;

        log_api_call!("POST", url.as_str(), started.elapsed().as_millis() as u64);

        body.get("blob")
            .cloned()
            .ok_or_else(|| PostError::UnexpectedResponse("uploadBlob returned no blob".to_string()))
    }
}

/// Build an `app.bsky.feed.post` record
pub(crate) fn build_post_record(
    text: &str,
    image: Option<(Value, &str)>,
    langs: &[String],
    created_at: DateTime<Utc>,
) -> Value {
    let limit = Platform::Bluesky.info().char_limit;
    let mut record = json!({
        "$type": POST_COLLECTION,
        "text": truncate_chars(text, limit),
        "createdAt": created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        "langs": langs,
    });

    if let Some((blob, alt)) = image {
        record["embed"] = json!({
            "$type": IMAGES_EMBED,
            "images": [{
                "image": blob,
                "alt": alt,
            }],
        });
    }

    record
}

/// Record key of an AT-URI (its last path segment)
pub(crate) fn rkey_from_uri(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or_default()
}

/// Web link to a post
pub(crate) fn post_url(handle: &str, rkey: &str) -> String {
    format!("{}/profile/{}/post/{}", WEB_URL, handle, rkey)
}

#[async_trait]
impl Poster for BlueskyClient {
    fn platform(&self) -> Platform {
        Platform::Bluesky
    }

    async fn publish(&self, post: &OutgoingPost) -> Result<String, PostError> {
        let session = self.create_session().await?;

        let image = match &post.media {
            Some(media) => Some((self.upload_blob(&session, media).await?, post.alt_text.as_str())),
            None => None,
        };

        let record = build_post_record(&post.text, image, &self.options.langs, Utc::now());

        let url = self.xrpc("com.atproto.repo.createRecord");
        log_api_call!("POST", url.as_str());
        let started = Instant::now();

        let response = self
            .http
            .post(&url)
            .bearer_auth(&session.access_jwt)
            .json(&json!({
                "repo": session.did,
                "collection": POST_COLLECTION,
                "record": record,
            }))
            .send()
            .await?;
        let body: Value = check_status(response).await?.json().await?;

        log_api_call!("POST", url.as_str(), started.elapsed().as_millis() as u64);

        let uri = body.get("uri").and_then(|u| u.as_str()).unwrap_or_default();
        info!("Bluesky record created: {}", uri);
        Ok(post_url(&self.handle, rkey_from_uri(uri)))
    }

    async fn verify(&self) -> Result<String, PostError> {
        let session = self.create_session().await?;
        Ok(format!("@{}", session.handle.unwrap_or_else(|| self.handle.clone())))
    }
}
