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

//! Mastodon adapter built on megalodon
//!
//! Media goes up through reqwest from the bytes loaded for the batch, so
//! every platform sends the same image even if the file changes on disk.

use async_trait::async_trait;
use megalodon::{
    self,
    generator,
    megalodon::PostStatusInputOptions,
    megalodon::PostStatusOutput,
    Megalodon,
    SNS,
};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::log_api_call;
use crate::models::{MediaFile, Platform, StoredAccount};

use super::{
    check_status, json_id, media_form, normalize_url, ClientOptions, OutgoingPost, PostError, Poster,
    USER_AGENT,
};

/// Mastodon API client
pub struct MastodonClient {
    client: Arc<Box<dyn Megalodon + Send + Sync>>,
    http: reqwest::Client,
    instance_url: String,
    token: String,
    options: ClientOptions,
}

impl MastodonClient {
    /// Create a client from an existing access token
    pub fn from_token(instance_url: &str, access_token: &str, options: &ClientOptions) -> Result<Self, PostError> {
        let instance_url = normalize_url(instance_url);

        let client = generator(
            SNS::Mastodon,
            instance_url.clone(),
            Some(access_token.to_string()),
            Some(USER_AGENT.to_string()),
        )
        .map_err(api_error)?;

        Ok(Self {
            client: Arc::new(client),
            http: options.http_client()?,
            instance_url,
            token: access_token.to_string(),
            options: options.clone(),
        })
    }

    /// Create a client for a stored Mastodon account
    pub fn from_account(account: &StoredAccount, options: &ClientOptions) -> Result<Self, PostError> {
        let instance = account
            .instance
            .as_deref()
            .ok_or(PostError::MissingField("an instance URL"))?;
        Self::from_token(instance, &account.token, options)
    }

    /// Upload the image to /api/v2/media, returning the attachment id
    async fn upload_media(&self, media: &MediaFile, alt_text: &str) -> Result<String, PostError> {
        let url = format!("{}/api/v2/media", self.instance_url);
        log_api_call!("POST", url.as_str());
        let started = Instant::now();

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .multipart(media_form(media, alt_text)?)
            .timeout(self.options.upload_timeout)
            .send()
            .await?;
        // 202 means the attachment is still processing, the id is usable anyway
        let body: Value = check_status(response).await?.json().await?;

        log_api_call!("POST", url.as_str(), started.elapsed().as_millis() as u64);

        let id = json_id(&body)
            .ok_or_else(|| PostError::UnexpectedResponse("media upload returned no id".to_string()))?;
        info!("Media uploaded: {}", id);
        Ok(id)
    }
}

#[async_trait]
impl Poster for MastodonClient {
    fn platform(&self) -> Platform {
        Platform::Mastodon
    }

    async fn publish(&self, post: &OutgoingPost) -> Result<String, PostError> {
        let mut media_ids = Vec::new();
        if let Some(media) = &post.media {
            media_ids.push(self.upload_media(media, &post.alt_text).await?);
        }

        let options = PostStatusInputOptions {
            media_ids: if media_ids.is_empty() { None } else { Some(media_ids) },
            ..Default::default()
        };

        let url = format!("{}/api/v1/statuses", self.instance_url);
        log_api_call!("POST", url.as_str());
        let started = Instant::now();

        let response = with_timeout(
            self.options.timeout,
            self.client.post_status(post.text.clone(), Some(&options)),
        )
        .await?;

        log_api_call!("POST", url.as_str(), started.elapsed().as_millis() as u64);

        match &response.json {
            PostStatusOutput::Status(status) => {
                debug!("Created status {}", status.id);
                Ok(status.url.clone().unwrap_or_default())
            }
            PostStatusOutput::ScheduledStatus(_) => Err(PostError::UnexpectedResponse(
                "instance scheduled the status instead of publishing it".to_string(),
            )),
        }
    }

    async fn verify(&self) -> Result<String, PostError> {
        let response = with_timeout(self.options.timeout, self.client.verify_account_credentials()).await?;
        Ok(format!("@{}", response.json.acct))
    }
}

/// Run a megalodon call with a deadline
async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, PostError>
where
    F: Future<Output = Result<T, megalodon::error::Error>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(api_error),
        Err(_) => Err(PostError::Timeout(limit.as_secs())),
    }
}

fn api_error(err: megalodon::error::Error) -> PostError {
    PostError::Api {
        platform: Platform::Mastodon,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccountDraft;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Read one HTTP request, headers and body, from `stream`
    async fn read_request(stream: &mut tokio::net::TcpStream) -> Vec<u8> {
        let mut request = Vec::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                return request;
            }
            request.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&request).to_lowercase();
            let Some(header_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let body_len = request.len() - (header_end + 4);
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok());
            let complete = match content_length {
                Some(len) => body_len >= len,
                None => text.ends_with("0\r\n\r\n"),
            };
            if complete {
                return request;
            }
        }
    }

    #[test]
    fn requires_instance_on_account() {
        let mut account = AccountDraft {
            username: "@me@example.social".into(),
            token: "token".into(),
            instance: Some("example.social".into()),
            ..Default::default()
        }
        .into_account(Platform::Mastodon)
        .unwrap();
        account.instance = None;

        let err = MastodonClient::from_account(&account, &ClientOptions::default()).err().unwrap();
        assert!(matches!(err, PostError::MissingField(_)));
    }

    #[test]
    fn client_normalizes_instance() {
        let client = MastodonClient::from_token("example.social/", "token", &ClientOptions::default()).unwrap();
        assert_eq!(client.instance_url, "https://example.social");
        assert_eq!(client.platform(), Platform::Mastodon);
    }

    #[tokio::test]
    async fn timeout_is_reported_in_seconds() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), megalodon::error::Error>(())
        };
        let err = with_timeout(Duration::from_millis(10), slow).await.unwrap_err();
        assert!(matches!(err, PostError::Timeout(0)));
    }

    #[tokio::test]
    async fn upload_sends_loaded_bytes_to_v2_media() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;

            let body = r#"{"id":"77","type":"image","url":null}"#;
            let response = format!(
                "HTTP/1.1 202 Accepted\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n\
                 {}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.flush().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pier.png");
        std::fs::write(&path, b"\x89PNG-pier-pixels").unwrap();
        let media = MediaFile::load(&path).await.unwrap();
        // Later changes on disk must not reach the upload
        std::fs::remove_file(&path).unwrap();

        let client = MastodonClient::from_token(
            &format!("http://127.0.0.1:{port}"),
            "secret-token",
            &ClientOptions::default(),
        )
        .unwrap();
        let id = client.upload_media(&media, "Wooden pier at sunset").await.unwrap();
        assert_eq!(id, "77");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/v2/media "));
        assert!(request.to_lowercase().contains("authorization: bearer secret-token"));
        assert!(request.contains("name=\"description\""));
        assert!(request.contains("Wooden pier at sunset"));
        assert!(request.contains("PNG-pier-pixels"));
        assert!(request.contains("filename=\"pier.png\""));
    }
}
