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

//! Cross-post dispatcher
//!
//! Runs one task per selected account and reports progress over an mpsc
//! channel, so whoever renders progress never waits on the network.

use anyhow::{bail, Result};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::api::{self, fit_caption, CaptionCheck, ClientOptions, OutgoingPost, PostError, Poster};
use crate::log_post;
use crate::models::{Compose, MediaFile, PostOutcome, PostProgress, PostReport, PostStage, StoredAccount};

/// Capacity of the progress channel
pub const PROGRESS_CHANNEL_SIZE: usize = 64;

/// Builds the poster for an account
pub type PosterFactory =
    Arc<dyn Fn(&StoredAccount) -> Result<Box<dyn Poster>, PostError> + Send + Sync>;

/// Sends a composed post to many accounts at once
pub struct Dispatcher {
    factory: PosterFactory,
    truncate: bool,
}

impl Dispatcher {
    /// Dispatcher talking to the real platform APIs
    pub fn new(options: ClientOptions, truncate: bool) -> Self {
        let factory: PosterFactory = Arc::new(move |account: &StoredAccount| api::poster_for(account, &options));
        Self::with_factory(factory, truncate)
    }

    /// Dispatcher with a custom poster factory
    pub fn with_factory(factory: PosterFactory, truncate: bool) -> Self {
        Self { factory, truncate }
    }

    /// Post `compose` to every account in `accounts`.
    ///
    /// A failure on one account never stops the others. Outcomes come back
    /// in the order the accounts were given.
    pub async fn run(
        &self,
        accounts: Vec<StoredAccount>,
        compose: Compose,
        progress: mpsc::Sender<PostProgress>,
    ) -> Result<PostReport> {
        if compose.is_empty() {
            bail!("Nothing to post: add a caption or an image.");
        }
        if accounts.is_empty() {
            bail!("No accounts selected: select at least one account to post to.");
        }

        let media = match &compose.image {
            Some(path) => Some(MediaFile::load(path).await?),
            None => None,
        };

        let batch_id = Uuid::new_v4();
        info!("Cross-posting batch {} to {} account(s)", batch_id, accounts.len());

        for account in &accounts {
            let _ = progress.send(PostProgress::new(&account.key(), PostStage::Waiting)).await;
        }

        let compose = Arc::new(compose);
        let handles: Vec<_> = accounts
            .iter()
            .cloned()
            .map(|account| {
                let factory = self.factory.clone();
                let compose = compose.clone();
                let media = media.clone();
                let progress = progress.clone();
                let truncate = self.truncate;
                tokio::spawn(async move {
                    post_one(account, compose, media, truncate, factory, progress).await
                })
            })
            .collect();

        let results = join_all(handles).await;

        let outcomes = accounts
            .iter()
            .zip(results)
            .map(|(account, result)| match result {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    error!("Posting task for {} aborted: {}", account.key(), join_err);
                    PostOutcome::failure(account.key(), account.platform, join_err.to_string())
                }
            })
            .collect();

        Ok(PostReport { batch_id, outcomes })
    }
}

async fn post_one(
    account: StoredAccount,
    compose: Arc<Compose>,
    media: Option<MediaFile>,
    truncate: bool,
    factory: PosterFactory,
    progress: mpsc::Sender<PostProgress>,
) -> PostOutcome {
    let key = account.key();
    let _ = progress.send(PostProgress::new(&key, PostStage::Uploading)).await;
    log_post!(started, key.as_str());

    let result = async {
        let text = fit_caption(&compose.text, account.platform, truncate)?;
        let poster = factory(&account)?;
        debug!("{} poster ready for {}", poster.platform(), key);
        let post = OutgoingPost {
            text,
            alt_text: compose.alt_text.clone(),
            media,
        };
        poster.publish(&post).await
    }
    .await;

    match result {
        Ok(url) => {
            log_post!(posted, key.as_str(), url.as_str());
            let _ = progress
                .send(PostProgress::new(&key, PostStage::Posted { url: url.clone() }))
                .await;
            PostOutcome::success(key, account.platform, url)
        }
        Err(e) => {
            let message = e.to_string();
            log_post!(failed, key.as_str(), message.as_str());
            let _ = progress
                .send(PostProgress::new(&key, PostStage::Failed { error: message.clone() }))
                .await;
            PostOutcome::failure(key, account.platform, message)
        }
    }
}

/// Caption length against each account's platform limit
pub fn check_captions(accounts: &[StoredAccount], text: &str) -> Vec<CaptionCheck> {
    accounts
        .iter()
        .map(|a| CaptionCheck::new(&a.key(), a.platform, text))
        .collect()
}
