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

//! Account model for the platforms a post can be sent to

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountField, Platform, DEFAULT_BLUESKY_SERVICE, DEFAULT_PIXELFED_INSTANCE};
use crate::api::normalize_url;

/// A stored account on one platform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredAccount {
    /// Platform this account lives on
    pub platform: Platform,

    /// Username or handle (e.g. "@you@mastodon.social", "you.bsky.social")
    pub username: String,

    /// Access token, app password or Graph API token
    #[serde(skip_serializing, default)]
    pub token: String,

    /// Instance URL for fediverse platforms, service host for Bluesky
    pub instance: Option<String>,

    /// Threads numeric user id
    pub user_id: Option<String>,

    /// Publicly reachable image URL Threads fetches the photo from
    pub image_url_override: Option<String>,

    /// When this account was added
    pub added_at: DateTime<Utc>,

    /// When this account was last posted to
    pub last_used_at: DateTime<Utc>,
}

impl StoredAccount {
    /// Identity key, unique per platform and username
    pub fn key(&self) -> String {
        account_key(self.platform, &self.username)
    }

    /// Base URL requests for this account go to
    pub fn base_url(&self) -> String {
        match (&self.instance, self.platform) {
            (Some(instance), _) => normalize_url(instance),
            (None, Platform::Bluesky) => DEFAULT_BLUESKY_SERVICE.to_string(),
            (None, _) => DEFAULT_PIXELFED_INSTANCE.to_string(),
        }
    }

    /// Single-line description for listings
    pub fn describe(&self) -> String {
        let info = self.platform.info();
        match &self.instance {
            Some(instance) => format!("{} {}  ·  {}  ·  {}", info.icon, self.username, info.label, instance),
            None => format!("{} {}  ·  {}", info.icon, self.username, info.label),
        }
    }
}

/// Build the identity key for a platform and username
pub fn account_key(platform: Platform, username: &str) -> String {
    format!("{}:{}", platform.key(), username)
}

/// Account details as entered by the user, before validation
#[derive(Debug, Clone, Default)]
pub struct AccountDraft {
    pub username: String,
    pub token: String,
    pub instance: Option<String>,
    pub user_id: Option<String>,
    pub image_url_override: Option<String>,
}

impl AccountDraft {
    /// Validate the draft for a platform and turn it into a stored account
    pub fn into_account(self, platform: Platform) -> Result<StoredAccount> {
        let mut username = self.username.trim().to_string();
        if platform == Platform::Bluesky {
            username = username.trim_start_matches('@').to_string();
        }
        let token = self.token.trim().to_string();

        if username.is_empty() {
            bail!("Username is required.");
        }
        if token.is_empty() {
            bail!("{} is required.", platform.info().auth.label());
        }

        let instance = non_empty(self.instance).map(|url| normalize_url(&url));
        let user_id = non_empty(self.user_id);
        let image_url_override = non_empty(self.image_url_override);

        for field in platform.required_fields() {
            let missing = match field {
                AccountField::Instance => instance.is_none(),
                AccountField::UserId => user_id.is_none(),
            };
            if missing {
                bail!("{} accounts need {}", platform, field_label(*field));
            }
        }

        let now = Utc::now();
        Ok(StoredAccount {
            platform,
            username,
            token,
            instance,
            user_id,
            image_url_override,
            added_at: now,
            last_used_at: now,
        })
    }
}

fn field_label(field: AccountField) -> &'static str {
    match field {
        AccountField::Instance => "an instance URL",
        AccountField::UserId => "a Threads user id",
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
