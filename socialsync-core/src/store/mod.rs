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

//! Local storage for accounts, post history and settings
//!
//! Uses SQLite through sqlx. Tokens live in their own column and are never
//! part of the serialized account blob.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::models::{HistoryEntry, PostOutcome, StoredAccount};

/// Persistent store backed by SQLite
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (or create) the database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        // Ensure the directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        info!("Opening database at {}", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .with_context(|| format!("Failed to open {}", db_path.display()))?;

        let store = Self { pool };
        store.init_schema().await?;

        Ok(store)
    }

    /// Open a private in-memory database
    pub async fn in_memory() -> Result<Self> {
        // Each connection to :memory: is its own database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.init_schema().await?;

        Ok(store)
    }

    /// Initialize the database schema
    async fn init_schema(&self) -> Result<()> {
        debug!("Initializing schema");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL UNIQUE,
                platform TEXT NOT NULL,
                username TEXT NOT NULL,
                token TEXT NOT NULL,
                data TEXT NOT NULL,
                added_at TEXT NOT NULL,
                last_used_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS post_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                batch_id TEXT NOT NULL,
                account_key TEXT NOT NULL,
                ok INTEGER NOT NULL,
                url TEXT,
                error TEXT,
                caption TEXT NOT NULL,
                posted_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_history_batch ON post_history(batch_id);

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("Schema initialized");

        Ok(())
    }

    // ===== ACCOUNTS =====

    /// Save an account, replacing any existing one with the same key in place
    pub async fn save_account(&self, account: &StoredAccount) -> Result<()> {
        let data = serde_json::to_string(account)?;

        sqlx::query(
            r#"
            INSERT INTO accounts (key, platform, username, token, data, added_at, last_used_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                token = excluded.token,
                data = excluded.data,
                last_used_at = excluded.last_used_at
            "#,
        )
        .bind(account.key())
        .bind(account.platform.key())
        .bind(&account.username)
        .bind(&account.token)
        .bind(&data)
        .bind(account.added_at.to_rfc3339())
        .bind(account.last_used_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        info!("Saved account {}", account.key());
        Ok(())
    }

    /// All accounts, in the order they were first added
    pub async fn get_accounts(&self) -> Result<Vec<StoredAccount>> {
        let rows: Vec<(String, String, String)> =
            sqlx::query_as("SELECT key, data, token FROM accounts ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await?;

        let accounts = rows
            .into_iter()
            .filter_map(|(key, data, token)| {
                let mut account: StoredAccount = match serde_json::from_str(&data) {
                    Ok(account) => account,
                    Err(e) => {
                        warn!("Skipping unreadable account {}: {}", key, e);
                        return None;
                    }
                };
                // Restore the token that was skipped during serialization
                account.token = token;
                Some(account)
            })
            .collect();

        Ok(accounts)
    }

    /// Get an account by key
    pub async fn get_account(&self, key: &str) -> Result<Option<StoredAccount>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT data, token FROM accounts WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((data, token)) => {
                let mut account: StoredAccount = serde_json::from_str(&data)?;
                account.token = token;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    /// Delete an account, returning whether it existed
    pub async fn delete_account(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("Deleted account {}", key);
        }
        Ok(deleted)
    }

    /// Record that an account was just posted to
    pub async fn touch_account(&self, key: &str) -> Result<()> {
        let Some(mut account) = self.get_account(key).await? else {
            return Ok(());
        };
        account.last_used_at = Utc::now();
        self.save_account(&account).await
    }

    // ===== POST HISTORY =====

    /// Append one outcome of a batch to the history
    pub async fn record_outcome(&self, batch_id: &str, outcome: &PostOutcome, caption: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO post_history (batch_id, account_key, ok, url, error, caption, posted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(batch_id)
        .bind(&outcome.key)
        .bind(outcome.ok)
        .bind(&outcome.url)
        .bind(&outcome.error)
        .bind(caption)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent history entries, newest first
    pub async fn recent_history(&self, limit: u32) -> Result<Vec<HistoryEntry>> {
        let rows: Vec<(String, String, bool, Option<String>, Option<String>, String, String)> =
            sqlx::query_as(
                r#"
                SELECT batch_id, account_key, ok, url, error, caption, posted_at
                FROM post_history
                ORDER BY id DESC
                LIMIT ?
                "#,
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let entries = rows
            .into_iter()
            .map(|(batch_id, account_key, ok, url, error, caption, posted_at)| HistoryEntry {
                batch_id,
                account_key,
                ok,
                url,
                error,
                caption,
                posted_at: DateTime::parse_from_rfc3339(&posted_at)
                    .map(|t| t.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
            .collect();

        Ok(entries)
    }

    // ===== SETTINGS =====

    /// Get a setting value
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM settings WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(v,)| v))
    }

    /// Set a setting value
    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        debug!("Set setting {} = {}", key, value);
        Ok(())
    }

    /// Delete a setting
    pub async fn delete_setting(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Get all settings as a map
    pub async fn get_all_settings(&self) -> Result<HashMap<String, String>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM settings")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountDraft, Platform};

    fn account(platform: Platform, username: &str, token: &str) -> StoredAccount {
        AccountDraft {
            username: username.to_string(),
            token: token.to_string(),
            instance: Some("https://example.social".to_string()),
            user_id: Some("42".to_string()),
            ..Default::default()
        }
        .into_account(platform)
        .unwrap()
    }

    #[tokio::test]
    async fn accounts_round_trip_with_token() {
        let store = Store::in_memory().await.unwrap();
        store.save_account(&account(Platform::Mastodon, "@a@example.social", "tok-a")).await.unwrap();
        store.save_account(&account(Platform::Bluesky, "b.bsky.social", "app-pw")).await.unwrap();

        let accounts = store.get_accounts().await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].key(), "mastodon:@a@example.social");
        assert_eq!(accounts[0].token, "tok-a");
        assert_eq!(accounts[1].platform, Platform::Bluesky);
        assert_eq!(accounts[1].token, "app-pw");
    }

    #[tokio::test]
    async fn same_platform_and_username_replaces_in_place() {
        let store = Store::in_memory().await.unwrap();
        store.save_account(&account(Platform::Pixelfed, "me", "old")).await.unwrap();
        store.save_account(&account(Platform::Threads, "me", "threads")).await.unwrap();
        store.save_account(&account(Platform::Pixelfed, "me", "new")).await.unwrap();

        let accounts = store.get_accounts().await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].key(), "pixelfed:me");
        assert_eq!(accounts[0].token, "new");
    }

    #[tokio::test]
    async fn delete_reports_missing_accounts() {
        let store = Store::in_memory().await.unwrap();
        store.save_account(&account(Platform::Pixelfed, "me", "t")).await.unwrap();

        assert!(store.delete_account("pixelfed:me").await.unwrap());
        assert!(!store.delete_account("pixelfed:me").await.unwrap());
        assert!(store.get_account("pixelfed:me").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn history_is_newest_first() {
        let store = Store::in_memory().await.unwrap();
        let ok = PostOutcome::success("mastodon:a".into(), Platform::Mastodon, "https://m/1".into());
        let failed = PostOutcome::failure("threads:b".into(), Platform::Threads, "HTTP 400".into());

        store.record_outcome("batch-1", &ok, "caption").await.unwrap();
        store.record_outcome("batch-1", &failed, "caption").await.unwrap();

        let history = store.recent_history(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].account_key, "threads:b");
        assert!(!history[0].ok);
        assert_eq!(history[0].error.as_deref(), Some("HTTP 400"));
        assert_eq!(history[1].url.as_deref(), Some("https://m/1"));

        assert_eq!(store.recent_history(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn settings_crud() {
        let store = Store::in_memory().await.unwrap();
        assert_eq!(store.get_setting("http.timeout_secs").await.unwrap(), None);

        store.set_setting("http.timeout_secs", "10").await.unwrap();
        store.set_setting("http.timeout_secs", "15").await.unwrap();
        assert_eq!(store.get_setting("http.timeout_secs").await.unwrap().as_deref(), Some("15"));

        store.set_setting("post.truncate", "true").await.unwrap();
        assert_eq!(store.get_all_settings().await.unwrap().len(), 2);

        store.delete_setting("post.truncate").await.unwrap();
        assert_eq!(store.get_all_settings().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unreadable_account_rows_are_skipped() {
        let store = Store::in_memory().await.unwrap();
        store.save_account(&account(Platform::Mastodon, "good", "t1")).await.unwrap();
        sqlx::query(
            "INSERT INTO accounts (key, platform, username, token, data, added_at, last_used_at)
             VALUES ('bluesky:broken', 'bluesky', 'broken', 't2', '{not json', '', '')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let accounts = store.get_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].key(), "mastodon:good");
    }
}
