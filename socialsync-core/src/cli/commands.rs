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

//! Command handlers

use anyhow::{bail, Context, Result};
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::{self, PostError};
use crate::config::AppConfig;
use crate::desktop::{self, InstallOptions};
use crate::models::{AccountDraft, Compose, Platform, PostProgress, PostReport, StoredAccount};
use crate::poster::{check_captions, Dispatcher, PROGRESS_CHANNEL_SIZE};
use crate::store::Store;

use super::{AccountsAction, Commands, ConfigAction};

/// Run a parsed command
pub async fn run(command: Commands, config: AppConfig) -> Result<ExitCode> {
    match command {
        // These never touch the database
        Commands::Install { dir, icon, no_refresh } => {
            let path = desktop::install(&InstallOptions {
                dir,
                icon,
                exe: None,
                refresh_database: !no_refresh,
            })?;
            println!("Desktop entry installed at {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Uninstall { dir } => {
            if desktop::uninstall(dir.as_deref())? {
                println!("Desktop entry removed");
            } else {
                println!("No desktop entry installed");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Platforms => {
            print_platforms();
            Ok(ExitCode::SUCCESS)
        }
        Commands::Post { text, image, alt, accounts, truncate } => {
            let (store, config) = open_store(config).await?;
            let selected = select_accounts(store.get_accounts().await?, &accounts)?;
            let compose = Compose::new(&text, image, &alt);
            let dispatcher = Dispatcher::new(config.client.clone(), truncate || config.truncate);
            let report = post(&store, dispatcher, selected, compose).await?;
            Ok(exit_status(&report))
        }
        Commands::Check { text, accounts } => {
            let (store, _) = open_store(config).await?;
            let selected = select_accounts(store.get_accounts().await?, &accounts)?;
            let compose = Compose::new(&text, None, "");
            let mut all_fit = true;
            for check in check_captions(&selected, &compose.text) {
                let info = check.platform.info();
                let verdict = if check.fits() {
                    "ok".to_string()
                } else if check.platform.truncates_caption() {
                    format!("will be cut by {}", check.overflow())
                } else {
                    all_fit = false;
                    format!("over by {}", check.overflow())
                };
                println!("{} {:<40} {:>5} / {:<5} {}", info.icon, check.key, check.len, check.limit, verdict);
            }
            Ok(if all_fit { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Commands::Accounts { action } => {
            let (store, config) = open_store(config).await?;
            accounts(&store, &config, action).await
        }
        Commands::History { limit } => {
            let (store, _) = open_store(config).await?;
            let entries = store.recent_history(limit).await?;
            if entries.is_empty() {
                println!("No posts yet.");
            }
            for entry in entries {
                let status = if entry.ok { "✓" } else { "✗" };
                let detail = entry.url.or(entry.error).unwrap_or_default();
                println!(
                    "{} {} {:<40} {}",
                    entry.posted_at.format("%Y-%m-%d %H:%M"),
                    status,
                    entry.account_key,
                    detail
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { action } => {
            let (store, _) = open_store(config).await?;
            settings(&store, action).await
        }
    }
}

/// Open the database and layer the stored settings over `config`
async fn open_store(mut config: AppConfig) -> Result<(Store, AppConfig)> {
    let store = Store::open(&config.db_path()).await?;
    config.apply_settings(&store.get_all_settings().await?);
    Ok((store, config))
}

/// Non-zero when any account failed
fn exit_status(report: &PostReport) -> ExitCode {
    if report.failed_count() == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Pick the accounts named on the command line, in stored order.
///
/// An empty selection means every account. A bare platform name selects all
/// accounts on that platform.
pub(crate) fn select_accounts(all: Vec<StoredAccount>, wanted: &[String]) -> Result<Vec<StoredAccount>> {
    if wanted.is_empty() {
        return Ok(all);
    }

    for name in wanted {
        let known = all.iter().any(|a| matches_selector(a, name));
        if !known {
            bail!("No account matches {:?}. Run `socialsync accounts list`.", name);
        }
    }

    Ok(all
        .into_iter()
        .filter(|a| wanted.iter().any(|name| matches_selector(a, name)))
        .collect())
}

fn matches_selector(account: &StoredAccount, selector: &str) -> bool {
    if selector.contains(':') {
        account.key() == selector
    } else {
        selector.parse::<Platform>().map(|p| p == account.platform).unwrap_or(false)
    }
}

/// Run a batch, print its progress and record every outcome
async fn post(
    store: &Store,
    dispatcher: Dispatcher,
    selected: Vec<StoredAccount>,
    compose: Compose,
) -> Result<PostReport> {
    let caption = compose.text.clone();
    info!(
        "Cross-posting a {} character caption{} to {} account(s)",
        compose.char_count(),
        if compose.image.is_some() { " with an image" } else { "" },
        selected.len()
    );
    let (tx, mut rx) = mpsc::channel::<PostProgress>(PROGRESS_CHANNEL_SIZE);

    let task = tokio::spawn(async move { dispatcher.run(selected, compose, tx).await });

    while let Some(event) = rx.recv().await {
        println!("  {:<40} {}", event.key, event.status_line());
    }

    let report: PostReport = task.await.context("Posting task panicked")??;

    for outcome in &report.outcomes {
        if let Err(e) = store.record_outcome(&report.batch_id.to_string(), outcome, &caption).await {
            warn!("Could not record history for {}: {}", outcome.key, e);
        }
        if outcome.ok {
            store.touch_account(&outcome.key).await?;
        }
    }

    println!();
    for outcome in report.outcomes.iter().filter(|o| o.ok) {
        let url = outcome.url.as_deref().filter(|u| !u.is_empty()).unwrap_or("(no link returned)");
        println!("{} {}", outcome.platform.info().icon, url);
    }
    println!("{}", report.summary());
    info!("Batch {}: {}", report.batch_id, report.summary());

    Ok(report)
}

async fn accounts(store: &Store, config: &AppConfig, action: AccountsAction) -> Result<ExitCode> {
    match action {
        AccountsAction::List => {
            let accounts = store.get_accounts().await?;
            if accounts.is_empty() {
                println!("No accounts yet. Add one with `socialsync accounts add`.");
            }
            for account in accounts {
                println!("{:<40} {}", account.key(), account.describe());
            }
        }
        AccountsAction::Add { platform, username, token, instance, user_id, image_url } => {
            let account = AccountDraft {
                username,
                token,
                instance,
                user_id,
                image_url_override: image_url,
            }
            .into_account(platform)?;
            store.save_account(&account).await?;
            println!("Saved {}", account.key());
            println!("{}: {}", platform.info().auth.label(), platform.info().token_hint);
        }
        AccountsAction::Remove { key } => {
            if !store.delete_account(&key).await? {
                bail!("No account {}", key);
            }
            println!("Removed {}", key);
        }
        AccountsAction::Verify { key } => {
            let account = store
                .get_account(&key)
                .await?
                .with_context(|| format!("No account {}", key))?;
            let poster = api::poster_for(&account, &config.client)?;
            match poster.verify().await {
                Ok(handle) => println!("✓ {} authenticates as {}", key, handle),
                Err(e) => {
                    print_verify_error(&key, &e);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_verify_error(key: &str, error: &PostError) {
    warn!("Verification failed for {}: {}", key, error);
    println!("✗ {}: {}", key, error);
}

async fn settings(store: &Store, action: ConfigAction) -> Result<ExitCode> {
    match action {
        ConfigAction::Get { key } => match store.get_setting(&key).await? {
            Some(value) => println!("{}", value),
            None => println!("{} is not set", key),
        },
        ConfigAction::Set { key, value } => {
            // Validate against a scratch config before storing
            AppConfig::default()
                .apply_setting(&key, &value)
                .with_context(|| format!("Invalid value for {}", key))?;
            store.set_setting(&key, value.trim()).await?;
            println!("{} = {}", key, value.trim());
        }
        ConfigAction::Unset { key } => {
            store.delete_setting(&key).await?;
            println!("{} reset to default", key);
        }
        ConfigAction::List => {
            let mut settings: Vec<_> = store.get_all_settings().await?.into_iter().collect();
            settings.sort();
            for (key, value) in settings {
                println!("{} = {}", key, value);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_platforms() {
    for platform in Platform::ALL {
        let info = platform.info();
        println!(
            "{} {:<10} {:<16} limit {:>5}  {}",
            info.icon,
            info.label,
            info.auth.label(),
            info.char_limit,
            info.token_hint
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{OutgoingPost, Poster};
    use crate::poster::PosterFactory;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    struct StubPoster {
        platform: Platform,
        fails: bool,
    }

    #[async_trait]
    impl Poster for StubPoster {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn publish(&self, _post: &OutgoingPost) -> Result<String, PostError> {
            if self.fails {
                Err(PostError::http(401, "bad token"))
            } else {
                Ok(format!("https://{}.example/1", self.platform.key()))
            }
        }

        async fn verify(&self) -> Result<String, PostError> {
            Ok("@stub".to_string())
        }
    }

    fn account(platform: Platform, username: &str) -> StoredAccount {
        AccountDraft {
            username: username.to_string(),
            token: "t".to_string(),
            instance: Some("https://example.social".to_string()),
            user_id: Some("1".to_string()),
            ..Default::default()
        }
        .into_account(platform)
        .unwrap()
    }

    fn stored() -> Vec<StoredAccount> {
        vec![
            account(Platform::Mastodon, "a"),
            account(Platform::Bluesky, "b"),
            account(Platform::Bluesky, "c"),
            account(Platform::Threads, "d"),
        ]
    }

    fn keys(accounts: &[StoredAccount]) -> Vec<String> {
        accounts.iter().map(|a| a.key()).collect()
    }

    #[test]
    fn empty_selection_means_all() {
        assert_eq!(select_accounts(stored(), &[]).unwrap().len(), 4);
    }

    #[test]
    fn selects_by_key_and_platform_in_stored_order() {
        let wanted = vec!["threads:d".to_string(), "bluesky".to_string()];
        let selected = select_accounts(stored(), &wanted).unwrap();
        assert_eq!(keys(&selected), vec!["bluesky:b", "bluesky:c", "threads:d"]);
    }

    #[test]
    fn unknown_selector_is_an_error() {
        assert!(select_accounts(stored(), &["pixelfed".to_string()]).is_err());
        assert!(select_accounts(stored(), &["mastodon:zzz".to_string()]).is_err());
    }

    #[tokio::test]
    async fn platforms_and_uninstall_skip_the_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_dir: dir.path().join("data"),
            ..Default::default()
        };

        run(Commands::Uninstall { dir: Some(dir.path().to_path_buf()) }, config.clone())
            .await
            .unwrap();
        run(Commands::Platforms, config).await.unwrap();
        assert!(!dir.path().join("data").exists());
    }

    #[tokio::test]
    async fn post_records_history_and_touches_successful_accounts() {
        let store = Store::in_memory().await.unwrap();
        let long_ago = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        for mut account in [account(Platform::Mastodon, "a"), account(Platform::Bluesky, "b")] {
            account.last_used_at = long_ago;
            store.save_account(&account).await.unwrap();
        }

        let factory: PosterFactory = Arc::new(|account: &StoredAccount| -> Result<Box<dyn Poster>, PostError> {
            Ok(Box::new(StubPoster {
                platform: account.platform,
                fails: account.platform == Platform::Bluesky,
            }) as Box<dyn Poster>)
        });
        let dispatcher = Dispatcher::with_factory(factory, false);
        let selected = store.get_accounts().await.unwrap();

        let report = post(&store, dispatcher, selected, Compose::new("hello", None, ""))
            .await
            .unwrap();

        assert_eq!(report.ok_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(format!("{:?}", exit_status(&report)), format!("{:?}", ExitCode::FAILURE));

        let history = store.recent_history(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().any(|e| e.account_key == "mastodon:a" && e.ok));
        assert!(history.iter().any(|e| e.account_key == "bluesky:b" && !e.ok));

        let mastodon = store.get_account("mastodon:a").await.unwrap().unwrap();
        let bluesky = store.get_account("bluesky:b").await.unwrap().unwrap();
        assert!(mastodon.last_used_at > long_ago);
        assert_eq!(bluesky.last_used_at, long_ago);
    }
}
