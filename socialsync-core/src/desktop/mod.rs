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

//! Desktop menu registration
//!
//! Writes a freedesktop `.desktop` entry pointing at the running binary so
//! SocialSync shows up in the application menu.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// File name of the desktop entry
pub const DESKTOP_FILE_NAME: &str = "socialsync.desktop";

pub const ENTRY_NAME: &str = "SocialSync";
pub const ENTRY_COMMENT: &str = "Cross-post photos to Mastodon, Pixelfed, Bluesky and Threads";
pub const ENTRY_CATEGORIES: &str = "Network;Graphics;";
pub const ENTRY_KEYWORDS: &str = "social;mastodon;pixelfed;bluesky;threads;photo;";
pub const ENTRY_WM_CLASS: &str = "socialsync";
/// Icon name used when no icon file is given
pub const DEFAULT_ICON: &str = "socialsync";

/// Contents of the desktop entry
#[derive(Debug, Clone)]
pub struct DesktopEntry {
    /// Absolute path of the executable
    pub exec: PathBuf,
    /// Absolute icon path or themed icon name
    pub icon: String,
}

impl DesktopEntry {
    /// Render the entry file
    pub fn render(&self) -> String {
        let exec = self.exec.display().to_string();
        let exec = if exec.contains(char::is_whitespace) {
            format!("\"{}\"", exec)
        } else {
            exec
        };

        [
            "[Desktop Entry]".to_string(),
            "Version=1.0".to_string(),
            "Type=Application".to_string(),
            format!("Name={}", ENTRY_NAME),
            format!("Comment={}", ENTRY_COMMENT),
            format!("Exec={}", exec),
            format!("Icon={}", self.icon),
            "Terminal=true".to_string(),
            format!("Categories={}", ENTRY_CATEGORIES),
            format!("Keywords={}", ENTRY_KEYWORDS),
            format!("StartupWMClass={}", ENTRY_WM_CLASS),
            String::new(),
        ]
        .join("\n")
    }
}

/// What to install and where
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Applications directory, `~/.local/share/applications` when unset
    pub dir: Option<PathBuf>,
    /// Icon file
    pub icon: Option<PathBuf>,
    /// Executable to register, the running binary when unset
    pub exe: Option<PathBuf>,
    /// Run `update-desktop-database` afterwards
    pub refresh_database: bool,
}

/// Default applications directory (`~/.local/share/applications`)
pub fn default_applications_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".local").join("share").join("applications"))
}

fn applications_dir(dir: Option<&Path>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => default_applications_dir().context("Could not determine the home directory"),
    }
}

/// Resolve the executable to register. Fails before anything is written
/// when it cannot be found.
fn resolve_exe(exe: Option<&Path>) -> Result<PathBuf> {
    let exe = match exe {
        Some(path) => path.to_path_buf(),
        None => std::env::current_exe().context("Could not locate the socialsync executable")?,
    };

    if !exe.is_file() {
        bail!("Executable not found: {}", exe.display());
    }

    exe.canonicalize()
        .with_context(|| format!("Could not resolve {}", exe.display()))
}

/// Write the desktop entry, returning its path
pub fn install(options: &InstallOptions) -> Result<PathBuf> {
    let exec = resolve_exe(options.exe.as_deref())?;

    let icon = match &options.icon {
        Some(path) => path
            .canonicalize()
            .with_context(|| format!("Icon not found: {}", path.display()))?
            .display()
            .to_string(),
        None => DEFAULT_ICON.to_string(),
    };

    let dir = applications_dir(options.dir.as_deref())?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Could not create {}", dir.display()))?;

    let path = dir.join(DESKTOP_FILE_NAME);
    let entry = DesktopEntry { exec, icon };
    std::fs::write(&path, entry.render())
        .with_context(|| format!("Could not write {}", path.display()))?;

    info!("Desktop entry written to {}", path.display());

    if options.refresh_database {
        refresh_desktop_database(&dir);
    }

    Ok(path)
}

/// Remove the desktop entry, returning whether one existed
pub fn uninstall(dir: Option<&Path>) -> Result<bool> {
    let path = applications_dir(dir)?.join(DESKTOP_FILE_NAME);
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_file(&path).with_context(|| format!("Could not remove {}", path.display()))?;
    info!("Removed {}", path.display());
    Ok(true)
}

/// Best effort; a missing tool or failure is only logged
fn refresh_desktop_database(dir: &Path) {
    match Command::new("update-desktop-database").arg(dir).status() {
        Ok(status) if status.success() => debug!("Desktop database refreshed"),
        Ok(status) => warn!("update-desktop-database exited with {}", status),
        Err(e) => warn!("Could not run update-desktop-database: {}", e),
    }
}
