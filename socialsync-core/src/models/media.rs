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

//! Image attachment loaded from disk

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::PostError;

/// Extensions accepted as images
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// MIME type used when the extension gives nothing better
const FALLBACK_MIME: &str = "image/jpeg";

/// An image read into memory, shared by every platform in a batch
#[derive(Debug, Clone)]
pub struct MediaFile {
    /// Original path on disk
    pub path: PathBuf,
    /// File name sent in multipart uploads
    pub file_name: String,
    /// Guessed MIME type
    pub mime: String,
    /// Raw file contents
    pub bytes: Arc<Vec<u8>>,
}

impl MediaFile {
    /// Check the path looks like an image and read it
    pub async fn load(path: &Path) -> Result<Self, PostError> {
        if !is_image_path(path) {
            return Err(PostError::InvalidMedia(format!(
                "{} is not a supported image ({})",
                path.display(),
                IMAGE_EXTENSIONS.join(", ")
            )));
        }

        if !path.exists() {
            return Err(PostError::InvalidMedia(format!("File not found: {}", path.display())));
        }

        let bytes = tokio::fs::read(path).await?;
        if bytes.is_empty() {
            return Err(PostError::InvalidMedia(format!("{} is empty", path.display())));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            mime: guess_mime(path),
            bytes: Arc::new(bytes),
        })
    }
}

/// Whether the path has one of the accepted image extensions
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// MIME type for an image path
pub fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .filter(|m| m.type_() == mime_guess::mime::IMAGE)
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}
