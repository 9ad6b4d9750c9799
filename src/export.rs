//! Reading item links from a user data export.
//!
//! The export is a large JSON document; only two lists are used:
//! `Activity."Favorite Videos".FavoriteVideoList[].Link` and
//! `Activity."Like List".ItemFavoriteList[].link`. Both must be present.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument};

/// Errors reading the export document. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The document could not be read.
    #[error("failed to read export {path}: {source}")]
    Io {
        /// Document path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON or a list has the wrong shape.
    #[error("malformed export document: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExportError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Item links listed in the export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportLinks {
    /// Favorited item URLs, in export order.
    pub favorites: Vec<String>,
    /// Liked item URLs, in export order.
    pub likes: Vec<String>,
}

impl ExportLinks {
    /// Total number of links across both lists.
    #[must_use]
    pub fn len(&self) -> usize {
        self.favorites.len() + self.likes.len()
    }

    /// Returns true if both lists are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Deserialize)]
struct ExportDocument {
    #[serde(rename = "Activity")]
    activity: Activity,
}

#[derive(Deserialize)]
struct Activity {
    #[serde(rename = "Favorite Videos")]
    favorite_videos: FavoriteVideos,
    #[serde(rename = "Like List")]
    like_list: LikeList,
}

#[derive(Deserialize)]
struct FavoriteVideos {
    #[serde(rename = "FavoriteVideoList")]
    list: Vec<FavoriteEntry>,
}

#[derive(Deserialize)]
struct FavoriteEntry {
    #[serde(rename = "Link")]
    link: String,
}

#[derive(Deserialize)]
struct LikeList {
    #[serde(rename = "ItemFavoriteList")]
    list: Vec<LikeEntry>,
}

#[derive(Deserialize)]
struct LikeEntry {
    link: String,
}

/// Parses the export document text.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if the text is not JSON or either list is
/// missing or malformed.
pub fn parse_export(text: &str) -> Result<ExportLinks, ExportError> {
    let document: ExportDocument = serde_json::from_str(text)?;
    let Activity {
        favorite_videos,
        like_list,
    } = document.activity;
    Ok(ExportLinks {
        favorites: favorite_videos.list.into_iter().map(|e| e.link).collect(),
        likes: like_list.list.into_iter().map(|e| e.link).collect(),
    })
}

/// Reads and parses the export document at `path`.
///
/// # Errors
///
/// Returns [`ExportError::Io`] if the file cannot be read, otherwise as
/// [`parse_export`].
#[instrument(fields(path = %path.display()))]
pub async fn load_export(path: &Path) -> Result<ExportLinks, ExportError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ExportError::io(path, e))?;
    let links = parse_export(&text)?;
    info!(
        favorites = links.favorites.len(),
        likes = links.likes.len(),
        "loaded export"
    );
    Ok(links)
}
