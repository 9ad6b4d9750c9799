//! Destination naming and download planning.
//!
//! Every archived item gets its own directory below the list folder:
//!
//! ```text
//! <root>/<author id or "_">/<description> - <id>/
//! ```
//!
//! and an ordered list of [`DownloadTask`]s: music, music cover, video, then
//! gallery images in page order.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::item::ContentItem;
use crate::outcome::OutcomeBucket;

/// Maximum length of a single path component on common filesystems.
pub const MAX_NAME_LEN: usize = 255;

/// Directory used for authors whose id sanitizes to nothing.
pub const UNKNOWN_AUTHOR_DIR: &str = "_";

/// Separator between the description and the id.
const ID_SEPARATOR: &str = " - ";

/// Extension used when the page does not name the video format.
const DEFAULT_VIDEO_FORMAT: &str = "mp4";

/// Errors raised while planning an item's downloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The item id sanitizes to an empty string.
    #[error("item id {raw:?} has no usable characters")]
    EmptyId {
        /// Id as extracted.
        raw: String,
    },

    /// A gallery image lists no URL at all.
    #[error("image {index} of item {id} has an empty URL list")]
    EmptyImageUrls {
        /// Item id.
        id: String,
        /// Position of the image in the gallery.
        index: usize,
    },
}

/// Kind of a planned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Music track.
    Music,
    /// Music cover art.
    Cover,
    /// Video stream.
    Video,
    /// Gallery image.
    Image,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Music => "music",
            Self::Cover => "cover",
            Self::Video => "video",
            Self::Image => "image",
        })
    }
}

/// One file to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Source URL.
    pub url: String,
    /// Destination file path.
    pub destination: PathBuf,
    /// What the file is.
    pub kind: MediaKind,
}

/// Everything needed to archive one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    /// Item directory.
    pub directory: PathBuf,
    /// Files to fetch, in order.
    pub tasks: Vec<DownloadTask>,
    /// Outcome if every task succeeds.
    pub outcome: OutcomeBucket,
}

/// Sanitizes a name for use as a path component.
///
/// - Control and non-ASCII characters are dropped.
/// - `< > : " / \ |` become `{ } ; ' - - ;`.
/// - `?` and `*` are dropped.
/// - Runs of spaces collapse to one and the result is trimmed.
///
/// The function is idempotent.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let mapped = match c {
            c if !(' '..='~').contains(&c) => None,
            '<' => Some('{'),
            '>' => Some('}'),
            ':' | '|' => Some(';'),
            '"' => Some('\''),
            '/' | '\\' => Some('-'),
            '?' | '*' => None,
            c => Some(c),
        };
        if let Some(c) = mapped {
            if c == ' ' && out.ends_with(' ') {
                continue;
            }
            out.push(c);
        }
    }
    out.trim().to_string()
}

/// Combined media outcome for an item.
#[must_use]
pub fn media_outcome(has_video: bool, image_count: usize) -> OutcomeBucket {
    match (has_video, image_count > 0) {
        (true, true) => OutcomeBucket::DownloadedBoth,
        (true, false) => OutcomeBucket::DownloadedVideo,
        (false, true) => OutcomeBucket::DownloadedImage,
        (false, false) => OutcomeBucket::DownloadedNeither,
    }
}

/// Path component for a directory level. Names made only of dots would walk
/// the tree, so they fall back to `fallback`.
fn component_or(name: String, fallback: &str) -> String {
    if name.is_empty() || name.chars().all(|c| c == '.') {
        fallback.to_string()
    } else {
        name
    }
}

/// Builds download plans below a list folder.
#[derive(Debug, Clone)]
pub struct DownloadPlanner {
    root: PathBuf,
}

impl DownloadPlanner {
    /// Creates a planner writing below `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// List folder this planner writes into.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Item directory name: `<description> - <id>`, or `<id>` alone.
    ///
    /// The description is truncated so the whole name stays within
    /// [`MAX_NAME_LEN`].
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::EmptyId`] if the id has no usable characters.
    pub fn item_dir_name(item: &ContentItem) -> Result<String, PlanError> {
        let id = sanitize_name(&item.id);
        if id.is_empty() || id.chars().all(|c| c == '.') {
            return Err(PlanError::EmptyId {
                raw: item.id.clone(),
            });
        }
        let description = sanitize_name(&item.description);
        let budget = MAX_NAME_LEN.saturating_sub(id.len() + ID_SEPARATOR.len());
        // Sanitized names are pure ASCII, so byte offsets are char offsets.
        let truncated = description[..description.len().min(budget)].trim_end();
        if truncated.is_empty() {
            Ok(id[..id.len().min(MAX_NAME_LEN)].to_string())
        } else {
            Ok(format!("{truncated}{ID_SEPARATOR}{id}"))
        }
    }

    /// Item directory below the root.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::EmptyId`] if the id has no usable characters.
    pub fn destination_dir(&self, item: &ContentItem) -> Result<PathBuf, PlanError> {
        let author = component_or(sanitize_name(&item.author.unique_id), UNKNOWN_AUTHOR_DIR);
        Ok(self.root.join(author).join(Self::item_dir_name(item)?))
    }

    /// Plans the directory and the ordered file list for an item.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] for an unusable id or an image without URLs.
    pub fn plan(&self, item: &ContentItem) -> Result<DownloadPlan, PlanError> {
        let directory = self.destination_dir(item)?;
        let mut tasks = Vec::new();

        let title = sanitize_name(&item.music.title);
        let suffix = if title.is_empty() {
            String::new()
        } else {
            format!("{ID_SEPARATOR}{title}")
        };

        if !item.music.play_url.is_empty() {
            tasks.push(DownloadTask {
                url: item.music.play_url.clone(),
                destination: directory.join(format!("music{suffix}.mp4")),
                kind: MediaKind::Music,
            });
        }
        if !item.music.cover_url.is_empty() {
            tasks.push(DownloadTask {
                url: item.music.cover_url.clone(),
                destination: directory.join(format!("music cover{suffix}.jpeg")),
                kind: MediaKind::Cover,
            });
        }
        if item.has_video() {
            let format = component_or(sanitize_name(&item.video.format), DEFAULT_VIDEO_FORMAT);
            tasks.push(DownloadTask {
                url: item.video.play_addr.clone(),
                destination: directory.join(format!("video.{format}")),
                kind: MediaKind::Video,
            });
        }
        for (index, image) in item.images.iter().flatten().enumerate() {
            let Some(url) = image.urls.first() else {
                return Err(PlanError::EmptyImageUrls {
                    id: item.id.clone(),
                    index,
                });
            };
            if image.urls.len() > 1 {
                debug!(
                    id = %item.id,
                    index,
                    extra = image.urls.len() - 1,
                    "ignoring extra image urls"
                );
            }
            tasks.push(DownloadTask {
                url: url.clone(),
                destination: directory.join(format!("{index}.jpeg")),
                kind: MediaKind::Image,
            });
        }

        let outcome = media_outcome(item.has_video(), item.image_count());
        if outcome == OutcomeBucket::DownloadedNeither {
            warn!(id = %item.id, "item has neither a video nor an image post");
        }

        Ok(DownloadPlan {
            directory,
            tasks,
            outcome,
        })
    }
}
