//! Per-item `metadata.txt` rendering.

use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};

use crate::download::FileDownloadError;
use crate::item::ContentItem;

/// File name of the metadata file inside an item directory.
pub const METADATA_FILE_NAME: &str = "metadata.txt";

/// Formats a Unix timestamp in local time, `YYYY-MM-DD HH:MM:SS`.
///
/// Out-of-range timestamps are rendered as the raw number.
#[must_use]
pub fn format_timestamp(timestamp: i64) -> String {
    Local
        .timestamp_opt(timestamp, 0)
        .single()
        .map_or_else(
            || timestamp.to_string(),
            |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        )
}

fn indent(text: &str) -> String {
    text.replace('\n', "\n\t")
}

/// Renders the metadata text for an item fetched from `url`.
#[must_use]
pub fn render_metadata(url: &str, item: &ContentItem) -> String {
    format!(
        "Url:        {url}\n\
         Date:       {date}\n\
         Location:   {location}\n\
         Content ID: {id}\n\
         \n\
         UserId:    {user_id}\n\
         Nickname:  {nickname}\n\
         Signature: {{\n\
         \t{signature}\n\
         }}\n\
         \n\
         Music:     {title}\n\
         Artist:    {artist}\n\
         Album:     {album}\n\
         Music Url: {music_url}\n\
         Cover Url: {cover_url}\n\
         \n\
         Keywords [{keyword_count}] {{\n\
         \t{keywords}\n\
         }}\n\
         \n\
         Description {{\n\
         \t{description}\n\
         }}\n\
         \n\
         Comments [{comment_count}] {{\n\
         \t{comments}\n\
         }}\n",
        date = format_timestamp(item.create_time),
        location = item.location,
        id = item.id,
        user_id = item.author.unique_id,
        nickname = item.author.nickname,
        signature = indent(&item.author.signature),
        title = item.music.title,
        artist = item.music.artist,
        album = item.music.album,
        music_url = item.music.play_url,
        cover_url = item.music.cover_url,
        keyword_count = item.keywords.len(),
        keywords = item.keywords.join("\n\t"),
        description = indent(&item.description),
        comment_count = item.comments.len(),
        comments = item.comments.join("\n\t"),
    )
}

/// Writes `metadata.txt` into `directory`, which must already exist.
///
/// # Errors
///
/// Returns [`FileDownloadError::Io`] if the file cannot be written.
pub async fn write_metadata(
    directory: &Path,
    url: &str,
    item: &ContentItem,
) -> Result<PathBuf, FileDownloadError> {
    let path = directory.join(METADATA_FILE_NAME);
    tokio::fs::write(&path, render_metadata(url, item))
        .await
        .map_err(|e| FileDownloadError::io(&path, e))?;
    Ok(path)
}
