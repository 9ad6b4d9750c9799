//! Typed views of an item page.
//!
//! The embedded data block is one large JSON tree. [`ExtractionRecord`] pulls
//! the status fields out of it through the [`extract`](crate::extract)
//! decoder and, for items that can be archived, decodes a [`ContentItem`].

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::classify::SUCCESS_STATUS;
use crate::extract::{Decoded, DecodedRecord, ExtractError, Fields, Shape};

const DEFAULT_SCOPE_KEY: &str = "__DEFAULT_SCOPE__";
const VIDEO_DETAIL_KEY: &str = "webapp.video-detail";

/// Placeholder for music fields the page does not carry.
pub const MISSING_FIELD_PLACEHOLDER: &str = "N/A";

#[allow(clippy::expect_used)]
static HTML_ENTITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,31});")
        .expect("html entity regex is valid")
});

static ITEM_SHAPE: LazyLock<Shape> = LazyLock::new(|| {
    Shape::record([
        ("id", Shape::one_of([Shape::str(), Shape::int()])),
        ("createTime", Shape::int()),
        ("locationCreated", Shape::str()),
        ("desc", Shape::str()),
        (
            "author",
            Shape::record([
                ("uniqueId", Shape::str()),
                ("nickname", Shape::str()),
                ("signature", Shape::str()),
            ]),
        ),
        (
            "music",
            Shape::record([
                ("playUrl", Shape::str()),
                ("coverLarge", Shape::str()),
                ("title", Shape::str()),
                ("authorName", Shape::str().or_default(MISSING_FIELD_PLACEHOLDER)),
                ("album", Shape::str().or_default(MISSING_FIELD_PLACEHOLDER)),
            ]),
        ),
        (
            "video",
            Shape::record([("playAddr", Shape::str()), ("format", Shape::str())]),
        ),
        ("comments", Shape::list(Shape::str())),
        (
            "imagePost",
            Shape::record([(
                "images",
                Shape::list(Shape::record([(
                    "imageURL",
                    Shape::record([("urlList", Shape::list(Shape::str()))]),
                )])),
            )])
            .optional(),
        ),
    ])
});

/// Author of an item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Author {
    /// Handle, used as the first directory level.
    pub unique_id: String,
    /// Display name.
    pub nickname: String,
    /// Profile text, possibly multi-line.
    pub signature: String,
}

/// Music track attached to an item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Music {
    /// Audio URL, empty when the track cannot be fetched.
    pub play_url: String,
    /// Cover art URL, possibly empty.
    pub cover_url: String,
    /// Track title, possibly empty.
    pub title: String,
    /// Artist, `N/A` when absent.
    pub artist: String,
    /// Album, `N/A` when absent.
    pub album: String,
}

/// Video stream of an item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Video {
    /// Stream URL, empty for image posts.
    pub play_addr: String,
    /// Container format, used as the file extension.
    pub format: String,
}

/// One picture of an image gallery. Holds every mirror URL the page lists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GalleryImage {
    /// Mirror URLs in page order.
    pub urls: Vec<String>,
}

/// A successfully extracted item. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentItem {
    /// Item id.
    pub id: String,
    /// Creation time as a Unix timestamp.
    pub create_time: i64,
    /// Country or region the item was created in.
    pub location: String,
    /// Author.
    pub author: Author,
    /// Caption.
    pub description: String,
    /// Suggested search words.
    pub keywords: Vec<String>,
    /// Comment texts embedded in the page.
    pub comments: Vec<String>,
    /// Music track.
    pub music: Music,
    /// Video stream.
    pub video: Video,
    /// Image gallery, when the item is a photo post.
    pub images: Option<Vec<GalleryImage>>,
}

/// Status fields of a page plus the decoded item when it can be archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRecord {
    /// Platform status code of the detail block.
    pub status_code: i64,
    /// Classified (age restricted) flag. `false` when the status is not success.
    pub is_classified: bool,
    /// Decoded item. Only present for a successful, unclassified page.
    pub item: Option<ContentItem>,
}

impl ExtractionRecord {
    /// Parses the text of an embedded data block.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidJson`] for malformed JSON, or the decode
    /// error for a document that does not have the expected structure.
    pub fn from_json(text: &str) -> Result<Self, ExtractError> {
        let root: Value = serde_json::from_str(text)?;
        Self::from_value(&root)
    }

    /// Builds the record from an already parsed document.
    ///
    /// Decoding stops at the first terminal field: a non-success status skips
    /// the item entirely and a classified item is not decoded further.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] for a document that does not have the expected
    /// structure.
    pub fn from_value(root: &Value) -> Result<Self, ExtractError> {
        let detail = Fields::new(root)?
            .nested(DEFAULT_SCOPE_KEY)?
            .nested(VIDEO_DETAIL_KEY)?;

        let status_code: i64 = detail.required("statusCode")?;
        if status_code != SUCCESS_STATUS {
            return Ok(Self {
                status_code,
                is_classified: false,
                item: None,
            });
        }

        let item_struct = detail.nested("itemInfo")?.nested("itemStruct")?;
        let is_classified = item_struct.get_or("isContentClassified", false)?;
        if is_classified {
            return Ok(Self {
                status_code,
                is_classified,
                item: None,
            });
        }

        let item = ContentItem::from_fields(&item_struct)?;
        Ok(Self {
            status_code,
            is_classified,
            item: Some(item),
        })
    }
}

impl ContentItem {
    fn from_fields(item_struct: &Fields<'_>) -> Result<Self, ExtractError> {
        let record = item_struct.decode_record(&ITEM_SHAPE)?;

        // Keywords are best effort: entries that are not strings are skipped.
        let keywords = if item_struct.contains("suggestedWords") {
            let list = item_struct.lossy_list("suggestedWords", &Shape::str())?;
            if !list.rejected.is_empty() {
                debug!(
                    rejected = list.rejected.len(),
                    "skipping non-string suggested words"
                );
            }
            list.items
                .iter()
                .filter_map(Decoded::as_str)
                .map(unescape_html)
                .collect()
        } else {
            Vec::new()
        };

        let author = record.record("author")?;
        let music = record.record("music")?;
        let video = record.record("video")?;

        Ok(Self {
            id: unescape_html(&record.text("id")?),
            create_time: record.int("createTime")?,
            location: clean(&record, "locationCreated")?,
            author: Author {
                unique_id: clean(author, "uniqueId")?,
                nickname: clean(author, "nickname")?,
                signature: clean(author, "signature")?,
            },
            description: clean(&record, "desc")?,
            keywords,
            comments: record.strings("comments")?,
            music: Music {
                play_url: clean(music, "playUrl")?,
                cover_url: clean(music, "coverLarge")?,
                title: clean(music, "title")?,
                artist: clean(music, "authorName")?,
                album: clean(music, "album")?,
            },
            video: Video {
                play_addr: clean(video, "playAddr")?,
                format: clean(video, "format")?,
            },
            images: gallery(&record)?,
        })
    }

    /// Returns true if the item carries a video stream.
    #[must_use]
    pub fn has_video(&self) -> bool {
        !self.video.play_addr.is_empty()
    }

    /// Number of gallery images (zero when the item is not a photo post).
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.images.as_ref().map_or(0, Vec::len)
    }
}

fn gallery(record: &DecodedRecord) -> Result<Option<Vec<GalleryImage>>, ExtractError> {
    let Some(image_post) = record.opt_record("imagePost")? else {
        return Ok(None);
    };
    let images = image_post
        .list("images")?
        .iter()
        .map(|entry| {
            let Decoded::Record(entry) = entry else {
                return Err(ExtractError::mismatch(
                    image_post.path(),
                    "object",
                    entry.kind(),
                ));
            };
            let urls = entry
                .record("imageURL")?
                .strings("urlList")?
                .iter()
                .map(|url| unescape_html(url))
                .collect();
            Ok(GalleryImage { urls })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(images))
}

fn clean(record: &DecodedRecord, key: &str) -> Result<String, ExtractError> {
    record.str(key).map(unescape_html)
}

/// Decodes HTML character references and trims surrounding whitespace.
///
/// Unknown named references are left untouched.
#[must_use]
pub fn unescape_html(value: &str) -> String {
    HTML_ENTITY_PATTERN
        .replace_all(value, |caps: &regex::Captures<'_>| {
            let entity = &caps[1];
            decode_entity(entity).map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .trim()
        .to_string()
}

fn decode_entity(entity: &str) -> Option<char> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(dec) = entity.strip_prefix('#') {
        return dec.parse::<u32>().ok().and_then(char::from_u32);
    }
    let c = match entity {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00a0}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "copy" => '\u{00a9}',
        "reg" => '\u{00ae}',
        _ => return None,
    };
    Some(c)
}
