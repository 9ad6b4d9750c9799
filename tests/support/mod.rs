//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod socket_guard;

use serde_json::{Value, json};

/// Id of the script element holding item page state.
pub const DATA_BLOCK_ID: &str = "__UNIVERSAL_DATA_FOR_REHYDRATION__";

/// Wraps a data block document in an item page.
pub fn item_page(block: &Value) -> String {
    format!(
        "<!DOCTYPE html><html><head><script id=\"{DATA_BLOCK_ID}\" type=\"application/json\">{block}</script></head><body><div id=\"app\"></div></body></html>"
    )
}

/// Data block with only a status code.
pub fn status_block(status_code: i64) -> Value {
    json!({
        "__DEFAULT_SCOPE__": {
            "webapp.video-detail": {"statusCode": status_code, "statusMsg": "item unavailable"}
        }
    })
}

/// Item structure of a successful video item whose media live under `media_base`.
pub fn video_item(id: &str, author: &str, desc: &str, media_base: &str) -> Value {
    json!({
        "id": id,
        "createTime": "1700000000",
        "locationCreated": "US",
        "desc": desc,
        "author": {"uniqueId": author, "nickname": "Alice &amp; Co", "signature": "hi"},
        "music": {
            "playUrl": format!("{media_base}/media/{id}/music"),
            "coverLarge": format!("{media_base}/media/{id}/cover"),
            "title": "",
            "authorName": "Alice"
        },
        "video": {"playAddr": format!("{media_base}/media/{id}/video"), "format": "mp4"},
        "comments": ["first!"],
        "suggestedWords": ["cats", 7]
    })
}

/// Wraps an item structure in a successful data block.
pub fn success_block(item_struct: Value) -> Value {
    json!({
        "__DEFAULT_SCOPE__": {
            "webapp.video-detail": {
                "statusCode": 0,
                "itemInfo": {"itemStruct": item_struct}
            }
        }
    })
}
