//! Item page bodies for pipeline tests.

use serde_json::{Value, json};

use crate::page::DATA_BLOCK_ID;

/// Wraps a data block document in an item page.
pub(crate) fn item_page(block: &Value) -> String {
    format!(
        "<!DOCTYPE html><html><head><script id=\"{DATA_BLOCK_ID}\" type=\"application/json\">{block}</script></head><body></body></html>"
    )
}

/// Data block with only a status code.
pub(crate) fn status_block(status_code: i64) -> Value {
    json!({
        "__DEFAULT_SCOPE__": {
            "webapp.video-detail": {"statusCode": status_code, "statusMsg": ""}
        }
    })
}

/// Data block for a successful item whose media live under `media_base`.
pub(crate) fn video_block(id: &str, author: &str, desc: &str, media_base: &str) -> Value {
    json!({
        "__DEFAULT_SCOPE__": {
            "webapp.video-detail": {
                "statusCode": 0,
                "itemInfo": {
                    "itemStruct": {
                        "id": id,
                        "createTime": 1_700_000_000,
                        "locationCreated": "US",
                        "desc": desc,
                        "author": {"uniqueId": author, "nickname": author, "signature": ""},
                        "music": {
                            "playUrl": format!("{media_base}/music/{id}"),
                            "coverLarge": format!("{media_base}/cover/{id}"),
                            "title": "original sound"
                        },
                        "video": {"playAddr": format!("{media_base}/video/{id}"), "format": "mp4"},
                        "comments": [],
                        "suggestedWords": []
                    }
                }
            }
        }
    })
}
