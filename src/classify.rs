//! Status classification of extracted items.
//!
//! Maps the platform status code and the classified-content flag to a
//! terminal [`OutcomeBucket`], or clears the item for media planning.

use tracing::debug;

use crate::item::ExtractionRecord;
use crate::outcome::OutcomeBucket;

/// Status code of a page that can be archived.
pub const SUCCESS_STATUS: i64 = 0;

/// Status code of a private item.
pub const PRIVATE_STATUS: i64 = 10222;

/// Status codes of removed or otherwise unavailable items.
pub const NOT_AVAILABLE_STATUSES: [i64; 3] = [10204, 100_004, 10231];

/// Result of classifying one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Processing stops with this outcome.
    Terminal(OutcomeBucket),
    /// The item continues to download planning.
    Proceed,
}

/// Classifies an extraction record.
///
/// Rules are evaluated in order and the first match wins:
///
/// 1. a removed-item status is [`OutcomeBucket::NotAvailable`]
/// 2. the private status is [`OutcomeBucket::Private`]
/// 3. any other non-success status is [`OutcomeBucket::ParseError`]
/// 4. a classified item is [`OutcomeBucket::Restricted`]
/// 5. everything else proceeds
#[must_use]
pub fn classify(record: &ExtractionRecord) -> Verdict {
    let verdict = match record.status_code {
        code if NOT_AVAILABLE_STATUSES.contains(&code) => {
            Verdict::Terminal(OutcomeBucket::NotAvailable)
        }
        PRIVATE_STATUS => Verdict::Terminal(OutcomeBucket::Private),
        SUCCESS_STATUS if record.is_classified => Verdict::Terminal(OutcomeBucket::Restricted),
        SUCCESS_STATUS => Verdict::Proceed,
        _ => Verdict::Terminal(OutcomeBucket::ParseError),
    };
    debug!(
        status_code = record.status_code,
        is_classified = record.is_classified,
        ?verdict,
        "classified item"
    );
    verdict
}
