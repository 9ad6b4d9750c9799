//! TikTok Downloader Core Library
//!
//! This library provides the acquisition pipeline behind the `tiktok-downloader`
//! tool, which archives the liked and favorited items listed in a TikTok user
//! data export: page metadata, video or image gallery, music track and cover.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Resolved run configuration and defaults
//! - [`session`] - Per-worker HTTP sessions with optional validated proxies
//! - [`page`] - Page fetching and embedded data block extraction with retry
//! - [`extract`] - Shape-directed decoding of untyped JSON into typed values
//! - [`item`] - Typed views of an item page built through the extractor
//! - [`classify`] - Status classification of extracted items
//! - [`plan`] - Destination naming and download planning
//! - [`metadata`] - Per-item metadata file rendering
//! - [`download`] - Chunked streaming of planned files to disk
//! - [`outcome`] - Outcome buckets, thread-safe aggregation and reports
//! - [`progress`] - Progress events emitted by workers
//! - [`engine`] - Bounded worker pool driving the per-item pipeline
//! - [`export`] - Reading link lists from the user data export document

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod classify;
pub mod config;
pub mod download;
pub mod engine;
pub mod export;
pub mod extract;
pub mod item;
pub mod metadata;
pub mod outcome;
pub mod page;
pub mod plan;
pub mod progress;
pub mod session;
#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use classify::{Verdict, classify};
pub use config::RunConfig;
pub use download::{FileDownloadError, FileDownloader};
pub use engine::{ArchiveEngine, EngineError};
pub use export::{ExportError, ExportLinks, load_export, parse_export};
pub use extract::{Decoded, DecodedRecord, ExtractError, Fields, FromDecoded, Shape, decode};
pub use item::{ContentItem, ExtractionRecord};
pub use outcome::{OutcomeBucket, ReportError, ResultAggregator, ResultSet, Summary};
pub use page::{FetchError, PageFetcher, RawBlock};
pub use plan::{DownloadPlan, DownloadPlanner, DownloadTask, MediaKind, PlanError, sanitize_name};
pub use progress::{ProgressEvent, ProgressReporter};
pub use session::{
    ProxyListSource, RemoteProxyList, Session, SessionError, SessionProvider, WorkerId,
};
