//! # Daily Brief
//!
//! A reader for a static news-briefing site. The site generator publishes
//! pre-built JSON feeds under `data/`; this crate fetches them, keeps the
//! reading session's state, and formats items for display.
//!
//! ## Feeds
//!
//! - `data/news.json`: the current edition, with briefing and market ticker
//! - `data/news_archive.json`: older items revealed by "load more"
//! - `data/archive_index.json`: the list of archived months
//! - `data/archive_<month>.json`: one archived month
//!
//! ## Architecture
//!
//! 1. **Sources** ([`source`]): fetch a resource over HTTP or from disk, with retries
//! 2. **Aggregation** ([`aggregator`]): merge, deduplicate, filter and paginate
//! 3. **Presentation** ([`render`]): cards, ticker and detail view as text

pub mod aggregator;
pub mod config;
pub mod error;
pub mod models;
pub mod render;
pub mod source;
pub mod utils;

pub use aggregator::{
    ALL_CATEGORIES, AggregatorState, ArchiveFetchResult, FeedAggregator, FeedMeta, LoadMore,
    ViewMode,
};
pub use config::Config;
pub use error::{FeedError, FetchError};
pub use models::{ArchiveMonth, FeedDocument, IndexQuote, NewsItem};
pub use source::{FeedSource, Resource, open_source};
