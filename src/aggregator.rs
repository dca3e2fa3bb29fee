//! The feed aggregator: displayed items, category filter and archive buffer.
//!
//! [`AggregatorState`] holds everything a reading session knows and exposes
//! the pure transitions (replace, filter, merge, drain). [`FeedAggregator`]
//! pairs that state with a [`FeedSource`] and adds the fetching operations.
//!
//! # Archive State Machine
//!
//! "Load more" is served from a buffer that is filled at most once per session:
//!
//! ```text
//!            fetch ok, new items        drain (buffer non-empty)
//! Unfetched ───────────────────> Buffered ────────────┐
//!     │  ▲                          │  ▲──────────────┘
//!     │  └─ fetch failed            │ last item drained
//!     │                             ▼
//!     └──── fetch ok, nothing new ─> Exhausted
//! ```
//!
//! The archive is deduplicated by title exactly once, against the items
//! displayed at fetch time.

use crate::config::Config;
use crate::error::{FeedError, FetchError};
use crate::models::{ArchiveMonth, FeedDocument, IndexQuote, NewsItem};
use crate::source::{FeedSource, Resource};
use crate::utils::{looks_truncated, truncate_for_log};
use itertools::Itertools;
use serde::de::DeserializeOwned;
use std::collections::{HashSet, VecDeque};
use std::num::NonZeroUsize;
use tracing::{debug, info, instrument, warn};

/// Category value that disables filtering.
pub const ALL_CATEGORIES: &str = "all";

/// What the displayed list currently represents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ViewMode {
    /// The live feed, optionally extended from the archive buffer.
    #[default]
    Live,
    /// A single archived month, browsed on its own.
    ArchiveMonth { id: String },
}

/// Non-item data from the most recently loaded primary feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedMeta {
    pub last_updated: Option<String>,
    pub briefing: Option<String>,
    pub indices: Vec<IndexQuote>,
}

/// Outcome of [`FeedAggregator::fetch_archive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFetchResult {
    /// The buffer holds items; call `drain_batch`.
    Drain,
    /// Nothing left to fetch or drain this session.
    Exhausted,
}

/// Outcome of one "load more" request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadMore {
    Batch {
        /// Items moved from the archive buffer onto the displayed list.
        added: Vec<NewsItem>,
        /// The re-applied filter result, present when a category is active.
        refiltered: Option<Vec<NewsItem>>,
        /// Items still waiting in the buffer.
        remaining: usize,
    },
    Exhausted,
}

/// Session state of the reader.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorState {
    displayed_items: Vec<NewsItem>,
    active_category: String,
    archive_buffer: VecDeque<NewsItem>,
    archive_fetched: bool,
    meta: FeedMeta,
    view: ViewMode,
}

impl Default for AggregatorState {
    fn default() -> Self {
        Self {
            displayed_items: Vec::new(),
            active_category: ALL_CATEGORIES.to_string(),
            archive_buffer: VecDeque::new(),
            archive_fetched: false,
            meta: FeedMeta::default(),
            view: ViewMode::Live,
        }
    }
}

impl AggregatorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn displayed_items(&self) -> &[NewsItem] {
        &self.displayed_items
    }

    pub fn active_category(&self) -> &str {
        &self.active_category
    }

    pub fn archive_buffer(&self) -> &VecDeque<NewsItem> {
        &self.archive_buffer
    }

    pub fn archive_fetched(&self) -> bool {
        self.archive_fetched
    }

    pub fn meta(&self) -> &FeedMeta {
        &self.meta
    }

    pub fn view(&self) -> &ViewMode {
        &self.view
    }

    /// The archive was fetched and every new item has been drained.
    pub fn is_exhausted(&self) -> bool {
        self.archive_fetched && self.archive_buffer.is_empty()
    }

    /// Install a freshly fetched primary feed. Items are taken as published.
    pub fn replace_primary(&mut self, document: FeedDocument) -> &[NewsItem] {
        self.displayed_items = document.items;
        self.active_category = ALL_CATEGORIES.to_string();
        self.meta = FeedMeta {
            last_updated: document.last_updated,
            briefing: document.briefing,
            indices: document.indices.unwrap_or_default(),
        };
        self.view = ViewMode::Live;
        &self.displayed_items
    }

    /// Select `category` and return the matching displayed items.
    ///
    /// `"all"` returns every item. Any other value keeps items whose category
    /// label contains it (case-sensitive); uncategorized items are dropped.
    pub fn apply_filter(&mut self, category: &str) -> Vec<NewsItem> {
        self.active_category = category.to_string();
        self.filtered()
    }

    /// Items visible under the current category, without changing it.
    pub fn filtered(&self) -> Vec<NewsItem> {
        if self.active_category == ALL_CATEGORIES {
            return self.displayed_items.clone();
        }
        self.displayed_items
            .iter()
            .filter(|item| item.matches_category(&self.active_category))
            .cloned()
            .collect()
    }

    /// Answer `fetch_archive` from state alone, if no fetch is needed.
    pub fn pending_archive_result(&self) -> Option<ArchiveFetchResult> {
        if !self.archive_buffer.is_empty() {
            Some(ArchiveFetchResult::Drain)
        } else if self.archive_fetched {
            Some(ArchiveFetchResult::Exhausted)
        } else {
            None
        }
    }

    /// Buffer the archive items whose titles are not displayed yet.
    ///
    /// A title repeated inside the archive itself is buffered once, at its
    /// first position.
    pub fn merge_archive(&mut self, document: FeedDocument) -> ArchiveFetchResult {
        let shown: HashSet<&str> = self
            .displayed_items
            .iter()
            .map(|item| item.title.as_str())
            .collect();
        let total = document.items.len();
        let fresh: VecDeque<NewsItem> = document
            .items
            .into_iter()
            .filter(|item| !shown.contains(item.title.as_str()))
            .unique_by(|item| item.title.clone())
            .collect();

        debug!(total, fresh = fresh.len(), "Merged archive against displayed items");
        self.archive_buffer = fresh;
        self.archive_fetched = true;

        if self.archive_buffer.is_empty() {
            ArchiveFetchResult::Exhausted
        } else {
            ArchiveFetchResult::Drain
        }
    }

    /// Move up to `batch_size` items from the buffer onto the displayed list.
    ///
    /// The active filter is not re-applied; the caller re-runs it if needed.
    pub fn drain_batch(&mut self, batch_size: NonZeroUsize) -> Vec<NewsItem> {
        let take = batch_size.get().min(self.archive_buffer.len());
        let batch: Vec<NewsItem> = self.archive_buffer.drain(..take).collect();
        self.displayed_items.extend(batch.iter().cloned());
        batch
    }

    /// Show an archived month in place of whatever was displayed.
    pub fn replace_with_month(&mut self, month_id: &str, document: FeedDocument) -> &[NewsItem] {
        self.displayed_items = document.items;
        self.active_category = ALL_CATEGORIES.to_string();
        self.view = ViewMode::ArchiveMonth {
            id: month_id.to_string(),
        };
        &self.displayed_items
    }
}

/// Session-scoped reader over one site.
///
/// Every mutating operation borrows the aggregator mutably, so at most one
/// fetch is in flight per session and operations apply in call order.
#[derive(Debug)]
pub struct FeedAggregator<S> {
    source: S,
    state: AggregatorState,
    batch_size: NonZeroUsize,
    load_more_threshold: usize,
}

impl<S> FeedAggregator<S>
where
    S: FeedSource,
{
    pub fn new(source: S, config: &Config) -> Self {
        Self {
            source,
            state: AggregatorState::new(),
            batch_size: config.batch_size,
            load_more_threshold: config.load_more_threshold,
        }
    }

    pub fn state(&self) -> &AggregatorState {
        &self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn batch_size(&self) -> NonZeroUsize {
        self.batch_size
    }

    /// Fetch `data/news.json` and make it the displayed list.
    ///
    /// Returns the full, unfiltered list for the initial render. On failure
    /// the previously displayed items stay in place.
    #[instrument(level = "info", skip_all)]
    pub async fn load_primary(&mut self) -> Result<&[NewsItem], FeedError> {
        let document: FeedDocument = self
            .fetch_document(&Resource::Primary)
            .await
            .map_err(FeedError::FeedUnavailable)?;
        info!(
            items = document.items.len(),
            last_updated = document.last_updated.as_deref().unwrap_or("-"),
            "Loaded primary feed"
        );
        Ok(self.state.replace_primary(document))
    }

    /// Select a category and return the items to show. See [`AggregatorState::apply_filter`].
    pub fn apply_filter(&mut self, category: &str) -> Vec<NewsItem> {
        let visible = self.state.apply_filter(category);
        debug!(%category, visible = visible.len(), "Applied category filter");
        visible
    }

    /// Make sure the archive buffer is populated, fetching it on first use.
    ///
    /// A failed fetch leaves the archive marked unfetched so the next call
    /// tries again.
    #[instrument(level = "info", skip_all)]
    pub async fn fetch_archive(&mut self) -> Result<ArchiveFetchResult, FeedError> {
        if let Some(result) = self.state.pending_archive_result() {
            debug!(?result, buffered = self.state.archive_buffer.len(), "Archive answered from buffer");
            return Ok(result);
        }

        let document: FeedDocument = self
            .fetch_document(&Resource::Archive)
            .await
            .map_err(FeedError::ArchiveUnavailable)?;
        let result = self.state.merge_archive(document);
        info!(?result, buffered = self.state.archive_buffer.len(), "Fetched news archive");
        Ok(result)
    }

    /// Reveal the next `batch_size` archive items. See [`AggregatorState::drain_batch`].
    pub fn drain_batch(&mut self, batch_size: NonZeroUsize) -> Vec<NewsItem> {
        let batch = self.state.drain_batch(batch_size);
        debug!(
            drained = batch.len(),
            remaining = self.state.archive_buffer.len(),
            "Drained archive batch"
        );
        batch
    }

    /// The "load more" action: fetch or reuse the archive buffer, reveal one
    /// batch of the configured size, then re-apply the active category.
    #[instrument(level = "info", skip_all)]
    pub async fn load_more(&mut self) -> Result<LoadMore, FeedError> {
        match self.fetch_archive().await? {
            ArchiveFetchResult::Exhausted => {
                info!("No older news left to load");
                Ok(LoadMore::Exhausted)
            }
            ArchiveFetchResult::Drain => {
                let added = self.drain_batch(self.batch_size);
                let refiltered = (self.state.active_category != ALL_CATEGORIES)
                    .then(|| self.state.filtered());
                Ok(LoadMore::Batch {
                    added,
                    refiltered,
                    remaining: self.state.archive_buffer.len(),
                })
            }
        }
    }

    /// Whether the presentation should offer "load more".
    ///
    /// Only the unfiltered live feed, once it is long enough, and only while
    /// the archive is not known to be exhausted.
    pub fn load_more_visible(&self) -> bool {
        self.state.view == ViewMode::Live
            && self.state.active_category == ALL_CATEGORIES
            && self.state.displayed_items.len() >= self.load_more_threshold
            && !self.state.is_exhausted()
    }

    /// Fetch `data/archive_<month_id>.json` and display it on its own.
    #[instrument(level = "info", skip(self))]
    pub async fn load_archive_month(&mut self, month_id: &str) -> Result<&[NewsItem], FeedError> {
        let not_found = |source: FetchError| FeedError::ArchiveMonthNotFound {
            month_id: month_id.to_string(),
            source,
        };
        let resource = Resource::archive_month(month_id).map_err(not_found)?;
        let document: FeedDocument = self.fetch_document(&resource).await.map_err(not_found)?;
        info!(items = document.items.len(), "Loaded archive month");
        Ok(self.state.replace_with_month(month_id, document))
    }

    /// Fetch the list of archived months. A missing index means no archives yet.
    #[instrument(level = "info", skip_all)]
    pub async fn load_archive_index(&self) -> Result<Vec<ArchiveMonth>, FeedError> {
        match self.fetch_document::<Vec<ArchiveMonth>>(&Resource::ArchiveIndex).await {
            Ok(months) => {
                info!(months = months.len(), "Loaded archive index");
                Ok(months)
            }
            Err(e) if e.is_not_found() => {
                info!("Archive index not published yet");
                Ok(Vec::new())
            }
            Err(e) => Err(FeedError::ArchiveIndexUnavailable(e)),
        }
    }

    /// Look up a displayed item by its title.
    pub fn find(&self, title: &str) -> Option<&NewsItem> {
        self.state.displayed_items.iter().find(|item| item.title == title)
    }

    async fn fetch_document<T>(&self, resource: &Resource) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let body = self.source.fetch(resource).await?;
        serde_json::from_str(&body).map_err(|source| {
            if looks_truncated(&source) {
                warn!(%resource, bytes = body.len(), "Feed body ends early; generator may still be writing it");
            } else {
                warn!(
                    %resource,
                    error = %source,
                    body_preview = %truncate_for_log(&body, 200),
                    "Feed body is not a valid document"
                );
            }
            FetchError::Parse {
                resource: resource.path(),
                source,
            }
        })
    }
}
