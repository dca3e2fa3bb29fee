//! Feed sources: where the JSON documents come from.
//!
//! The site publishes four kinds of resource under `data/`; [`Resource`]
//! names them and knows their relative paths. A [`FeedSource`] turns a
//! resource into its raw JSON body. Parsing stays with the aggregator so that
//! each operation can map failures onto its own error kind.
//!
//! # Implementations
//!
//! - [`HttpFeedSource`]: GET against a base URL, with a cache-busting query
//! - [`DirFeedSource`]: reads a checked-out copy of the site from disk
//! - [`SiteSource`]: either of the above, picked from a location string
//! - [`RetryFetch`]: decorator adding exponential backoff on transient errors
//!
//! # Retry Strategy
//!
//! - Only transport errors, HTTP 5xx and HTTP 429 are retried
//! - Delay doubles from `base_delay` and is capped at `max_delay`
//! - Random jitter (0-250ms by default) is added to every delay

use crate::config::Config;
use crate::error::FetchError;
use crate::utils::cache_buster;
use once_cell::sync::Lazy;
use rand::{Rng, rng};
use regex::Regex;
use reqwest::StatusCode;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Archive month keys are `YYYY_MM`, as written by the site generator.
static MONTH_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}_\d{2}$").expect("month id pattern is valid"));

/// A JSON document published by the site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    /// `data/news.json`, the current edition.
    Primary,
    /// `data/news_archive.json`, the rolling buffer of older items.
    Archive,
    /// `data/archive_index.json`, the list of archived months.
    ArchiveIndex,
    /// `data/archive_<id>.json`, one archived month.
    ArchiveMonth(String),
}

impl Resource {
    /// Build an archive month resource, rejecting ids that are not `YYYY_MM` keys.
    pub fn archive_month(month_id: &str) -> Result<Self, FetchError> {
        if MONTH_ID.is_match(month_id) {
            Ok(Resource::ArchiveMonth(month_id.to_string()))
        } else {
            Err(FetchError::InvalidResource(format!(
                "archive month id {month_id:?}"
            )))
        }
    }

    /// Path relative to the site root.
    pub fn path(&self) -> String {
        match self {
            Resource::Primary => "data/news.json".to_string(),
            Resource::Archive => "data/news_archive.json".to_string(),
            Resource::ArchiveIndex => "data/archive_index.json".to_string(),
            Resource::ArchiveMonth(id) => format!("data/archive_{id}.json"),
        }
    }

    /// Month files are immutable once written and are served without cache busting.
    pub fn is_cache_busted(&self) -> bool {
        !matches!(self, Resource::ArchiveMonth(_))
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Something that can produce the raw JSON body of a [`Resource`].
///
/// Callers hold the aggregator mutably while a fetch is outstanding, so a
/// source never sees two concurrent requests from the same session.
#[allow(async_fn_in_trait)]
pub trait FeedSource {
    async fn fetch(&self, resource: &Resource) -> Result<String, FetchError>;
}

/// Fetches resources over HTTP relative to a base URL.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    base: Url,
    client: reqwest::Client,
}

impl HttpFeedSource {
    /// Create a source rooted at `base_url`.
    ///
    /// A missing trailing slash is added so that `data/...` resolves inside the
    /// site directory rather than replacing its last path segment.
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|source| FetchError::Transport {
                resource: base.to_string(),
                source,
            })?;
        Ok(Self { base, client })
    }

    /// The full URL for `resource`, including the cache-busting query when it applies.
    pub fn url_for(&self, resource: &Resource) -> Result<Url, FetchError> {
        let mut url = self.base.join(&resource.path())?;
        if resource.is_cache_busted() {
            url.query_pairs_mut().append_pair("t", &cache_buster());
        }
        Ok(url)
    }
}

impl FeedSource for HttpFeedSource {
    #[instrument(level = "debug", skip_all, fields(%resource))]
    async fn fetch(&self, resource: &Resource) -> Result<String, FetchError> {
        let url = self.url_for(resource)?;
        let transport = |source: reqwest::Error| FetchError::Transport {
            resource: resource.path(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                resource: resource.path(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                resource: resource.path(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(transport)?;
        debug!(bytes = body.len(), "Fetched resource over HTTP");
        Ok(body)
    }
}

/// Reads resources from a local copy of the site.
#[derive(Debug, Clone)]
pub struct DirFeedSource {
    root: PathBuf,
}

impl DirFeedSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FeedSource for DirFeedSource {
    #[instrument(level = "debug", skip_all, fields(%resource))]
    async fn fetch(&self, resource: &Resource) -> Result<String, FetchError> {
        let path = self.root.join(resource.path());
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => {
                debug!(path = %path.display(), bytes = body.len(), "Read resource from disk");
                Ok(body)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::NotFound {
                resource: resource.path(),
            }),
            Err(source) => Err(FetchError::Io {
                resource: resource.path(),
                source,
            }),
        }
    }
}

/// A site location given on the command line or in the config file.
#[derive(Debug, Clone)]
pub enum SiteSource {
    Http(HttpFeedSource),
    Dir(DirFeedSource),
}

impl SiteSource {
    pub fn kind(&self) -> &'static str {
        match self {
            SiteSource::Http(_) => "http",
            SiteSource::Dir(_) => "dir",
        }
    }
}

impl FeedSource for SiteSource {
    async fn fetch(&self, resource: &Resource) -> Result<String, FetchError> {
        match self {
            SiteSource::Http(source) => source.fetch(resource).await,
            SiteSource::Dir(source) => source.fetch(resource).await,
        }
    }
}

/// Open `location` as an HTTP site (`http://`, `https://`) or a directory,
/// with the retry policy from `config`.
pub fn open_source(location: &str, config: &Config) -> Result<RetryFetch<SiteSource>, FetchError> {
    let site = if location.starts_with("http://") || location.starts_with("https://") {
        SiteSource::Http(HttpFeedSource::new(
            location,
            config.request_timeout(),
            &config.user_agent,
        )?)
    } else {
        SiteSource::Dir(DirFeedSource::new(location))
    };
    info!(%location, kind = site.kind(), "Opened feed source");
    Ok(RetryFetch::new(site, config.max_retries, config.retry_base_delay())
        .with_max_delay(config.retry_max_delay()))
}

/// Wrapper that adds exponential backoff retry logic to any [`FeedSource`].
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=max_jitter)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
    max_jitter: Duration,
}

impl<T> RetryFetch<T>
where
    T: FeedSource,
{
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
            max_jitter: Duration::from_millis(250),
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn delay_for(&self, attempt: usize) -> Duration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=self.max_jitter.as_millis() as u64);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> FeedSource for RetryFetch<T>
where
    T: FeedSource,
{
    #[instrument(level = "info", skip_all, fields(%resource))]
    async fn fetch(&self, resource: &Resource) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(resource).await {
                Ok(body) => return Ok(body),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "fetch exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MemorySource;
    use super::*;
    use wiremock::matchers::{method, path, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn http_source(server: &MockServer) -> HttpFeedSource {
        HttpFeedSource::new(&server.uri(), Duration::from_secs(5), "daily_brief-test").unwrap()
    }

    #[test]
    fn test_resource_paths() {
        assert_eq!(Resource::Primary.path(), "data/news.json");
        assert_eq!(Resource::Archive.path(), "data/news_archive.json");
        assert_eq!(Resource::ArchiveIndex.path(), "data/archive_index.json");
        assert_eq!(
            Resource::archive_month("2026_02").unwrap().path(),
            "data/archive_2026_02.json"
        );
    }

    #[test]
    fn test_archive_month_rejects_path_traversal() {
        assert!(Resource::archive_month("../secrets").is_err());
        assert!(Resource::archive_month("2026/02").is_err());
        assert!(Resource::archive_month("").is_err());
    }

    #[test]
    fn test_archive_month_requires_year_and_month_key() {
        for id in ["2026_2", "2026-02", "latest", "26_02", "2026_02x"] {
            assert!(Resource::archive_month(id).is_err(), "{id} should be rejected");
        }
        assert!(Resource::archive_month("2025_12").is_ok());
    }

    #[test]
    fn test_url_for_adds_cache_buster_except_for_months() {
        let source =
            HttpFeedSource::new("https://site.example/brief", Duration::from_secs(1), "t").unwrap();

        let primary = source.url_for(&Resource::Primary).unwrap();
        assert_eq!(primary.path(), "/brief/data/news.json");
        assert!(primary.query_pairs().any(|(k, _)| k == "t"));

        let month = source
            .url_for(&Resource::archive_month("2026_01").unwrap())
            .unwrap();
        assert_eq!(month.path(), "/brief/data/archive_2026_01.json");
        assert_eq!(month.query(), None);
    }

    #[tokio::test]
    async fn test_http_source_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/news.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"items":[]}"#))
            .mount(&server)
            .await;

        let body = http_source(&server).fetch(&Resource::Primary).await.unwrap();
        assert_eq!(body, r#"{"items":[]}"#);
    }

    #[tokio::test]
    async fn test_http_source_month_has_no_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/archive_2026_02.json"))
            .and(query_param_is_missing("t"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"items":[]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let month = Resource::archive_month("2026_02").unwrap();
        assert!(http_source(&server).fetch(&month).await.is_ok());
    }

    #[tokio::test]
    async fn test_http_source_maps_404_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = http_source(&server)
            .fetch(&Resource::ArchiveIndex)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_http_source_maps_server_error_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = http_source(&server).fetch(&Resource::Archive).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 502, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_dir_source_reads_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/news.json"), r#"{"items":[]}"#).unwrap();

        let source = DirFeedSource::new(dir.path());
        assert_eq!(
            source.fetch(&Resource::Primary).await.unwrap(),
            r#"{"items":[]}"#
        );
        let err = source.fetch(&Resource::Archive).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/news.json"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/news.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"items":[]}"#))
            .mount(&server)
            .await;

        let source = RetryFetch::new(http_source(&server), 3, Duration::from_millis(1))
            .with_max_jitter(Duration::ZERO);
        assert!(source.fetch(&Resource::Primary).await.is_ok());
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let inner = MemorySource::new().with_status(&Resource::Primary, 503);
        let source = RetryFetch::new(inner, 2, Duration::from_millis(1))
            .with_max_jitter(Duration::ZERO);

        let err = source.fetch(&Resource::Primary).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
        assert_eq!(source.inner().calls_for(&Resource::Primary), 3);
    }

    #[tokio::test]
    async fn test_retry_does_not_retry_not_found() {
        let inner = MemorySource::new();
        let source = RetryFetch::new(inner, 5, Duration::from_millis(1));

        let err = source.fetch(&Resource::Archive).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(source.inner().calls_for(&Resource::Archive), 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        let source = RetryFetch::new(MemorySource::new(), 10, Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(300))
            .with_max_jitter(Duration::ZERO);
        assert_eq!(source.delay_for(1), Duration::from_millis(100));
        assert_eq!(source.delay_for(2), Duration::from_millis(200));
        assert_eq!(source.delay_for(3), Duration::from_millis(300));
        assert_eq!(source.delay_for(9), Duration::from_millis(300));
    }

    #[test]
    fn test_open_source_picks_kind() {
        let config = Config::default();
        let http = open_source("https://site.example/", &config).unwrap();
        assert!(matches!(http.inner(), SiteSource::Http(_)));

        let dir = open_source("./public", &config).unwrap();
        assert!(matches!(dir.inner(), SiteSource::Dir(_)));
    }
}
