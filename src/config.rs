//! Runtime configuration.
//!
//! Settings come from an optional YAML file (see [`Config::load`]) and are
//! overridden by command-line flags in `main`. Every field has a default, so
//! an empty file, or no file at all, is a valid configuration.
//!
//! ```yaml
//! source: "https://briefing.example.org/"
//! batch_size: 20
//! load_more_threshold: 50
//! max_retries: 3
//! ```

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

/// Images used for cards whose item carries no `image_url`.
pub const DEFAULT_FALLBACK_IMAGES: [&str; 10] = [
    "https://images.unsplash.com/photo-1611974714028-ac8a49f70659?q=80&w=1024&auto=format&fit=crop",
    "https://images.unsplash.com/photo-1590283603385-17ffb3a7f29f?q=80&w=1024&auto=format&fit=crop",
    "https://images.unsplash.com/photo-1486406146926-c627a92ad1ab?q=80&w=1024&auto=format&fit=crop",
    "https://images.unsplash.com/photo-1451187580459-43490279c0fa?q=80&w=1024&auto=format&fit=crop",
    "https://images.unsplash.com/photo-1518770660439-4636190af475?q=80&w=1024&auto=format&fit=crop",
    "https://images.unsplash.com/photo-1560518883-ce09059eeffa?q=80&w=1024&auto=format&fit=crop",
    "https://images.unsplash.com/photo-1586528116311-ad8dd3c8310d?q=80&w=1024&auto=format&fit=crop",
    "https://images.unsplash.com/photo-1534951009808-766178b47a8e?q=80&w=1024&auto=format&fit=crop",
    "https://images.unsplash.com/photo-1642543492481-44e81e3914a7?q=80&w=1024&auto=format&fit=crop",
    "https://images.unsplash.com/photo-1550565118-c974fb6255f0?q=80&w=1024&auto=format&fit=crop",
];

/// Reader configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Site root: an `http(s)://` base URL or a local directory containing `data/`.
    pub source: String,
    /// Items revealed per "load more".
    pub batch_size: NonZeroUsize,
    /// Minimum number of displayed items before "load more" is offered.
    pub load_more_threshold: usize,
    pub request_timeout_secs: u64,
    /// Extra attempts after a transient fetch failure.
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub user_agent: String,
    pub fallback_images: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: ".".to_string(),
            batch_size: NonZeroUsize::new(20).unwrap_or(NonZeroUsize::MIN),
            load_more_threshold: 50,
            request_timeout_secs: 15,
            max_retries: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 8_000,
            user_agent: concat!("daily_brief/", env!("CARGO_PKG_VERSION")).to_string(),
            fallback_images: DEFAULT_FALLBACK_IMAGES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Load a YAML configuration file. Missing keys take their defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let text = fs::read_to_string(path.as_ref()).await?;
        let config = Self::from_yaml(&text)?;
        info!(source = %config.source, batch_size = config.batch_size.get(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }
}
