//! Data models for the feed documents published by the briefing site.
//!
//! This module defines the shapes the static site writes under `data/`:
//! - [`NewsItem`]: One news entry, keyed by its title
//! - [`FeedDocument`]: Any fetched feed (primary, archive buffer, archive month)
//! - [`IndexQuote`]: One entry of the market ticker carried by the primary feed
//! - [`ArchiveMonth`]: One entry of the archive month index
//!
//! The site generator writes snake_case keys (`published_at`, `image_url`),
//! so the structs map one-to-one onto the JSON without renames.

use serde::{Deserialize, Deserializer, Serialize};

/// A single news entry as published by the site generator.
///
/// Items are compared for identity by `title` alone; every other field is
/// presentation data. A missing or `null` title deserializes to the empty
/// string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewsItem {
    /// The headline. Unique key used for deduplication.
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Free-form category label (e.g. "Finance", "Tech/Markets").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Short summary shown on the card.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Older feeds carry a description instead of a summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Long-form report shown in the detail view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Publication stamp, `YYYY-MM-DD HH:MM[:SS]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Name of the outlet the story came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Link to the original article.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl NewsItem {
    /// Whether this item belongs to `category` under the site's matching rule.
    ///
    /// The rule is a case-sensitive substring test against the stored
    /// category label. Items without a category never match.
    pub fn matches_category(&self, category: &str) -> bool {
        self.category
            .as_deref()
            .is_some_and(|label| label.contains(category))
    }

    /// The outbound link, only if it is an absolute http(s) URL.
    pub fn external_link(&self) -> Option<&str> {
        self.link.as_deref().filter(|link| link.starts_with("http"))
    }
}

/// The deserialized shape of every feed resource.
///
/// The archive buffer and archive month files only populate `items`; the
/// primary feed also carries the update stamp, briefing and ticker.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FeedDocument {
    #[serde(default)]
    pub items: Vec<NewsItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// Two or three sentence overview of the day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub briefing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Vec<IndexQuote>>,
}

/// One market index shown in the ticker strip.
///
/// The generator has written both strings and bare numbers for `value` and
/// `change`; both are accepted and kept as text. Every field tolerates a
/// missing key or `null`, so a partial quote only degrades the ticker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct IndexQuote {
    #[serde(default, deserialize_with = "string_or_number")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub value: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub change: String,
    /// Direction of the last move; drives the up/down marker.
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_up: bool,
}

/// An entry in `data/archive_index.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArchiveMonth {
    /// File key, e.g. `2026_02` for `data/archive_2026_02.json`.
    pub id: String,
    /// Display label for the month.
    pub name: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected string or number, found {other}"
        ))),
    }
}
