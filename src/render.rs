//! Plain-text presentation of feed items.
//!
//! The site renders cards, a briefing box, a ticker strip and a detail modal.
//! This module produces the same information as terminal text so the
//! binary can act as the presentation layer for the aggregator.
//!
//! # Card Rules
//!
//! - Time column: `HH:MM` for items published today, `YYYY-MM-DD HH:MM` otherwise
//! - Summary: `summary`, then `description`, then a loading placeholder
//! - Image: `image_url`, else a fallback picked by a stable hash of the title
//! - The first card of a list is the hero card

use crate::aggregator::FeedMeta;
use crate::models::{ArchiveMonth, IndexQuote, NewsItem};
use crate::utils::stable_index;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use std::fmt::Write;

pub const DEFAULT_CATEGORY_LABEL: &str = "Economy";
const SUMMARY_PLACEHOLDER: &str = "Loading summary...";
const DETAIL_PLACEHOLDER: &str = "The full report is being prepared.";
const UNKNOWN_SOURCE: &str = "Unknown";
const UNKNOWN_TIME: &str = "--:--";

/// Formats items relative to a fixed clock and a fallback image set.
#[derive(Debug, Clone)]
pub struct Renderer<'a> {
    now: NaiveDateTime,
    fallback_images: &'a [String],
}

impl<'a> Renderer<'a> {
    /// A renderer using the current UTC date and time, the same day boundary
    /// the site's own pages use.
    pub fn new(fallback_images: &'a [String]) -> Self {
        Self::at(Utc::now().naive_utc(), fallback_images)
    }

    pub fn at(now: NaiveDateTime, fallback_images: &'a [String]) -> Self {
        Self {
            now,
            fallback_images,
        }
    }

    fn today(&self) -> NaiveDate {
        self.now.date()
    }

    /// Short publication time for a card.
    pub fn display_time(&self, published_at: Option<&str>) -> String {
        let mut parts = published_at.unwrap_or_default().split(' ');
        let date_part = parts.next().unwrap_or_default();
        let time_part: String = match parts.next() {
            Some(time) if !time.is_empty() => time.chars().take(5).collect(),
            _ => UNKNOWN_TIME.to_string(),
        };

        let today = self.today().format("%Y-%m-%d").to_string();
        if date_part == today || date_part.is_empty() {
            time_part
        } else {
            format!("{date_part} {time_part}")
        }
    }

    /// Image for a card: the item's own, else a stable fallback.
    pub fn card_image<'i>(&'i self, item: &'i NewsItem) -> Option<&'i str> {
        item.image_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .or_else(|| self.fallback_image(&item.title))
    }

    pub fn fallback_image(&self, title: &str) -> Option<&'a str> {
        stable_index(title, self.fallback_images.len()).map(|i| self.fallback_images[i].as_str())
    }

    /// One card. `index` is the position in the rendered list.
    pub fn render_card(&self, item: &NewsItem, index: usize) -> String {
        let mut out = String::new();
        let marker = if index == 0 { "★" } else { "•" };
        writeln!(
            out,
            "{marker} [{}] {}  {}",
            card_category(item),
            self.display_time(item.published_at.as_deref()),
            item.title
        ).unwrap();
        writeln!(out, "    {}", card_summary(item)).unwrap();
        if let Some(image) = self.card_image(item) {
            writeln!(out, "    image: {image}").unwrap();
        }
        out
    }

    /// Cards for a list, or the empty-category message.
    pub fn render_cards(&self, items: &[NewsItem]) -> String {
        if items.is_empty() {
            return "No news in this category.\n".to_string();
        }
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.render_card(item, i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The live front page: update stamp, briefing, ticker, then cards.
    pub fn render_feed(
        &self,
        meta: &FeedMeta,
        items: &[NewsItem],
        category: &str,
        load_more: bool,
    ) -> String {
        let mut out = String::new();
        if let Some(stamp) = meta.last_updated.as_deref() {
            writeln!(out, "Last updated: {stamp}").unwrap();
        }
        if let Some(briefing) = meta.briefing.as_deref() {
            writeln!(out, "\n== Today's briefing ==\n{briefing}").unwrap();
        }
        if !meta.indices.is_empty() {
            writeln!(out, "\n{}", render_ticker(&meta.indices)).unwrap();
        }
        writeln!(out, "\n== News ({category}) ==\n").unwrap();
        out.push_str(&self.render_cards(items));
        if load_more {
            out.push_str("\n(more news available: run `more`)\n");
        }
        out
    }

    /// The detail view for one item.
    pub fn render_detail(&self, item: &NewsItem) -> String {
        let mut out = String::new();
        let date = item
            .published_at
            .clone()
            .unwrap_or_else(|| self.now.format("%Y-%m-%d %H:%M").to_string());
        let title = if item.title.is_empty() {
            "No Title"
        } else {
            item.title.as_str()
        };

        writeln!(out, "{title}").unwrap();
        writeln!(out, "{date}").unwrap();
        if let Some(image) = self.card_image(item) {
            writeln!(out, "image: {image}").unwrap();
        }
        out.push('\n');
        for paragraph in detail_content(item).split("\n\n") {
            writeln!(out, "{}\n", paragraph.trim_end()).unwrap();
        }
        writeln!(out, "---").unwrap();
        writeln!(
            out,
            "Source: {}",
            item.source.as_deref().unwrap_or(UNKNOWN_SOURCE)
        ).unwrap();
        if let Some(link) = item.external_link() {
            writeln!(out, "Read the original: {link}").unwrap();
        }
        out
    }

    /// Header and cards for an archived month.
    pub fn render_month(&self, label: &str, items: &[NewsItem]) -> String {
        if items.is_empty() {
            return format!("No news saved for {label}.\n");
        }
        format!("News archive for {label}\n\n{}", self.render_cards(items))
    }
}

/// Category label shown on a card.
pub fn card_category(item: &NewsItem) -> &str {
    item.category
        .as_deref()
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CATEGORY_LABEL)
}

/// Summary line shown on a card.
pub fn card_summary(item: &NewsItem) -> &str {
    first_present(&[item.summary.as_deref(), item.description.as_deref()])
        .unwrap_or(SUMMARY_PLACEHOLDER)
}

/// Body text of the detail view.
pub fn detail_content(item: &NewsItem) -> &str {
    first_present(&[item.content.as_deref(), item.description.as_deref()])
        .unwrap_or(DETAIL_PLACEHOLDER)
}

/// Single-line ticker: `NAME VALUE ▲CHANGE | ...`.
pub fn render_ticker(indices: &[IndexQuote]) -> String {
    indices
        .iter()
        .map(|quote| {
            let arrow = if quote.is_up { "▲" } else { "▼" };
            format!("{} {} {arrow}{}", quote.name, quote.value, quote.change)
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Month list for the archive menu.
pub fn render_archive_index(months: &[ArchiveMonth]) -> String {
    if months.is_empty() {
        return "No archived news yet.\n".to_string();
    }
    let mut out = String::new();
    for month in months {
        writeln!(out, "{}\t{}", month.id, month.name).unwrap();
    }
    out
}

fn first_present<'a>(candidates: &[Option<&'a str>]) -> Option<&'a str> {
    candidates
        .iter()
        .flatten()
        .copied()
        .find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 14)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn images() -> Vec<String> {
        (0..10).map(|i| format!("https://img.example/{i}.jpg")).collect()
    }

    fn item(title: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_uses_utc_day() {
        let before = Utc::now().date_naive();
        let renderer = Renderer::new(&[]);
        let today = renderer.today();
        let after = Utc::now().date_naive();
        assert!(today == before || today == after);
    }

    #[test]
    fn test_display_time_today_shows_only_time() {
        let imgs = images();
        let r = Renderer::at(clock(), &imgs);
        assert_eq!(r.display_time(Some("2026-02-14 08:30:12")), "08:30");
    }

    #[test]
    fn test_display_time_other_day_shows_date() {
        let imgs = images();
        let r = Renderer::at(clock(), &imgs);
        assert_eq!(r.display_time(Some("2026-02-13 23:05:00")), "2026-02-13 23:05");
    }

    #[test]
    fn test_display_time_without_time_part() {
        let imgs = images();
        let r = Renderer::at(clock(), &imgs);
        assert_eq!(r.display_time(Some("2026-02-13")), "2026-02-13 --:--");
        assert_eq!(r.display_time(None), "--:--");
    }

    #[test]
    fn test_summary_fallbacks() {
        let mut news = item("A");
        assert_eq!(card_summary(&news), SUMMARY_PLACEHOLDER);
        news.description = Some("desc".to_string());
        assert_eq!(card_summary(&news), "desc");
        news.summary = Some("sum".to_string());
        assert_eq!(card_summary(&news), "sum");
    }

    #[test]
    fn test_category_label_default() {
        let mut news = item("A");
        assert_eq!(card_category(&news), DEFAULT_CATEGORY_LABEL);
        news.category = Some("Tech".to_string());
        assert_eq!(card_category(&news), "Tech");
    }

    #[test]
    fn test_fallback_image_is_stable_per_title() {
        let imgs = images();
        let r = Renderer::at(clock(), &imgs);
        // "a" hashes to 97.
        assert_eq!(r.fallback_image("a"), Some("https://img.example/7.jpg"));
        assert_eq!(r.fallback_image("Rates hold"), r.fallback_image("Rates hold"));

        let none: Vec<String> = Vec::new();
        assert_eq!(Renderer::at(clock(), &none).fallback_image("a"), None);
    }

    #[test]
    fn test_card_image_prefers_item_url() {
        let imgs = images();
        let r = Renderer::at(clock(), &imgs);
        let mut news = item("a");
        assert_eq!(r.card_image(&news), Some("https://img.example/7.jpg"));
        news.image_url = Some("https://own.example/x.png".to_string());
        assert_eq!(r.card_image(&news), Some("https://own.example/x.png"));
    }

    #[test]
    fn test_render_cards_marks_hero_and_handles_empty() {
        let imgs = images();
        let r = Renderer::at(clock(), &imgs);
        let text = r.render_cards(&[item("First"), item("Second")]);
        assert!(text.starts_with("★ [Economy] --:--  First"));
        assert!(text.contains("• [Economy] --:--  Second"));
        assert_eq!(r.render_cards(&[]), "No news in this category.\n");
    }

    #[test]
    fn test_render_feed_sections() {
        let imgs = images();
        let r = Renderer::at(clock(), &imgs);
        let meta = FeedMeta {
            last_updated: Some("2026-02-14 09:00:00".to_string()),
            briefing: Some("Stocks rose.".to_string()),
            indices: vec![IndexQuote {
                name: "KOSPI".to_string(),
                value: "2,600".to_string(),
                change: "+0.5%".to_string(),
                is_up: true,
            }],
        };
        let text = r.render_feed(&meta, &[item("A")], "all", true);
        assert!(text.contains("Last updated: 2026-02-14 09:00:00"));
        assert!(text.contains("Stocks rose."));
        assert!(text.contains("KOSPI 2,600 ▲+0.5%"));
        assert!(text.contains("== News (all) =="));
        assert!(text.contains("more news available"));
    }

    #[test]
    fn test_render_detail_link_only_when_http() {
        let imgs = images();
        let r = Renderer::at(clock(), &imgs);
        let mut news = item("Rates");
        news.content = Some("Para one.\n\nPara two.".to_string());
        news.link = Some("ftp://nope".to_string());

        let text = r.render_detail(&news);
        assert!(text.contains("2026-02-14 10:00"));
        assert!(text.contains("Para one.\n\nPara two."));
        assert!(text.contains("Source: Unknown"));
        assert!(!text.contains("Read the original"));

        news.link = Some("https://example.com/rates".to_string());
        news.source = Some("Wire".to_string());
        let text = r.render_detail(&news);
        assert!(text.contains("Source: Wire"));
        assert!(text.contains("Read the original: https://example.com/rates"));
    }

    #[test]
    fn test_render_detail_placeholders() {
        let imgs = images();
        let r = Renderer::at(clock(), &imgs);
        let text = r.render_detail(&item(""));
        assert!(text.starts_with("No Title\n"));
        assert!(text.contains(DETAIL_PLACEHOLDER));
    }

    #[test]
    fn test_render_archive_index() {
        assert_eq!(render_archive_index(&[]), "No archived news yet.\n");
        let months = vec![ArchiveMonth {
            id: "2026_02".to_string(),
            name: "February 2026".to_string(),
        }];
        assert_eq!(render_archive_index(&months), "2026_02\tFebruary 2026\n");
    }

    #[test]
    fn test_render_month_empty() {
        let imgs = images();
        let r = Renderer::at(clock(), &imgs);
        assert_eq!(r.render_month("2026_02", &[]), "No news saved for 2026_02.\n");
        assert!(r.render_month("2026_02", &[item("M")]).starts_with("News archive for 2026_02"));
    }

    #[test]
    fn test_ticker_down_arrow() {
        let quotes = vec![IndexQuote {
            name: "NASDAQ".to_string(),
            value: "16,000".to_string(),
            change: "-1.2%".to_string(),
            is_up: false,
        }];
        assert_eq!(render_ticker(&quotes), "NASDAQ 16,000 ▼-1.2%");
    }
}
