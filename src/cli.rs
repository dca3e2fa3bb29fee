//! Command-line interface definitions for Daily Brief.
//!
//! This module defines the CLI arguments and subcommands using the `clap` crate.
//! Global options can also be provided via environment variables.

use clap::{Parser, Subcommand};
use daily_brief::ALL_CATEGORIES;

/// Command-line arguments for the Daily Brief reader.
///
/// # Examples
///
/// ```sh
/// # Front page of a published site
/// daily_brief --source https://briefing.example.org/ latest
///
/// # Only one category, from a local checkout of the site
/// daily_brief --source ./site latest --category Finance
///
/// # Reveal two batches of older news
/// daily_brief more --batches 2
///
/// # Browse an archived month
/// daily_brief month 2026_02
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Site root: a base URL or a directory containing `data/`
    #[arg(short, long, env = "DAILY_BRIEF_SOURCE")]
    pub source: Option<String>,

    /// Optional path to a config.yaml file
    #[arg(short, long, env = "DAILY_BRIEF_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Show the current edition
    Latest {
        /// Only show items whose category contains this text
        #[arg(long, default_value = ALL_CATEGORIES)]
        category: String,
    },
    /// Show the current edition, then load older news from the archive
    More {
        #[arg(long, default_value = ALL_CATEGORIES)]
        category: String,
        /// How many "load more" rounds to run
        #[arg(short, long, default_value_t = 1)]
        batches: usize,
    },
    /// List archived months
    Months,
    /// Show one archived month
    Month {
        /// Month key from `months`, e.g. 2026_02
        id: String,
    },
    /// Show the full report for one item of the current edition
    Show {
        /// Exact title of the item
        title: String,
    },
}
