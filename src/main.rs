//! # Daily Brief
//!
//! Terminal front end for a static news-briefing site. It loads the current
//! edition, filters it by category, reveals older news from the archive in
//! batches and browses archived months.
//!
//! ## Usage
//!
//! ```sh
//! daily_brief --source https://briefing.example.org/ latest
//! daily_brief --source ./site more --batches 2
//! ```
//!
//! Rendered output goes to stdout; logs go to stderr (`RUST_LOG` controls the level).

use clap::Parser;
use daily_brief::render::{Renderer, render_archive_index};
use daily_brief::source::{RetryFetch, SiteSource};
use daily_brief::{Config, FeedAggregator, FeedError, LoadMore, open_source};
use std::error::Error;
use std::process::ExitCode;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::{Cli, Command};

type Aggregator = FeedAggregator<RetryFetch<SiteSource>>;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args.source, ?args.config, ?args.command, "Parsed CLI arguments");

    let mut config = match &args.config {
        Some(path) => Config::load(path).await?,
        None => Config::default(),
    };
    if let Some(source) = args.source {
        config.source = source;
    }

    let source = open_source(&config.source, &config)?;
    let mut aggregator = FeedAggregator::new(source, &config);
    let renderer = Renderer::new(&config.fallback_images);

    let outcome = run(&mut aggregator, &renderer, args.command).await;

    let elapsed = start_time.elapsed();
    match outcome {
        Ok(()) => {
            info!(?elapsed, "Done");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(error = %e, ?elapsed, "Command failed");
            Ok(report_failure(&e))
        }
    }
}

#[instrument(level = "info", skip(aggregator, renderer))]
async fn run(
    aggregator: &mut Aggregator,
    renderer: &Renderer<'_>,
    command: Command,
) -> Result<(), FeedError> {
    match command {
        Command::Latest { category } => {
            show_front_page(aggregator, renderer, &category).await?;
        }
        Command::More { category, batches } => {
            show_front_page(aggregator, renderer, &category).await?;
            for round in 1..=batches {
                match aggregator.load_more().await? {
                    LoadMore::Batch {
                        added,
                        refiltered,
                        remaining,
                    } => {
                        info!(round, added = added.len(), remaining, "Loaded older news");
                        println!("\n== Older news (round {round}) ==\n");
                        match refiltered {
                            // A filtered view is re-rendered in full, like the site does.
                            Some(visible) => println!("{}", renderer.render_cards(&visible)),
                            None => println!("{}", renderer.render_cards(&added)),
                        }
                        if remaining == 0 {
                            println!("All news loaded.");
                            break;
                        }
                    }
                    LoadMore::Exhausted => {
                        println!("\nNo older news to load.");
                        break;
                    }
                }
            }
        }
        Command::Months => {
            let months = aggregator.load_archive_index().await?;
            print!("{}", render_archive_index(&months));
        }
        Command::Month { id } => {
            let label = month_label(aggregator, &id).await;
            let items = aggregator.load_archive_month(&id).await?;
            print!("{}", renderer.render_month(&label, items));
        }
        Command::Show { title } => {
            aggregator.load_primary().await?;
            match aggregator.find(&title) {
                Some(item) => print!("{}", renderer.render_detail(item)),
                None => {
                    warn!(%title, "No item with that title in the current edition");
                    println!("No item titled {title:?} in the current edition.");
                }
            }
        }
    }
    Ok(())
}

async fn show_front_page(
    aggregator: &mut Aggregator,
    renderer: &Renderer<'_>,
    category: &str,
) -> Result<(), FeedError> {
    aggregator.load_primary().await?;
    let visible = aggregator.apply_filter(category);
    print!(
        "{}",
        renderer.render_feed(
            aggregator.state().meta(),
            &visible,
            category,
            aggregator.load_more_visible(),
        )
    );
    Ok(())
}

/// Display name for a month from the index, falling back to its id.
async fn month_label(aggregator: &Aggregator, id: &str) -> String {
    match aggregator.load_archive_index().await {
        Ok(months) => months
            .into_iter()
            .find(|m| m.id == id)
            .map(|m| m.name)
            .unwrap_or_else(|| id.to_string()),
        Err(e) => {
            debug!(error = %e, "Archive index unavailable; using month id as label");
            id.to_string()
        }
    }
}

/// Print the user-facing message once and pick the exit status.
fn report_failure(error: &FeedError) -> ExitCode {
    eprintln!("{}", user_message(error));
    ExitCode::FAILURE
}

fn user_message(error: &FeedError) -> String {
    match error {
        FeedError::FeedUnavailable(_) => {
            "Could not load the news report. Please try again later.".to_string()
        }
        FeedError::ArchiveUnavailable(_) => {
            "Could not load older news. Run the command again to retry.".to_string()
        }
        FeedError::ArchiveMonthNotFound { month_id, .. } => {
            format!("Archive file not found ({month_id}).")
        }
        FeedError::ArchiveIndexUnavailable(_) => "Could not load the archive list.".to_string(),
    }
}
