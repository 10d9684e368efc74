use crate::browser::{ChromeBrowser, ThreadSleep};
use crate::config::ScrapeConfig;
use crate::logging::SessionLog;
use crate::scraper::{CrawlContext, Crawler, Pacer};
use crate::sink::FileSink;
use anyhow::Context;
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

mod browser;
mod config;
mod domain;
mod errors;
mod logging;
mod scraper;
mod sink;

#[cfg(test)]
mod tests;

/// Collects dog parks (Hundewiesen) from Google Maps into CSV and JSON.
#[derive(Debug, Parser)]
#[command(name = "hundepark_scraper", version)]
struct Cli {
    /// JSON config file; omitted fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// City to crawl. Repeat for several; replaces the configured list.
    #[arg(long = "city", value_name = "CITY")]
    cities: Vec<String>,

    /// Output directory.
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[arg(long)]
    no_screenshots: bool,

    /// Open at most this many listings per query.
    #[arg(long, value_name = "N")]
    max_per_query: Option<usize>,

    /// Ignore rows already in the output CSV instead of resuming from them.
    #[arg(long)]
    fresh: bool,
}

impl Cli {
    fn apply(&self, config: &mut ScrapeConfig) {
        if !self.cities.is_empty() {
            config.cities = self.cities.clone();
        }
        if let Some(out) = &self.out {
            config.output_dir = out.clone();
        }
        if self.no_screenshots {
            config.screenshots = false;
        }
        if self.max_per_query.is_some() {
            config.max_listings_per_query = self.max_per_query;
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = ScrapeConfig::load(cli.config.as_deref()).context("Loading configuration")?;
    cli.apply(&mut config);
    config.validate()?;

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("Creating output directory {}", config.output_dir.display())
    })?;
    logging::init(&config.log_path())?;

    let session = SessionLog::start();
    let result = run(&config, cli.fresh);
    if let Err(e) = &result {
        error!("Error during scraping: {e:#}");
    }
    drop(session);

    result
}

fn run(config: &ScrapeConfig, fresh: bool) -> anyhow::Result<()> {
    let mut sink = FileSink::from_config(config);
    info!(
        "Writing records to {} (JSON mirror: {})",
        sink.csv_path().display(),
        sink.json_path().display()
    );
    let mut ctx = if fresh {
        CrawlContext::default()
    } else {
        CrawlContext::resume(sink.load_existing().context("Reading existing records")?)
    };
    info!(
        "Crawling {} cities with {} query phrasings, next id {}",
        config.cities.len(),
        config.query_templates.len(),
        ctx.next_id()
    );

    let mut browser = ChromeBrowser::launch(&config.browser).context("Starting Chrome")?;

    let outcome = {
        let mut pause = ThreadSleep;
        let mut crawler = Crawler::new(
            config,
            &mut browser,
            &mut sink,
            &mut pause,
            Pacer::from_entropy(config.pacing),
            Local::now().date_naive(),
        );
        crawler.run(&mut ctx, &config.cities)
    };

    // Chrome goes away whether or not the crawl succeeded.
    browser.quit();

    let summary = outcome.context("Crawl aborted")?;
    summary.log();
    Ok(())
}
