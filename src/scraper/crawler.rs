// src/scraper/crawler.rs
use crate::browser::{wait_for_selector, Browser, Pause};
use crate::config::{
    render_query, secs_to_duration, DelayRange, PacingPolicy, ScrapeConfig, MAX_WAIT_SECS,
};
use crate::errors::ScraperError;
use crate::scraper::discovery::{Discovery, ListingHandle, Tier};
use crate::scraper::extractor::{Extractor, PageSnapshot};
use crate::scraper::models::{IdAllocator, ListingRecord};
use crate::sink::RecordSink;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Present once a listing's detail pane has rendered.
pub const DETAIL_READY: &str = "h1";

/// State shared across the whole run: the id counter, names already claimed
/// in each city, and every record collected so far.
#[derive(Debug, Default)]
pub struct CrawlContext {
    ids: IdAllocator,
    claimed: HashMap<String, HashSet<String>>,
    records: Vec<ListingRecord>,
}

impl CrawlContext {
    /// Seeds the context with records persisted by an earlier run.
    pub fn resume(existing: Vec<ListingRecord>) -> Self {
        let mut ctx = Self::default();
        for record in existing {
            ctx.ids.skip_past(record.id);
            ctx.claim(&record.city, &record.name);
            ctx.records.push(record);
        }
        ctx
    }

    pub fn is_claimed(&self, city: &str, name: &str) -> bool {
        self.claimed
            .get(city)
            .is_some_and(|names| names.contains(name))
    }

    fn claim(&mut self, city: &str, name: &str) {
        self.claimed
            .entry(city.to_string())
            .or_default()
            .insert(name.to_string());
    }

    pub fn records(&self) -> &[ListingRecord] {
        &self.records
    }

    pub fn next_id(&self) -> u64 {
        self.ids.peek()
    }
}

/// Randomised politeness delays drawn from the configured ranges.
pub struct Pacer {
    policy: PacingPolicy,
    rng: StdRng,
}

/// Keeps unvalidated bounds inside what the rng can sample.
fn clamp_wait(secs: f64) -> f64 {
    if secs.is_nan() {
        0.0
    } else {
        secs.clamp(0.0, MAX_WAIT_SECS)
    }
}

impl Pacer {
    pub fn new(policy: PacingPolicy, rng: StdRng) -> Self {
        Self { policy, rng }
    }

    pub fn from_entropy(policy: PacingPolicy) -> Self {
        Self::new(policy, StdRng::from_entropy())
    }

    fn sample(&mut self, range: DelayRange) -> Duration {
        let (min, max) = (clamp_wait(range.min), clamp_wait(range.max));
        if min >= max {
            return secs_to_duration(min);
        }
        secs_to_duration(self.rng.gen_range(min..=max))
    }

    pub fn query_delay(&mut self) -> Duration {
        self.sample(self.policy.query_delay_secs)
    }

    pub fn city_delay(&mut self) -> Duration {
        self.sample(self.policy.city_delay_secs)
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub per_city: Vec<(String, usize)>,
    pub total: usize,
}

impl RunSummary {
    pub fn log(&self) {
        for (city, count) in &self.per_city {
            info!("  {city}: {count} new dog parks");
        }
        info!("Total records on file: {}", self.total);
    }
}

/// Walks cities and query phrasings, opens each new listing, and hands the
/// extracted records to the sink one by one.
///
/// Failures stay local: a field failure blanks the field, a listing failure
/// skips the listing, a query failure skips the query. Only sink snapshot
/// failures end the run.
pub struct Crawler<'a> {
    config: &'a ScrapeConfig,
    browser: &'a mut dyn Browser,
    sink: &'a mut dyn RecordSink,
    pause: &'a mut dyn Pause,
    pacer: Pacer,
    extractor: Extractor,
    today: NaiveDate,
}

impl<'a> Crawler<'a> {
    pub fn new(
        config: &'a ScrapeConfig,
        browser: &'a mut dyn Browser,
        sink: &'a mut dyn RecordSink,
        pause: &'a mut dyn Pause,
        pacer: Pacer,
        today: NaiveDate,
    ) -> Self {
        Self {
            config,
            browser,
            sink,
            pause,
            pacer,
            extractor: Extractor::default(),
            today,
        }
    }

    #[cfg(test)]
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Crawls every city in order, snapshotting after each one and once more
    /// at the end.
    pub fn run(
        &mut self,
        ctx: &mut CrawlContext,
        cities: &[String],
    ) -> Result<RunSummary, ScraperError> {
        let mut summary = RunSummary::default();
        let cities: Vec<&str> = cities
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();

        for (i, city) in cities.iter().enumerate() {
            info!("Starting data collection for {city}");
            let found = self.crawl_city(ctx, city);
            summary.per_city.push((city.to_string(), found.len()));

            self.sink.snapshot(ctx.records())?;

            if i + 1 < cities.len() {
                let delay = self.pacer.city_delay();
                info!("Waiting for {:.2} seconds before next city", delay.as_secs_f64());
                self.pause.pause(delay);
            }
        }

        info!("Data collection completed for all cities");
        self.sink.snapshot(ctx.records())?;

        summary.total = ctx.records().len();
        Ok(summary)
    }

    /// Runs every query phrasing for `city` and returns the records added.
    pub fn crawl_city(&mut self, ctx: &mut CrawlContext, city: &str) -> Vec<ListingRecord> {
        info!("Searching for dog parks in {city}");
        let start = ctx.records.len();
        let config = self.config;
        let templates = &config.query_templates;

        for (i, template) in templates.iter().enumerate() {
            let query = render_query(template, city);
            info!("Using search query: '{query}'");

            if let Err(e) = self.crawl_query(ctx, city, &query) {
                error!("Error during search for '{query}': {e}");
            }

            if i + 1 < templates.len() {
                let delay = self.pacer.query_delay();
                info!("Waiting for {:.2} seconds before next query", delay.as_secs_f64());
                self.pause.pause(delay);
            }
        }

        let found = ctx.records[start..].to_vec();
        info!(
            "Completed search for {city}. Found {} unique dog parks.",
            found.len()
        );
        found
    }

    fn crawl_query(
        &mut self,
        ctx: &mut CrawlContext,
        city: &str,
        query: &str,
    ) -> Result<(), ScraperError> {
        let handles =
            Discovery::new(self.config).discover(&mut *self.browser, &mut *self.pause, query)?;
        let cap = self.config.max_listings_per_query.unwrap_or(usize::MAX);

        for handle in handles.into_iter().take(cap) {
            if ctx.is_claimed(city, &handle.name) {
                debug!("Skipping already processed park: {}", handle.name);
                continue;
            }
            // Claimed before the attempt: a listing that fails is not retried
            // when another query surfaces it again.
            ctx.claim(city, &handle.name);

            info!("Processing park: {}", handle.name);
            if let Err(e) = self.open_listing(&handle) {
                warn!("Error processing park element '{}': {e}", handle.name);
                if self.browser.find(handle.tier.marker())?.is_none() {
                    self.return_to_results(query, handle.tier)?;
                }
                continue;
            }
            if let Err(e) = self.extract_and_store(ctx, city, &handle) {
                warn!("Error processing park element '{}': {e}", handle.name);
            }

            // Without the results view every remaining handle would fail and
            // stay claimed, so a lost view ends the query instead.
            self.return_to_results(query, handle.tier)?;
        }
        Ok(())
    }

    fn open_listing(&mut self, handle: &ListingHandle) -> Result<(), ScraperError> {
        let readiness = self.config.readiness;

        self.browser.click(&handle.node)?;
        let opened = wait_for_selector(
            &mut *self.browser,
            &mut *self.pause,
            DETAIL_READY,
            readiness.detail(),
            readiness.poll(),
        )?;
        if !opened {
            debug!("Detail view for '{}' not confirmed, reading anyway", handle.name);
        }
        Ok(())
    }

    fn extract_and_store(
        &mut self,
        ctx: &mut CrawlContext,
        city: &str,
        handle: &ListingHandle,
    ) -> Result<(), ScraperError> {
        let snapshot = PageSnapshot::capture(&mut *self.browser)?;
        let Some(record) =
            self.extractor
                .extract(&snapshot, &handle.name, city, &mut ctx.ids, self.today)
        else {
            return Ok(());
        };

        if self.config.screenshots {
            self.save_screenshot(record.id);
        }

        ctx.records.push(record.clone());
        self.sink.append(&record)?;
        info!("Stored park #{}: {}", record.id, record.name);
        Ok(())
    }

    fn save_screenshot(&mut self, id: u64) {
        let dir = self.config.screenshot_dir();
        let path = dir.join(format!("park_{id}.png"));

        let saved = std::fs::create_dir_all(&dir)
            .map_err(ScraperError::from)
            .and_then(|_| self.browser.screenshot(&path));
        match saved {
            Ok(()) => debug!("Saved screenshot to {}", path.display()),
            Err(e) => warn!("Could not save screenshot for park #{id}: {e}"),
        }
    }

    /// Goes back to the results of `query`. When history navigation does not
    /// bring the results back within the ceiling, the search is loaded again
    /// (with its scroll cycles, so listing positions line up).
    fn return_to_results(&mut self, query: &str, tier: Tier) -> Result<(), ScraperError> {
        let readiness = self.config.readiness;
        let marker = tier.marker();

        let back = self.browser.go_back().and_then(|_| {
            wait_for_selector(
                &mut *self.browser,
                &mut *self.pause,
                marker,
                readiness.back(),
                readiness.poll(),
            )
        });
        match back {
            Ok(true) => return Ok(()),
            Ok(false) => warn!("Results for '{query}' did not come back, reloading search"),
            Err(e) => warn!("Going back to results for '{query}' failed ({e}), reloading search"),
        }

        Discovery::new(self.config).discover(&mut *self.browser, &mut *self.pause, query)?;
        if self.browser.find(marker)?.is_none() {
            return Err(ScraperError::Browser(format!(
                "Lost the results view for '{query}'"
            )));
        }
        Ok(())
    }
}
