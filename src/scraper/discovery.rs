// src/scraper/discovery.rs
use crate::browser::{wait_for_selector, wait_until, Browser, Node, Pause};
use crate::config::ScrapeConfig;
use crate::errors::ScraperError;
use tracing::{debug, info, warn};
use url::Url;

pub const RESULTS_FEED: &str = "div[role='feed']";
pub const LISTING_HEADING: &str = "div[role='article'] div[role='heading']";
pub const LABELLED_LINK: &str = "a[aria-label]";

/// Label substrings that mark a fallback link as a likely dog park.
pub const DOMAIN_KEYWORDS: [&str; 2] = ["park", "hunde"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Headings inside the results feed.
    Feed,
    /// Any labelled link mentioning a domain keyword.
    LabelFallback,
}

impl Tier {
    /// Present while the results this tier was read from are on screen.
    pub fn marker(self) -> &'static str {
        match self {
            Tier::Feed => LISTING_HEADING,
            Tier::LabelFallback => LABELLED_LINK,
        }
    }
}

/// A listing surfaced by a query: the name it showed and the element to
/// click to open it.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingHandle {
    pub name: String,
    pub node: Node,
    pub tier: Tier,
}

/// `{base}/{query with '+' for spaces}/`, e.g.
/// `https://www.google.com/maps/search/Hundewiese+Berlin/`.
pub fn search_url(base: &str, query: &str) -> Result<Url, ScraperError> {
    let mut url = Url::parse(base)
        .map_err(|e| ScraperError::Config(format!("Invalid search base URL '{base}': {e}")))?;
    let slug = query.split_whitespace().collect::<Vec<_>>().join("+");

    url.path_segments_mut()
        .map_err(|_| ScraperError::Config(format!("Search base URL '{base}' cannot take a path")))?
        .pop_if_empty()
        .push(&slug)
        .push("");
    Ok(url)
}

fn has_domain_keyword(label: &str) -> bool {
    let lower = label.to_lowercase();
    DOMAIN_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Loads the results for one query and materialises listings with a fixed
/// number of scroll cycles. Discovery stops after the last cycle even if the
/// provider has more results.
pub struct Discovery<'a> {
    config: &'a ScrapeConfig,
}

impl<'a> Discovery<'a> {
    pub fn new(config: &'a ScrapeConfig) -> Self {
        Self { config }
    }

    pub fn discover<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        pause: &mut dyn Pause,
        query: &str,
    ) -> Result<Vec<ListingHandle>, ScraperError> {
        let readiness = &self.config.readiness;
        let url = search_url(&self.config.search_base_url, query)?;

        browser.navigate(url.as_str())?;
        info!("Navigated to: {url}");

        let has_feed = wait_for_selector(
            browser,
            pause,
            RESULTS_FEED,
            readiness.results(),
            readiness.poll(),
        )?;

        let feed = if has_feed { browser.find(RESULTS_FEED)? } else { None };
        let handles = match feed {
            Some(feed) => {
                info!("Found results container");
                self.scroll_feed(browser, pause, &feed)?;
                self.feed_listings(browser)?
            }
            None => {
                warn!("Could not find results container, trying alternative approach");
                self.labelled_listings(browser)?
            }
        };

        info!("Found {} potential park listings", handles.len());
        Ok(handles)
    }

    fn scroll_feed<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        pause: &mut dyn Pause,
        feed: &Node,
    ) -> Result<(), ScraperError> {
        let readiness = &self.config.readiness;

        for cycle in 1..=self.config.scroll_cycles {
            let before = browser.find_all(LISTING_HEADING)?.len();
            browser.scroll_to_bottom(feed)?;

            let grew = wait_until(browser, pause, readiness.scroll(), readiness.poll(), |b| {
                Ok(b.find_all(LISTING_HEADING)?.len() > before)
            })?;
            debug!("Scroll cycle {cycle}: {before} listings before, grew: {grew}");
        }
        Ok(())
    }

    fn feed_listings<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
    ) -> Result<Vec<ListingHandle>, ScraperError> {
        Ok(browser
            .find_all(LISTING_HEADING)?
            .into_iter()
            .filter_map(|node| {
                let name = node.text.trim().to_string();
                (!name.is_empty()).then_some(ListingHandle {
                    name,
                    node,
                    tier: Tier::Feed,
                })
            })
            .collect())
    }

    fn labelled_listings<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
    ) -> Result<Vec<ListingHandle>, ScraperError> {
        let links = browser.find_all(LABELLED_LINK)?;
        info!("Found {} potential elements with alternative approach", links.len());

        Ok(links
            .into_iter()
            .filter_map(|node| {
                let label = node.label.as_deref()?.trim().to_string();
                if !has_domain_keyword(&label) {
                    return None;
                }
                debug!("Found potential park: {label}");
                Some(ListingHandle {
                    name: label,
                    node,
                    tier: Tier::LabelFallback,
                })
            })
            .collect())
    }
}
