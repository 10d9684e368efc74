// src/tests/utils.rs
use crate::browser::{Browser, Node, Pause};
use crate::config::{DelayRange, PacingPolicy, ReadinessPolicy, ScrapeConfig};
use crate::errors::ScraperError;
use crate::scraper::crawler::DETAIL_READY;
use crate::scraper::discovery::{search_url, LABELLED_LINK, LISTING_HEADING, RESULTS_FEED};
use crate::scraper::models::ListingRecord;
use crate::sink::RecordSink;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const QUERY_DELAY: Duration = Duration::from_secs(4);
pub const CITY_DELAY: Duration = Duration::from_secs(15);

/// Fresh directory under the system temp dir.
pub fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "hundepark_{tag}_{}",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 10).unwrap()
}

/// Config with fixed delays and short readiness ceilings. The output dir is
/// never created; tests that write files point it at their own `temp_dir`.
pub fn test_config(cities: &[&str], templates: &[&str]) -> ScrapeConfig {
    ScrapeConfig {
        cities: cities.iter().map(|c| c.to_string()).collect(),
        query_templates: templates.iter().map(|t| t.to_string()).collect(),
        output_dir: std::env::temp_dir().join("hundepark_unused"),
        screenshots: false,
        scroll_cycles: 2,
        pacing: PacingPolicy {
            query_delay_secs: DelayRange::new(4.0, 4.0),
            city_delay_secs: DelayRange::new(15.0, 15.0),
        },
        readiness: ReadinessPolicy {
            results_secs: 0.5,
            detail_secs: 0.5,
            back_secs: 0.5,
            scroll_secs: 0.5,
            poll_ms: 250,
        },
        ..ScrapeConfig::default()
    }
}

pub fn results_url(config: &ScrapeConfig, template: &str, city: &str) -> String {
    let query = crate::config::render_query(template, city);
    search_url(&config.search_base_url, &query)
        .unwrap()
        .to_string()
}

/// Detail pane HTML as the map provider renders it (trimmed to what the
/// extractor reads).
pub fn detail_html(name: &str, address: Option<&str>, phone: Option<&str>, reviews: &[&str]) -> String {
    let mut html = format!("<html><body><h1>{name}</h1>");
    if let Some(address) = address {
        html.push_str(&format!(
            r#"<button data-item-id="address" aria-label="Adresse: {address}"><span class="icon"></span><div>{address}</div></button>"#
        ));
    }
    if let Some(phone) = phone {
        html.push_str(&format!(
            r#"<button data-item-id="phone:tel:{phone}"><div>{phone}</div></button>"#
        ));
    }
    for review in reviews {
        html.push_str(&format!(r#"<div class="fontBodyMedium">{review}</div>"#));
    }
    html.push_str("</body></html>");
    html
}

#[derive(Debug, Clone)]
pub struct FakeListing {
    pub name: String,
    pub html: String,
    pub url: String,
    pub fail_click: bool,
}

impl FakeListing {
    pub fn new(name: &str, address: &str) -> Self {
        Self {
            name: name.to_string(),
            html: detail_html(name, Some(address), Some("030 1234567"), &[]),
            url: format!(
                "https://www.google.com/maps/place/{}/@52.4736,13.4023,17z",
                name.replace(' ', "+")
            ),
            fail_click: false,
        }
    }

    pub fn failing_click(mut self) -> Self {
        self.fail_click = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResultsPage {
    /// Without a feed the page only offers labelled links.
    pub feed: bool,
    pub listings: Vec<FakeListing>,
    /// Labelled links that are not listings (fallback tier only).
    pub other_links: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum View {
    Blank,
    Results(String),
    Detail(String, usize),
}

/// Scripted browser: each search URL maps to a results page, each listing
/// opens a static detail page.
pub struct FakeBrowser {
    pages: HashMap<String, ResultsPage>,
    /// Successful loads left per URL before navigation starts failing.
    load_budget: HashMap<String, usize>,
    stuck_backs: usize,
    view: View,
    pub navigations: Vec<String>,
    pub clicks: Vec<String>,
    pub screenshots: Vec<PathBuf>,
    pub backs: usize,
    pub scrolls: usize,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            load_budget: HashMap::new(),
            stuck_backs: 0,
            view: View::Blank,
            navigations: Vec::new(),
            clicks: Vec::new(),
            screenshots: Vec::new(),
            backs: 0,
            scrolls: 0,
        }
    }

    pub fn with_feed(mut self, url: String, listings: Vec<FakeListing>) -> Self {
        self.pages.insert(
            url,
            ResultsPage {
                feed: true,
                listings,
                other_links: Vec::new(),
            },
        );
        self
    }

    pub fn with_links_only(mut self, url: String, listings: Vec<FakeListing>, other: &[&str]) -> Self {
        self.pages.insert(
            url,
            ResultsPage {
                feed: false,
                listings,
                other_links: other.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn failing_navigation(self, url: String) -> Self {
        self.failing_navigation_after(url, 0)
    }

    /// `url` loads `loads` times, then every further navigation to it fails.
    pub fn failing_navigation_after(mut self, url: String, loads: usize) -> Self {
        self.load_budget.insert(url, loads);
        self
    }

    /// The next `count` back navigations leave the detail pane on screen.
    pub fn with_stuck_back(mut self, count: usize) -> Self {
        self.stuck_backs = count;
        self
    }

    fn results_page(&self) -> Option<&ResultsPage> {
        match &self.view {
            View::Results(url) => self.pages.get(url),
            _ => None,
        }
    }

    fn listing_nodes(&self, page: &ResultsPage, selector: &str) -> Vec<Node> {
        let names: Vec<(String, Option<String>)> = if page.feed {
            page.listings.iter().map(|l| (l.name.clone(), None)).collect()
        } else {
            page.listings
                .iter()
                .map(|l| l.name.clone())
                .chain(page.other_links.iter().cloned())
                .map(|label| (String::new(), Some(label)))
                .collect()
        };

        names
            .into_iter()
            .enumerate()
            .map(|(index, (text, label))| Node {
                selector: selector.to_string(),
                index,
                text,
                label,
            })
            .collect()
    }
}

fn single(selector: &str, text: &str) -> Vec<Node> {
    vec![Node {
        selector: selector.to_string(),
        index: 0,
        text: text.to_string(),
        ..Node::default()
    }]
}

impl Browser for FakeBrowser {
    fn navigate(&mut self, url: &str) -> Result<(), ScraperError> {
        self.navigations.push(url.to_string());
        if let Some(left) = self.load_budget.get_mut(url) {
            if *left == 0 {
                return Err(ScraperError::Browser(format!("net::ERR_TIMED_OUT at {url}")));
            }
            *left -= 1;
        }
        self.view = View::Results(url.to_string());
        Ok(())
    }

    fn find_all(&mut self, selector: &str) -> Result<Vec<Node>, ScraperError> {
        if let View::Detail(url, idx) = &self.view {
            let name = &self.pages[url].listings[*idx].name;
            return Ok(if selector == DETAIL_READY {
                single(selector, name)
            } else {
                Vec::new()
            });
        }

        let Some(page) = self.results_page() else {
            return Ok(Vec::new());
        };
        Ok(match selector {
            RESULTS_FEED if page.feed => single(selector, ""),
            LISTING_HEADING if page.feed => self.listing_nodes(page, selector),
            LABELLED_LINK if !page.feed => self.listing_nodes(page, selector),
            _ => Vec::new(),
        })
    }

    fn click(&mut self, node: &Node) -> Result<(), ScraperError> {
        let View::Results(url) = self.view.clone() else {
            return Err(ScraperError::Browser("Nothing to click".into()));
        };
        let listing = self.pages[&url]
            .listings
            .get(node.index)
            .ok_or_else(|| ScraperError::Browser(format!("No listing at {}", node.index)))?;

        self.clicks.push(listing.name.clone());
        if listing.fail_click {
            return Err(ScraperError::Browser(format!(
                "Element {}#{} is gone",
                node.selector, node.index
            )));
        }
        self.view = View::Detail(url, node.index);
        Ok(())
    }

    fn go_back(&mut self) -> Result<(), ScraperError> {
        self.backs += 1;
        if self.stuck_backs > 0 {
            self.stuck_backs -= 1;
            return Ok(());
        }
        if let View::Detail(url, _) = self.view.clone() {
            self.view = View::Results(url);
        }
        Ok(())
    }

    fn scroll_to_bottom(&mut self, _container: &Node) -> Result<(), ScraperError> {
        self.scrolls += 1;
        Ok(())
    }

    fn current_url(&mut self) -> Result<String, ScraperError> {
        Ok(match &self.view {
            View::Blank => "about:blank".to_string(),
            View::Results(url) => url.clone(),
            View::Detail(url, idx) => self.pages[url].listings[*idx].url.clone(),
        })
    }

    fn page_html(&mut self) -> Result<String, ScraperError> {
        Ok(match &self.view {
            View::Detail(url, idx) => self.pages[url].listings[*idx].html.clone(),
            _ => "<html><body></body></html>".to_string(),
        })
    }

    fn screenshot(&mut self, path: &Path) -> Result<(), ScraperError> {
        self.screenshots.push(path.to_path_buf());
        Ok(())
    }
}

/// Records every pause instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingPause {
    pub pauses: Vec<Duration>,
}

impl RecordingPause {
    pub fn count(&self, duration: Duration) -> usize {
        self.pauses.iter().filter(|d| **d == duration).count()
    }
}

impl Pause for RecordingPause {
    fn pause(&mut self, duration: Duration) {
        self.pauses.push(duration);
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    pub appended: Vec<ListingRecord>,
    pub snapshots: Vec<Vec<ListingRecord>>,
}

impl RecordSink for MemorySink {
    fn append(&mut self, record: &ListingRecord) -> Result<(), ScraperError> {
        self.appended.push(record.clone());
        Ok(())
    }

    fn snapshot(&mut self, records: &[ListingRecord]) -> Result<(), ScraperError> {
        self.snapshots.push(records.to_vec());
        Ok(())
    }
}
