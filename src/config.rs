// src/config.rs
use crate::errors::ScraperError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CITIES: [&str; 10] = [
    "Berlin",
    "Hamburg",
    "München",
    "Köln",
    "Frankfurt",
    "Stuttgart",
    "Düsseldorf",
    "Leipzig",
    "Dresden",
    "Hannover",
];

pub const DEFAULT_QUERY_TEMPLATES: [&str; 6] = [
    "Hundewiese {}",
    "Hundespielplatz {}",
    "Hundepark {}",
    "Hundeauslauf {}",
    "Eingezäunte Hundewiese {}",
    "Hundefreilauf {}",
];

/// Upper bound for any single pacing delay or readiness ceiling.
pub const MAX_WAIT_SECS: f64 = 3600.0;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0 Safari/537.36";

/// Everything a run needs. Every field has a default, so a config file only
/// has to name what it changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub cities: Vec<String>,
    /// Each template carries exactly one `{}` slot for the city name.
    pub query_templates: Vec<String>,
    pub search_base_url: String,

    pub output_dir: PathBuf,
    pub csv_filename: String,
    pub json_filename: String,
    pub log_filename: String,

    pub screenshots: bool,
    /// Cap on listings opened per query. `None` processes everything discovered.
    pub max_listings_per_query: Option<usize>,
    pub scroll_cycles: usize,

    pub pacing: PacingPolicy,
    pub readiness: ReadinessPolicy,
    pub browser: BrowserOptions,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            cities: DEFAULT_CITIES.iter().map(|c| c.to_string()).collect(),
            query_templates: DEFAULT_QUERY_TEMPLATES
                .iter()
                .map(|q| q.to_string())
                .collect(),
            search_base_url: "https://www.google.com/maps/search/".to_string(),
            output_dir: PathBuf::from("dog_park_data"),
            csv_filename: "hundewiesen_germany.csv".to_string(),
            json_filename: "hundewiesen_germany.json".to_string(),
            log_filename: "scraping_log.txt".to_string(),
            screenshots: true,
            max_listings_per_query: None,
            scroll_cycles: 5,
            pacing: PacingPolicy::default(),
            readiness: ReadinessPolicy::default(),
            browser: BrowserOptions::default(),
        }
    }
}

/// Inclusive range of seconds to sleep, sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DelayRange {
    pub min: f64,
    pub max: f64,
}

impl DelayRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    fn is_valid(&self) -> bool {
        is_wait(self.min) && is_wait(self.max) && self.min <= self.max
    }
}

/// Politeness delays. The per-query range sits inside a narrower band than the
/// per-city range.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PacingPolicy {
    pub query_delay_secs: DelayRange,
    pub city_delay_secs: DelayRange,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            query_delay_secs: DelayRange::new(3.0, 7.0),
            city_delay_secs: DelayRange::new(10.0, 20.0),
        }
    }
}

/// Worst-case ceilings for each readiness wait. Waits poll and return early as
/// soon as the page is ready.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReadinessPolicy {
    pub results_secs: f64,
    pub detail_secs: f64,
    pub back_secs: f64,
    pub scroll_secs: f64,
    pub poll_ms: u64,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            results_secs: 5.0,
            detail_secs: 3.0,
            back_secs: 2.0,
            scroll_secs: 2.0,
            poll_ms: 250,
        }
    }
}

impl ReadinessPolicy {
    pub fn results(&self) -> Duration {
        secs_to_duration(self.results_secs)
    }

    pub fn detail(&self) -> Duration {
        secs_to_duration(self.detail_secs)
    }

    pub fn back(&self) -> Duration {
        secs_to_duration(self.back_secs)
    }

    pub fn scroll(&self) -> Duration {
        secs_to_duration(self.scroll_secs)
    }

    fn ceilings(&self) -> [(&'static str, f64); 4] {
        [
            ("results_secs", self.results_secs),
            ("detail_secs", self.detail_secs),
            ("back_secs", self.back_secs),
            ("scroll_secs", self.scroll_secs),
        ]
    }

    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    pub headless: bool,
    pub sandbox: bool,
    pub chrome_path: Option<PathBuf>,
    pub user_agent: String,
    pub lang: String,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: false,
            chrome_path: None,
            user_agent: USER_AGENT.to_string(),
            lang: "de-DE".to_string(),
        }
    }
}

impl ScrapeConfig {
    /// Defaults, overlaid with the JSON file at `path` when given, then with
    /// the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ScraperError> {
        let mut config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p).map_err(|e| {
                    ScraperError::Config(format!("Cannot read {}: {e}", p.display()))
                })?;
                serde_json::from_str::<ScrapeConfig>(&raw).map_err(|e| {
                    ScraperError::Config(format!("Cannot parse {}: {e}", p.display()))
                })?
            }
            None => ScrapeConfig::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies `HUNDEPARK_*` overrides read through `get`.
    pub fn apply_overrides<F>(&mut self, get: F) -> Result<(), ScraperError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = get("HUNDEPARK_OUTPUT_DIR").filter(|v| !v.is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(path) = get("HUNDEPARK_CHROME_PATH").filter(|v| !v.is_empty()) {
            self.browser.chrome_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = get("HUNDEPARK_HEADLESS") {
            self.browser.headless = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(ScraperError::Config(format!(
                        "HUNDEPARK_HEADLESS must be true/false, got '{other}'"
                    )))
                }
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ScraperError> {
        if self.cities.iter().all(|c| c.trim().is_empty()) {
            return Err(ScraperError::Config("No cities configured".into()));
        }
        if self.query_templates.is_empty() {
            return Err(ScraperError::Config("No query templates configured".into()));
        }
        for template in &self.query_templates {
            if template.matches("{}").count() != 1 {
                return Err(ScraperError::Config(format!(
                    "Query template '{template}' must contain exactly one {{}} slot"
                )));
            }
        }

        let pacing = &self.pacing;
        if !pacing.query_delay_secs.is_valid() || !pacing.city_delay_secs.is_valid() {
            return Err(ScraperError::Config(format!(
                "Delay ranges need 0 <= min <= max <= {MAX_WAIT_SECS}"
            )));
        }
        if pacing.query_delay_secs.width() > pacing.city_delay_secs.width() {
            return Err(ScraperError::Config(
                "Per-query delay range must be narrower than per-city range".into(),
            ));
        }

        for (name, secs) in self.readiness.ceilings() {
            if !is_wait(secs) {
                return Err(ScraperError::Config(format!(
                    "readiness.{name} must be between 0 and {MAX_WAIT_SECS}, got {secs}"
                )));
            }
        }
        if self.readiness.poll_ms == 0 {
            return Err(ScraperError::Config("Poll interval must be > 0 ms".into()));
        }
        Ok(())
    }

    pub fn csv_path(&self) -> PathBuf {
        self.output_dir.join(&self.csv_filename)
    }

    pub fn json_path(&self) -> PathBuf {
        self.output_dir.join(&self.json_filename)
    }

    pub fn log_path(&self) -> PathBuf {
        self.output_dir.join(&self.log_filename)
    }

    pub fn screenshot_dir(&self) -> PathBuf {
        self.output_dir.join("screenshots")
    }
}

fn is_wait(secs: f64) -> bool {
    (0.0..=MAX_WAIT_SECS).contains(&secs)
}

/// Seconds as a `Duration`. Negative and NaN become zero, anything too large
/// for a `Duration` saturates, so a bad value never panics mid-crawl.
pub fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// Substitutes the city into a query template's `{}` slot.
pub fn render_query(template: &str, city: &str) -> String {
    template.replacen("{}", city, 1)
}
