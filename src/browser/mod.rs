// src/browser/mod.rs
mod chrome;

pub use chrome::ChromeBrowser;

use crate::errors::ScraperError;
use std::path::Path;
use std::time::Duration;

/// Snapshot of one element on the current page, plus the locator needed to
/// find it again (`selector` + position among its matches). Handles go stale
/// after every navigation, so actions re-resolve through the locator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub selector: String,
    pub index: usize,
    pub text: String,
    /// `aria-label`
    pub label: Option<String>,
}

/// The browser-automation capability the crawler drives. One instance is
/// used for the whole run.
pub trait Browser {
    fn navigate(&mut self, url: &str) -> Result<(), ScraperError>;

    fn find_all(&mut self, selector: &str) -> Result<Vec<Node>, ScraperError>;

    fn find(&mut self, selector: &str) -> Result<Option<Node>, ScraperError> {
        Ok(self.find_all(selector)?.into_iter().next())
    }

    fn click(&mut self, node: &Node) -> Result<(), ScraperError>;

    fn go_back(&mut self) -> Result<(), ScraperError>;

    fn scroll_to_bottom(&mut self, container: &Node) -> Result<(), ScraperError>;

    fn current_url(&mut self) -> Result<String, ScraperError>;

    /// Serialized DOM of the current page.
    fn page_html(&mut self) -> Result<String, ScraperError>;

    fn screenshot(&mut self, path: &Path) -> Result<(), ScraperError>;
}

/// Where the crawler's sleeps go. Production sleeps the thread; tests record.
pub trait Pause {
    fn pause(&mut self, duration: Duration);
}

pub struct ThreadSleep;

impl Pause for ThreadSleep {
    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Polls `ready` every `poll` until it returns true or the accumulated wait
/// reaches `ceiling`. Total time spent pausing never exceeds `ceiling`.
///
/// Returns whether the predicate was satisfied.
pub fn wait_until<B, F>(
    browser: &mut B,
    pause: &mut dyn Pause,
    ceiling: Duration,
    poll: Duration,
    mut ready: F,
) -> Result<bool, ScraperError>
where
    B: Browser + ?Sized,
    F: FnMut(&mut B) -> Result<bool, ScraperError>,
{
    let mut waited = Duration::ZERO;
    loop {
        if ready(browser)? {
            return Ok(true);
        }
        if waited >= ceiling || poll.is_zero() {
            return Ok(false);
        }
        let step = poll.min(ceiling - waited);
        pause.pause(step);
        waited += step;
    }
}

/// `wait_until` with "at least one element matches `selector`" as predicate.
pub fn wait_for_selector<B>(
    browser: &mut B,
    pause: &mut dyn Pause,
    selector: &str,
    ceiling: Duration,
    poll: Duration,
) -> Result<bool, ScraperError>
where
    B: Browser + ?Sized,
{
    wait_until(browser, pause, ceiling, poll, |b| Ok(b.find(selector)?.is_some()))
}
