// src/browser/chrome.rs
use super::{Browser, Node};
use crate::config::BrowserOptions;
use crate::errors::ScraperError;
use headless_chrome::browser::tab::NoElementFound;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser as ChromeProcess, Element, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const SCROLL_TO_BOTTOM_JS: &str = "function() { this.scrollTop = this.scrollHeight; }";

/// Chrome driven over the DevTools protocol. Dropping it shuts Chrome down.
pub struct ChromeBrowser {
    tab: Arc<Tab>,
    // Kept last so the tab handle is released before the process.
    _process: ChromeProcess,
}

impl ChromeBrowser {
    pub fn launch(options: &BrowserOptions) -> Result<Self, ScraperError> {
        let lang = format!("--lang={}", options.lang);
        let agent = format!("--user-agent={}", options.user_agent);
        let args: Vec<&OsStr> = vec![
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new(&lang),
            OsStr::new(&agent),
        ];

        let launch = LaunchOptions::default_builder()
            .headless(options.headless)
            .sandbox(options.sandbox)
            .path(options.chrome_path.clone())
            .args(args)
            .build()
            .map_err(ScraperError::browser)?;

        let process = ChromeProcess::new(launch).map_err(ScraperError::browser)?;
        let tab = process.new_tab().map_err(ScraperError::browser)?;

        info!("Browser initialized successfully");
        Ok(Self {
            tab,
            _process: process,
        })
    }

    /// Closes Chrome. Equivalent to dropping, but leaves a log line.
    pub fn quit(self) {
        drop(self);
        info!("Browser closed");
    }

    fn elements(&self, selector: &str) -> Result<Vec<Element<'_>>, ScraperError> {
        match self.tab.find_elements(selector) {
            Ok(found) => Ok(found),
            Err(e) if e.is::<NoElementFound>() => Ok(Vec::new()),
            Err(e) => Err(ScraperError::browser(e)),
        }
    }

    fn resolve(&self, node: &Node) -> Result<Element<'_>, ScraperError> {
        self.elements(&node.selector)?
            .into_iter()
            .nth(node.index)
            .ok_or_else(|| {
                ScraperError::Browser(format!(
                    "Element {}#{} is gone",
                    node.selector, node.index
                ))
            })
    }
}

impl Browser for ChromeBrowser {
    fn navigate(&mut self, url: &str) -> Result<(), ScraperError> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(ScraperError::browser)?;
        debug!("Navigated to: {url}");
        Ok(())
    }

    fn find_all(&mut self, selector: &str) -> Result<Vec<Node>, ScraperError> {
        let nodes = self
            .elements(selector)?
            .iter()
            .enumerate()
            .map(|(index, el)| Node {
                selector: selector.to_string(),
                index,
                text: el.get_inner_text().unwrap_or_default(),
                label: el.get_attribute_value("aria-label").ok().flatten(),
            })
            .collect();
        Ok(nodes)
    }

    fn click(&mut self, node: &Node) -> Result<(), ScraperError> {
        self.resolve(node)?.click().map_err(ScraperError::browser)?;
        Ok(())
    }

    fn go_back(&mut self) -> Result<(), ScraperError> {
        self.tab
            .evaluate("window.history.back()", false)
            .map_err(ScraperError::browser)?;
        Ok(())
    }

    fn scroll_to_bottom(&mut self, container: &Node) -> Result<(), ScraperError> {
        self.resolve(container)?
            .call_js_fn(SCROLL_TO_BOTTOM_JS, vec![], false)
            .map_err(ScraperError::browser)?;
        Ok(())
    }

    fn current_url(&mut self) -> Result<String, ScraperError> {
        Ok(self.tab.get_url())
    }

    fn page_html(&mut self) -> Result<String, ScraperError> {
        self.tab.get_content().map_err(ScraperError::browser)
    }

    fn screenshot(&mut self, path: &Path) -> Result<(), ScraperError> {
        let png = self
            .tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(ScraperError::browser)?;
        std::fs::write(path, png)?;
        Ok(())
    }
}
