// src/scraper/extractor.rs
use crate::browser::Browser;
use crate::domain::address::{extract_coordinates, extract_postal_code, extract_state};
use crate::domain::logic::{derive_description, derive_fence_status};
use crate::errors::ScraperError;
use crate::scraper::models::{IdAllocator, ListingRecord, DATA_SOURCE};
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use tracing::{debug, info, warn};

const MAX_REVIEW_BLOCKS: usize = 3;
const MIN_REVIEW_CHARS: usize = 21;
const REVIEW_SEPARATOR: &str = " | ";

/// Read-only view of one open listing: its DOM and where the viewer is.
pub trait ListingContext {
    /// Text of the first element matching `selector`, if it has any.
    fn text(&self, selector: &str) -> Result<Option<String>, ScraperError>;

    /// Attribute of the first element matching `selector`, if non-empty.
    fn attr(&self, selector: &str, attr: &str) -> Result<Option<String>, ScraperError>;

    /// Text of every element matching `selector`, in document order.
    fn texts(&self, selector: &str) -> Result<Vec<String>, ScraperError>;

    /// Current location (URL) of the viewer.
    fn location(&self) -> &str;
}

/// A parsed copy of the detail page, taken once per listing so every field
/// lookup reads the same DOM.
pub struct PageSnapshot {
    html: Html,
    location: String,
}

impl PageSnapshot {
    pub fn parse(html: &str, location: impl Into<String>) -> Self {
        Self {
            html: Html::parse_document(html),
            location: location.into(),
        }
    }

    pub fn capture<B: Browser + ?Sized>(browser: &mut B) -> Result<Self, ScraperError> {
        let location = browser.current_url()?;
        let html = browser.page_html()?;
        Ok(Self::parse(&html, location))
    }

    fn select<'a>(&'a self, selector: &str) -> Result<Vec<ElementRef<'a>>, ScraperError> {
        let parsed = Selector::parse(selector).map_err(|e| ScraperError::Selector {
            selector: selector.to_string(),
            reason: e.to_string(),
        })?;
        Ok(self.html.select(&parsed).collect())
    }
}

/// Visible text of an element: trimmed text nodes, one per line.
fn inner_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

impl ListingContext for PageSnapshot {
    fn text(&self, selector: &str) -> Result<Option<String>, ScraperError> {
        Ok(self
            .select(selector)?
            .first()
            .map(inner_text)
            .filter(|t| !t.is_empty()))
    }

    fn attr(&self, selector: &str, attr: &str) -> Result<Option<String>, ScraperError> {
        Ok(self
            .select(selector)?
            .first()
            .and_then(|el| el.value().attr(attr))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string))
    }

    fn texts(&self, selector: &str) -> Result<Vec<String>, ScraperError> {
        Ok(self.select(selector)?.iter().map(inner_text).collect())
    }

    fn location(&self) -> &str {
        &self.location
    }
}

#[cfg(test)]
pub type Lookup = fn(&dyn ListingContext) -> Result<Option<String>, ScraperError>;

/// One way of reading a field. A chain of these is tried in order.
#[derive(Clone, Copy)]
pub enum Strategy {
    /// Text of the first match.
    Text(&'static str),
    /// Attribute value of the first match.
    Attr(&'static str, &'static str),
    /// First match whose text passes the predicate.
    FirstWhere(&'static str, fn(&str) -> bool),
    /// Up to three text blocks longer than 20 chars, joined with `" | "`.
    Blocks(&'static str),
    /// Hand-written lookup, used to inject failures.
    #[cfg(test)]
    Custom(&'static str, Lookup),
}

impl Strategy {
    pub fn run(&self, ctx: &dyn ListingContext) -> Result<Option<String>, ScraperError> {
        match *self {
            Strategy::Text(selector) => ctx.text(selector),
            Strategy::Attr(selector, attr) => ctx.attr(selector, attr),
            Strategy::FirstWhere(selector, accept) => Ok(ctx
                .texts(selector)?
                .into_iter()
                .map(|t| t.trim().to_string())
                .find(|t| accept(t))),
            Strategy::Blocks(selector) => {
                let blocks: Vec<String> = ctx
                    .texts(selector)?
                    .into_iter()
                    .take(MAX_REVIEW_BLOCKS)
                    .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
                    .filter(|t| t.chars().count() >= MIN_REVIEW_CHARS)
                    .collect();
                Ok((!blocks.is_empty()).then(|| blocks.join(REVIEW_SEPARATOR)))
            }
            #[cfg(test)]
            Strategy::Custom(_, lookup) => lookup(ctx),
        }
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Text(s) => write!(f, "Text({s})"),
            Strategy::Attr(s, a) => write!(f, "Attr({s}@{a})"),
            Strategy::FirstWhere(s, _) => write!(f, "FirstWhere({s})"),
            Strategy::Blocks(s) => write!(f, "Blocks({s})"),
            #[cfg(test)]
            Strategy::Custom(name, _) => write!(f, "Custom({name})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Address,
    Phone,
    Website,
    OpeningHours,
    Rating,
    Reviews,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Address => "address",
            Field::Phone => "phone",
            Field::Website => "website",
            Field::OpeningHours => "opening_hours",
            Field::Rating => "rating",
            Field::Reviews => "reviews",
        }
    }

    /// Field-specific normalisation of a raw hit.
    fn clean(&self, raw: &str) -> String {
        match self {
            Field::OpeningHours => raw
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join("; "),
            Field::Website => raw.trim().to_string(),
            _ => raw.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rating reads like "4.5" or "4,5".
pub fn looks_like_rating(text: &str) -> bool {
    let text = text.trim();
    text.chars().count() <= 3
        && text.contains(|c: char| c == '.' || c == ',')
        && text.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
        && text.chars().any(|c| c.is_ascii_digit())
}

fn default_chains() -> Vec<(Field, Vec<Strategy>)> {
    use Strategy::*;
    vec![
        (
            Field::Address,
            vec![
                Text("button[data-item-id='address']"),
                Text("button[aria-label*='Adresse']"),
                Text("button[aria-label*='address']"),
            ],
        ),
        (
            Field::Phone,
            vec![
                Text("button[data-item-id^='phone:tel']"),
                Text("button[aria-label*='Telefon']"),
                Text("button[aria-label*='phone']"),
            ],
        ),
        (
            Field::Website,
            vec![
                Attr("a[data-item-id='authority']", "href"),
                Attr("a[aria-label*='Website']", "href"),
                Attr("a[aria-label*='website']", "href"),
            ],
        ),
        (
            Field::OpeningHours,
            vec![
                Text("div[data-item-id='oh']"),
                Text("div[aria-label*='Öffnungszeiten']"),
                Text("div[aria-label*='hours']"),
            ],
        ),
        (
            Field::Rating,
            vec![
                FirstWhere("div.fontDisplayLarge", looks_like_rating),
                FirstWhere("span[aria-hidden='true']", looks_like_rating),
            ],
        ),
        (
            Field::Reviews,
            vec![Blocks("div.fontBodyMedium"), Blocks("div[data-review-id] span")],
        ),
    ]
}

/// Pulls a `ListingRecord` out of an open listing.
///
/// Each optional field has an ordered chain of strategies; the first non-empty
/// hit is kept. A strategy that errors ends its field's chain and leaves the
/// field absent; the other fields are unaffected.
pub struct Extractor {
    chains: Vec<(Field, Vec<Strategy>)>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            chains: default_chains(),
        }
    }
}

impl Extractor {
    /// Replaces the chain used for `field`.
    #[cfg(test)]
    pub fn with_chain(mut self, field: Field, strategies: Vec<Strategy>) -> Self {
        match self.chains.iter_mut().find(|(f, _)| *f == field) {
            Some((_, chain)) => *chain = strategies,
            None => self.chains.push((field, strategies)),
        }
        self
    }

    pub fn chain(&self, field: Field) -> &[Strategy] {
        self.chains
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, chain)| chain.as_slice())
            .unwrap_or(&[])
    }

    fn resolve(&self, field: Field, ctx: &dyn ListingContext, name: &str) -> Option<String> {
        for strategy in self.chain(field) {
            match strategy.run(ctx) {
                Ok(Some(raw)) => {
                    let value = field.clean(&raw);
                    if value.is_empty() {
                        continue;
                    }
                    debug!("Found {field} for {name} via {strategy:?}: {value}");
                    return Some(value);
                }
                Ok(None) => continue,
                Err(e) => {
                    warn!("Error extracting {field} for {name}: {e}");
                    return None;
                }
            }
        }
        None
    }

    /// Builds the record for the listing currently open in `ctx`.
    ///
    /// Returns `None` only when the listing has no usable name. The id is
    /// taken from `ids` once the record is certain to be returned.
    pub fn extract(
        &self,
        ctx: &dyn ListingContext,
        raw_name: &str,
        city: &str,
        ids: &mut IdAllocator,
        today: NaiveDate,
    ) -> Option<ListingRecord> {
        let name = raw_name.trim();
        if name.is_empty() {
            warn!("Error extracting details in {city}: listing has no name");
            return None;
        }

        let address = self.resolve(Field::Address, ctx, name);
        let phone = self.resolve(Field::Phone, ctx, name);
        let website = self.resolve(Field::Website, ctx, name);
        let opening_hours = self.resolve(Field::OpeningHours, ctx, name);
        let rating = self.resolve(Field::Rating, ctx, name);
        let reviews = self.resolve(Field::Reviews, ctx, name);

        match &address {
            Some(a) => info!("Found address: {a}"),
            None => info!("Address not found for: {name}"),
        }

        let location = ctx.location().trim();
        let coordinates = extract_coordinates(location);

        let record = ListingRecord {
            id: ids.next_id(),
            name: name.to_string(),
            postal_code: address.as_deref().and_then(extract_postal_code),
            state: address
                .as_deref()
                .and_then(extract_state)
                .map(str::to_string),
            address,
            city: city.to_string(),
            latitude: coordinates.map(|(lat, _)| lat),
            longitude: coordinates.map(|(_, lon)| lon),
            source_url: (!location.is_empty()).then(|| location.to_string()),
            phone,
            website,
            opening_hours,
            rating,
            is_fenced: derive_fence_status(name, reviews.as_deref()),
            description: derive_description(reviews.as_deref()),
            reviews,
            last_updated: today,
            data_source: DATA_SOURCE.to_string(),
        };

        Some(record)
    }
}
