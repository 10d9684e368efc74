// src/tests/extractor_tests.rs
use super::utils::today;
use crate::errors::ScraperError;
use crate::scraper::extractor::{Extractor, Field, ListingContext, PageSnapshot, Strategy};
use crate::scraper::models::{FenceStatus, IdAllocator};

const TEMPELHOF_URL: &str =
    "https://www.google.com/maps/place/Hundeauslaufgebiet+Tempelhofer+Feld/@52.4736,13.4023,15z/data=!4m6";

fn tempelhof_html() -> String {
    r#"<html><body>
        <h1>Hundeauslaufgebiet Tempelhofer Feld</h1>
        <div class="fontDisplayLarge">4,6</div>
        <button data-item-id="address" aria-label="Adresse: Tempelhofer Damm 1, 12101 Berlin">
            <span class="icon"></span>
            <div>Tempelhofer Damm 1, 12101 Berlin</div>
        </button>
        <div data-item-id="oh">
            <div>Montag: 06:00–22:00</div>
            <div>Dienstag: 06:00–22:00</div>
        </div>
        <a data-item-id="authority" href=" https://www.thf-berlin.de/ ">thf-berlin.de</a>
        <button data-item-id="phone:tel:+4930200037441"><div>030 200037441</div></button>
        <div class="fontBodyMedium">Riesige Fläche, komplett eingezäunt und sehr sauber.</div>
        <div class="fontBodyMedium">Gut</div>
        <div class="fontBodyMedium">Am Wochenende sehr voll, aber die Hunde lieben es.</div>
        <div class="fontBodyMedium">Dieser Block wird nie gelesen, er ist der vierte.</div>
    </body></html>"#
        .to_string()
}

#[test]
fn extracts_every_field_from_a_full_listing() {
    let page = PageSnapshot::parse(&tempelhof_html(), TEMPELHOF_URL);
    let mut ids = IdAllocator::default();

    let record = Extractor::default()
        .extract(&page, "  Hundeauslaufgebiet Tempelhofer Feld ", "Berlin", &mut ids, today())
        .unwrap();

    assert_eq!(record.id, 1);
    assert_eq!(record.name, "Hundeauslaufgebiet Tempelhofer Feld");
    assert_eq!(record.city, "Berlin");
    assert_eq!(record.address.as_deref(), Some("Tempelhofer Damm 1, 12101 Berlin"));
    assert_eq!(record.postal_code.as_deref(), Some("12101"));
    assert_eq!(record.state.as_deref(), Some("Berlin"));
    assert_eq!(record.phone.as_deref(), Some("030 200037441"));
    assert_eq!(record.website.as_deref(), Some("https://www.thf-berlin.de/"));
    assert_eq!(
        record.opening_hours.as_deref(),
        Some("Montag: 06:00–22:00; Dienstag: 06:00–22:00")
    );
    assert_eq!(record.rating.as_deref(), Some("4,6"));
    assert_eq!(record.latitude, Some(52.4736));
    assert_eq!(record.longitude, Some(13.4023));
    assert_eq!(record.source_url.as_deref(), Some(TEMPELHOF_URL));
    assert_eq!(record.last_updated, today());
    assert_eq!(record.data_source, "Google Maps");
}

#[test]
fn reviews_keep_long_blocks_among_the_first_three() {
    let page = PageSnapshot::parse(&tempelhof_html(), TEMPELHOF_URL);
    let mut ids = IdAllocator::default();

    let record = Extractor::default()
        .extract(&page, "Tempelhofer Feld", "Berlin", &mut ids, today())
        .unwrap();

    let reviews = record.reviews.unwrap();
    assert_eq!(
        reviews,
        "Riesige Fläche, komplett eingezäunt und sehr sauber. | \
         Am Wochenende sehr voll, aber die Hunde lieben es."
    );
    assert!(!reviews.contains("vierte"));

    assert_eq!(record.is_fenced, FenceStatus::Yes);
    let description = record.description.unwrap();
    assert!(description.starts_with("Based on visitor reviews: Riesige Fläche"));
    assert!(description.ends_with("..."));
}

#[test]
fn falls_back_along_the_chain_in_order() {
    let html = r#"<html><body>
        <button aria-label="Adresse: Hauptstraße 5, 20095 Hamburg"><div>Hauptstraße 5, 20095 Hamburg</div></button>
        <button aria-label="address: should not win"><div>Wrong Street 9</div></button>
        <a aria-label="Website: hundewiese.de" href="https://hundewiese.de">hundewiese.de</a>
        <span aria-hidden="true">(128)</span>
        <span aria-hidden="true">4.4</span>
    </body></html>"#;
    let page = PageSnapshot::parse(html, "https://www.google.com/maps/place/x");
    let mut ids = IdAllocator::default();

    let record = Extractor::default()
        .extract(&page, "Hundewiese Planten un Blomen", "Hamburg", &mut ids, today())
        .unwrap();

    assert_eq!(record.address.as_deref(), Some("Hauptstraße 5, 20095 Hamburg"));
    assert_eq!(record.state.as_deref(), Some("Hamburg"));
    assert_eq!(record.website.as_deref(), Some("https://hundewiese.de"));
    assert_eq!(record.rating.as_deref(), Some("4.4"));
}

#[test]
fn missing_fields_stay_absent() {
    let page = PageSnapshot::parse("<html><body><h1>Hundewiese</h1></body></html>", "");
    let mut ids = IdAllocator::default();

    let record = Extractor::default()
        .extract(&page, "Hundewiese", "Köln", &mut ids, today())
        .unwrap();

    assert_eq!(record.address, None);
    assert_eq!(record.postal_code, None);
    assert_eq!(record.state, None);
    assert_eq!(record.phone, None);
    assert_eq!(record.website, None);
    assert_eq!(record.opening_hours, None);
    assert_eq!(record.rating, None);
    assert_eq!(record.reviews, None);
    assert_eq!(record.description, None);
    assert_eq!(record.latitude, None);
    assert_eq!(record.source_url, None);
    assert_eq!(record.is_fenced, FenceStatus::Unknown);
}

#[test]
fn fenced_name_without_reviews_is_confirmed() {
    let page = PageSnapshot::parse("<html><body></body></html>", "");
    let mut ids = IdAllocator::default();

    let record = Extractor::default()
        .extract(&page, "Eingezäunte Hundewiese Ost", "Leipzig", &mut ids, today())
        .unwrap();

    assert_eq!(record.is_fenced, FenceStatus::Yes);
}

#[test]
fn blank_name_yields_nothing_and_keeps_the_id() {
    let page = PageSnapshot::parse(&tempelhof_html(), TEMPELHOF_URL);
    let mut ids = IdAllocator::default();

    assert!(Extractor::default()
        .extract(&page, "   ", "Berlin", &mut ids, today())
        .is_none());
    assert_eq!(ids.peek(), 1);
}

fn phone_lookup_fails(_: &dyn ListingContext) -> Result<Option<String>, ScraperError> {
    Err(ScraperError::Browser("node detached while reading phone".into()))
}

#[test]
fn failing_strategy_blanks_only_its_field() {
    let page = PageSnapshot::parse(&tempelhof_html(), TEMPELHOF_URL);
    let mut ids = IdAllocator::default();
    let extractor = Extractor::default().with_chain(
        Field::Phone,
        vec![
            Strategy::Custom("broken", phone_lookup_fails),
            Strategy::Text("button[data-item-id^='phone:tel']"),
        ],
    );

    let record = extractor
        .extract(&page, "Tempelhofer Feld", "Berlin", &mut ids, today())
        .unwrap();

    // The error ends the chain; the working fallback behind it is not tried.
    assert_eq!(record.phone, None);
    assert_eq!(record.address.as_deref(), Some("Tempelhofer Damm 1, 12101 Berlin"));
    assert_eq!(record.website.as_deref(), Some("https://www.thf-berlin.de/"));
    assert!(record.reviews.is_some());
}

#[test]
fn invalid_selector_is_a_field_failure_not_a_panic() {
    let page = PageSnapshot::parse(&tempelhof_html(), TEMPELHOF_URL);
    let mut ids = IdAllocator::default();
    let extractor = Extractor::default().with_chain(Field::Rating, vec![Strategy::Text("div[[")]);

    let record = extractor
        .extract(&page, "Tempelhofer Feld", "Berlin", &mut ids, today())
        .unwrap();

    assert_eq!(record.rating, None);
    assert_eq!(record.postal_code.as_deref(), Some("12101"));
}

#[test]
fn ids_advance_per_extracted_record() {
    let page = PageSnapshot::parse(&tempelhof_html(), TEMPELHOF_URL);
    let mut ids = IdAllocator::default();
    let extractor = Extractor::default();

    let a = extractor.extract(&page, "A-Park", "Berlin", &mut ids, today()).unwrap();
    let b = extractor.extract(&page, "B-Park", "Berlin", &mut ids, today()).unwrap();
    assert_eq!((a.id, b.id), (1, 2));
}
