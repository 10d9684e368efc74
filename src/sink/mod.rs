// src/sink/mod.rs
mod files;

pub use files::FileSink;

use crate::errors::ScraperError;
use crate::scraper::models::ListingRecord;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Persisted columns, in output order. Wider than `ListingRecord`: the
/// facility columns are reserved for later enrichment and written empty.
pub const SCHEMA: [&str; 26] = [
    "id",
    "name",
    "address",
    "postal_code",
    "city",
    "state",
    "latitude",
    "longitude",
    "google_maps_url",
    "phone",
    "opening_hours",
    "website",
    "description",
    "is_fenced",
    "has_water",
    "has_agility",
    "has_seating",
    "has_waste_bins",
    "has_lighting",
    "has_parking",
    "photos",
    "rating",
    "reviews",
    "size",
    "last_updated",
    "data_source",
];

/// A record flattened onto `SCHEMA`: one value per column, empty string for
/// anything the record does not carry. Both write paths only ever see rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<String>,
}

impl Row {
    pub fn from_record(record: &ListingRecord) -> Self {
        Self {
            values: SCHEMA
                .iter()
                .map(|column| record.column(column).unwrap_or_default())
                .collect(),
        }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(SCHEMA.len()))?;
        for (column, value) in SCHEMA.iter().zip(&self.values) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Durable destination for extracted records.
pub trait RecordSink {
    /// Persists one record as soon as it is extracted.
    fn append(&mut self, record: &ListingRecord) -> Result<(), ScraperError>;

    /// Replaces the full stores with `records`. Calling it twice with the same
    /// records leaves the same bytes on disk.
    fn snapshot(&mut self, records: &[ListingRecord]) -> Result<(), ScraperError>;
}
