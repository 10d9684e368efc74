// src/scraper/models.rs
use chrono::NaiveDate;
use serde::Deserialize;

pub const DATA_SOURCE: &str = "Google Maps";

// ListingRecord
//  ├── identity:   id, name
//  ├── location:   address, postal_code, city, state, latitude, longitude, source_url
//  ├── contact:    phone, website, opening_hours, rating, reviews, description
//  ├── derived:    is_fenced
//  └── provenance: last_updated, data_source
//
// Columns like has_water or size exist only in the persisted schema; nothing
// fills them yet, so the sink writes them empty.

/// One dog park as extracted from its detail view. Built once, never updated.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListingRecord {
    pub id: u64,
    pub name: String,

    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(rename = "google_maps_url")]
    pub source_url: Option<String>,

    pub phone: Option<String>,
    pub website: Option<String>,
    pub opening_hours: Option<String>,
    pub rating: Option<String>,
    pub reviews: Option<String>,
    pub description: Option<String>,

    #[serde(default)]
    pub is_fenced: FenceStatus,

    pub last_updated: NaiveDate,
    pub data_source: String,
}

impl ListingRecord {
    /// Value for a persisted column, `None` when the record has nothing for it
    /// (including columns the record does not model at all).
    pub fn column(&self, column: &str) -> Option<String> {
        match column {
            "id" => Some(self.id.to_string()),
            "name" => Some(self.name.clone()),
            "address" => self.address.clone(),
            "postal_code" => self.postal_code.clone(),
            "city" => Some(self.city.clone()),
            "state" => self.state.clone(),
            "latitude" => self.latitude.map(|v| v.to_string()),
            "longitude" => self.longitude.map(|v| v.to_string()),
            "google_maps_url" => self.source_url.clone(),
            "phone" => self.phone.clone(),
            "website" => self.website.clone(),
            "opening_hours" => self.opening_hours.clone(),
            "rating" => self.rating.clone(),
            "reviews" => self.reviews.clone(),
            "description" => self.description.clone(),
            "is_fenced" => Some(self.is_fenced.as_str().to_string()),
            "last_updated" => Some(self.last_updated.format("%Y-%m-%d").to_string()),
            "data_source" => Some(self.data_source.clone()),
            _ => None,
        }
    }
}

/// Fencing is either confirmed or unknown. Once confirmed it stays confirmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FenceStatus {
    Yes,
    #[default]
    Unknown,
}

impl FenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FenceStatus::Yes => "yes",
            FenceStatus::Unknown => "unknown",
        }
    }

    pub fn confirm(&mut self) {
        *self = FenceStatus::Yes;
    }
}

/// Hands out record ids: strictly increasing, never reused within a process.
#[derive(Debug)]
pub struct IdAllocator {
    next: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Makes sure future ids land above `id` (used when resuming from disk).
    pub fn skip_past(&mut self, id: u64) {
        self.next = self.next.max(id.saturating_add(1));
    }

    pub fn peek(&self) -> u64 {
        self.next
    }
}
