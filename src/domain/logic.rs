// src/domain/logic.rs

use crate::scraper::models::FenceStatus;

/// Substrings that indicate a fenced area, matched case-insensitively.
pub const FENCED_KEYWORDS: [&str; 4] = ["eingezäunt", "umzäunt", "zaun", "geschlossen"];

const DESCRIPTION_PREFIX: &str = "Based on visitor reviews: ";
const DESCRIPTION_REVIEW_CHARS: usize = 200;

fn mentions_fence(text: &str) -> bool {
    let lower = text.to_lowercase();
    FENCED_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Infers whether a park is fenced. The name is checked before the reviews.
///
/// There is no "no": a listing that never mentions a fence may still have one.
pub fn derive_fence_status(name: &str, reviews: Option<&str>) -> FenceStatus {
    let mut status = FenceStatus::Unknown;
    if mentions_fence(name) {
        status.confirm();
    }
    if let Some(reviews) = reviews {
        if mentions_fence(reviews) {
            status.confirm();
        }
    }
    status
}

/// Short description built from the first 200 characters of the reviews.
pub fn derive_description(reviews: Option<&str>) -> Option<String> {
    let reviews = reviews.filter(|r| !r.is_empty())?;
    let excerpt: String = reviews.chars().take(DESCRIPTION_REVIEW_CHARS).collect();
    Some(format!("{DESCRIPTION_PREFIX}{excerpt}..."))
}
