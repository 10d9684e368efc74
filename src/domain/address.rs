// src/domain/address.rs

/// German federal states, in the order they are matched against an address.
/// The first literal substring hit wins, so "Sachsen" shadows "Sachsen-Anhalt"
/// and a city named like a state (Berlin, Hamburg, Bremen) resolves to it.
pub const GERMAN_STATES: [&str; 16] = [
    "Baden-Württemberg",
    "Bayern",
    "Berlin",
    "Brandenburg",
    "Bremen",
    "Hamburg",
    "Hessen",
    "Mecklenburg-Vorpommern",
    "Niedersachsen",
    "Nordrhein-Westfalen",
    "Rheinland-Pfalz",
    "Saarland",
    "Sachsen",
    "Sachsen-Anhalt",
    "Schleswig-Holstein",
    "Thüringen",
];

/// First whitespace-delimited token made of exactly five ASCII digits.
pub fn extract_postal_code(address: &str) -> Option<String> {
    address
        .split_whitespace()
        .find(|token| token.len() == 5 && token.bytes().all(|b| b.is_ascii_digit()))
        .map(str::to_string)
}

pub fn extract_state(address: &str) -> Option<&'static str> {
    GERMAN_STATES
        .iter()
        .copied()
        .find(|state| address.contains(state))
}

/// Reads `lat,lon` from the segment following the `@` marker of a map URL,
/// e.g. `.../place/Hundewiese/@52.4736,13.4023,17z/...`.
///
/// Best effort: both values must parse, otherwise neither is returned.
pub fn extract_coordinates(location: &str) -> Option<(f64, f64)> {
    let (_, after) = location.split_once('@')?;
    let mut parts = after.split(',');
    let lat = parts.next()?.trim().parse::<f64>().ok()?;
    let lon = parts.next()?.trim().parse::<f64>().ok()?;
    Some((lat, lon))
}
