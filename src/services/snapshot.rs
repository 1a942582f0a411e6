//! Latest-snapshot reduction and display mappings.
//!
//! `latest_per_city` is the read path's core: a pure single pass over the
//! joined readings feed that keeps, per city, the row with the maximum
//! `recorded_at`. The feed carries no ordering guarantee, so the comparison
//! is explicit.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::db::models::ReadingWithCity;

/// Reduce a readings feed to one row per city, by maximum `recorded_at`.
///
/// A row replaces the held candidate only when its timestamp is strictly
/// greater, so first-seen wins on an exact tie. Rows for correctly upserted
/// data can only tie on the full idempotency key and are then identical.
/// Cities with zero readings are simply absent — no placeholder is made.
pub fn latest_per_city(rows: Vec<ReadingWithCity>) -> HashMap<i64, ReadingWithCity> {
    let mut latest: HashMap<i64, ReadingWithCity> = HashMap::new();
    for row in rows {
        match latest.entry(row.city_id) {
            Entry::Vacant(e) => {
                e.insert(row);
            }
            Entry::Occupied(mut e) => {
                if row.recorded_at > e.get().recorded_at {
                    e.insert(row);
                }
            }
        }
    }
    latest
}

/// Map a provider weather classification to a display icon name.
///
/// Classification strings are free text from the provider; anything
/// unrecognized falls back to the cloud icon.
pub fn condition_icon(weather_main: &str) -> &'static str {
    match weather_main.to_lowercase().as_str() {
        "clear" => "sun",
        "clouds" => "cloud",
        "rain" | "drizzle" => "cloud-rain",
        "snow" => "cloud-snow",
        "thunderstorm" => "cloud-lightning",
        _ => "cloud",
    }
}

/// Map a wind direction in degrees to an 8-point compass label.
pub fn wind_compass(deg: i32) -> &'static str {
    const DIRECTIONS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let index = ((deg as f64 / 45.0).round() as usize) % 8;
    DIRECTIONS[index]
}
