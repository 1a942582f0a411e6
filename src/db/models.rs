use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

/// A registered city. Reference data seeded from `data/cities.json`;
/// read-only as far as the ingestion cycle is concerned.
#[derive(Debug, Clone, FromRow)]
#[allow(dead_code)] // All fields populated by FromRow; created_at is audit-only
pub struct City {
    pub id: i64,
    pub name: String,
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub created_at: DateTime<Utc>,
}

/// One weather reading joined with its city's metadata, as returned by the
/// latest-snapshot query feed.
///
/// `recorded_at` is the ingestion time (half of the `(city_id, recorded_at)`
/// idempotency key), `observed_at` the provider's own observation timestamp.
#[derive(Debug, Clone, FromRow)]
pub struct ReadingWithCity {
    pub city_id: i64,
    pub recorded_at: DateTime<Utc>,

    pub reported_name: String,
    pub country: Option<String>,

    pub temp: Decimal,
    pub feels_like: Decimal,
    pub temp_min: Decimal,
    pub temp_max: Decimal,

    pub pressure: i32,
    pub humidity: i32,
    pub wind_speed: Decimal,
    pub wind_deg: i32,
    pub cloudiness: i32,
    pub visibility: i32,

    pub weather_main: String,
    pub weather_description: Option<String>,
    pub weather_icon: Option<String>,

    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub observed_at: DateTime<Utc>,

    // Joined from cities
    pub city_name: String,
    pub latitude: Decimal,
    pub longitude: Decimal,
}
