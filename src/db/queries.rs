use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::models::{City, ReadingWithCity};
use crate::services::cities::CitySeed;

/// Parameters for upserting one normalized weather reading.
pub struct UpsertReadingParams {
    pub city_id: i64,
    pub recorded_at: DateTime<Utc>,
    pub reported_name: String,
    pub country: Option<String>,
    pub temp: rust_decimal::Decimal,
    pub feels_like: rust_decimal::Decimal,
    pub temp_min: rust_decimal::Decimal,
    pub temp_max: rust_decimal::Decimal,
    pub pressure: i32,
    pub humidity: i32,
    pub wind_speed: rust_decimal::Decimal,
    pub wind_deg: i32,
    pub cloudiness: i32,
    pub visibility: i32,
    pub weather_main: String,
    pub weather_description: Option<String>,
    pub weather_icon: Option<String>,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub observed_at: DateTime<Utc>,
}

/// List all registered cities, ordered by id for stable iteration.
pub async fn list_cities(pool: &PgPool) -> Result<Vec<City>, sqlx::Error> {
    sqlx::query_as::<_, City>(
        "SELECT id, name, latitude, longitude, created_at FROM cities ORDER BY id",
    )
    .fetch_all(pool)
    .await
}

/// Upsert a city from the seed file. Ids are externally assigned, so a
/// re-seed with changed coordinates updates the existing row in place.
pub async fn upsert_city(pool: &PgPool, seed: &CitySeed) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO cities (id, name, latitude, longitude)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (id) DO UPDATE SET
             name = EXCLUDED.name,
             latitude = EXCLUDED.latitude,
             longitude = EXCLUDED.longitude",
    )
    .bind(seed.id)
    .bind(&seed.name)
    .bind(crate::helpers::f64_to_decimal_full(seed.latitude))
    .bind(crate::helpers::f64_to_decimal_full(seed.longitude))
    .execute(pool)
    .await?;
    Ok(())
}

/// Upsert one weather reading on the `(city_id, recorded_at)` idempotency key.
///
/// A conflicting key replaces every non-key column — a logical replace, never
/// a partial update — so a refresh that fires twice for the same instant
/// collapses to a single row.
pub async fn upsert_reading(pool: &PgPool, params: UpsertReadingParams) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO weather_readings (
            city_id, recorded_at, reported_name, country,
            temp, feels_like, temp_min, temp_max,
            pressure, humidity, wind_speed, wind_deg, cloudiness, visibility,
            weather_main, weather_description, weather_icon,
            sunrise, sunset, observed_at
        ) VALUES (
            $1, $2, $3, $4,
            $5, $6, $7, $8,
            $9, $10, $11, $12, $13, $14,
            $15, $16, $17,
            $18, $19, $20
        )
        ON CONFLICT (city_id, recorded_at) DO UPDATE SET
            reported_name = EXCLUDED.reported_name,
            country = EXCLUDED.country,
            temp = EXCLUDED.temp,
            feels_like = EXCLUDED.feels_like,
            temp_min = EXCLUDED.temp_min,
            temp_max = EXCLUDED.temp_max,
            pressure = EXCLUDED.pressure,
            humidity = EXCLUDED.humidity,
            wind_speed = EXCLUDED.wind_speed,
            wind_deg = EXCLUDED.wind_deg,
            cloudiness = EXCLUDED.cloudiness,
            visibility = EXCLUDED.visibility,
            weather_main = EXCLUDED.weather_main,
            weather_description = EXCLUDED.weather_description,
            weather_icon = EXCLUDED.weather_icon,
            sunrise = EXCLUDED.sunrise,
            sunset = EXCLUDED.sunset,
            observed_at = EXCLUDED.observed_at",
    )
    .bind(params.city_id)
    .bind(params.recorded_at)
    .bind(&params.reported_name)
    .bind(&params.country)
    .bind(params.temp)
    .bind(params.feels_like)
    .bind(params.temp_min)
    .bind(params.temp_max)
    .bind(params.pressure)
    .bind(params.humidity)
    .bind(params.wind_speed)
    .bind(params.wind_deg)
    .bind(params.cloudiness)
    .bind(params.visibility)
    .bind(&params.weather_main)
    .bind(&params.weather_description)
    .bind(&params.weather_icon)
    .bind(params.sunrise)
    .bind(params.sunset)
    .bind(params.observed_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete readings older than the retention cutoff. Returns the deleted row
/// count for the maintenance report.
pub async fn delete_expired_readings(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM weather_readings WHERE recorded_at < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// All readings joined with city metadata, the feed for the latest-snapshot
/// reducer. No ordering guarantee — the reducer compares timestamps itself.
pub async fn list_readings_with_cities(
    pool: &PgPool,
) -> Result<Vec<ReadingWithCity>, sqlx::Error> {
    sqlx::query_as::<_, ReadingWithCity>(
        "SELECT r.city_id, r.recorded_at, r.reported_name, r.country,
                r.temp, r.feels_like, r.temp_min, r.temp_max,
                r.pressure, r.humidity, r.wind_speed, r.wind_deg,
                r.cloudiness, r.visibility,
                r.weather_main, r.weather_description, r.weather_icon,
                r.sunrise, r.sunset, r.observed_at,
                c.name AS city_name, c.latitude, c.longitude
         FROM weather_readings r
         JOIN cities c ON c.id = r.city_id",
    )
    .fetch_all(pool)
    .await
}
