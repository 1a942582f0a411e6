use axum::extract::State;
use axum::Json;
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;

use crate::db::{models, queries};
use crate::errors::{AppError, ErrorResponse};
use crate::helpers::dec_to_f64;
use crate::services::snapshot;

/// Response type for GET /api/v1/weather/latest — one city's latest reading.
#[derive(Debug, Serialize, ToSchema)]
pub struct CityWeather {
    /// Registered city identifier
    pub city_id: i64,
    /// Registered city name
    pub city_name: String,
    /// Latitude (WGS84)
    pub latitude: f64,
    /// Longitude (WGS84)
    pub longitude: f64,
    /// Provider's name for the location
    pub reported_name: String,
    /// ISO 3166 country code, when the provider supplied one
    pub country: Option<String>,
    /// Current temperature in °C
    pub temp: f64,
    /// Feels-like temperature in °C
    pub feels_like: f64,
    /// Minimum temperature in °C
    pub temp_min: f64,
    /// Maximum temperature in °C
    pub temp_max: f64,
    /// Atmospheric pressure in hPa
    pub pressure: i32,
    /// Relative humidity in percent
    pub humidity: i32,
    /// Wind speed in m/s
    pub wind_speed: f64,
    /// Wind direction in degrees (0–359)
    pub wind_deg: i32,
    /// 8-point compass label for the wind direction
    pub wind_direction: String,
    /// Cloud cover in percent
    pub cloudiness: i32,
    /// Visibility in metres
    pub visibility: i32,
    /// Provider weather classification (e.g. "Clouds")
    pub weather_main: String,
    /// Provider weather description (e.g. "broken clouds")
    pub weather_description: Option<String>,
    /// Provider icon code (e.g. "04d")
    pub weather_icon: Option<String>,
    /// Display icon name derived from the classification
    pub condition_icon: String,
    /// Sunrise time in RFC 3339 format
    pub sunrise: String,
    /// Sunset time in RFC 3339 format
    pub sunset: String,
    /// Provider observation time in RFC 3339 format
    pub observed_at: String,
    /// Ingestion time in RFC 3339 format
    pub recorded_at: String,
}

impl From<models::ReadingWithCity> for CityWeather {
    fn from(r: models::ReadingWithCity) -> Self {
        Self {
            city_id: r.city_id,
            city_name: r.city_name,
            latitude: dec_to_f64(r.latitude),
            longitude: dec_to_f64(r.longitude),
            reported_name: r.reported_name,
            country: r.country,
            temp: dec_to_f64(r.temp),
            feels_like: dec_to_f64(r.feels_like),
            temp_min: dec_to_f64(r.temp_min),
            temp_max: dec_to_f64(r.temp_max),
            pressure: r.pressure,
            humidity: r.humidity,
            wind_speed: dec_to_f64(r.wind_speed),
            wind_deg: r.wind_deg,
            wind_direction: snapshot::wind_compass(r.wind_deg).to_string(),
            cloudiness: r.cloudiness,
            visibility: r.visibility,
            condition_icon: snapshot::condition_icon(&r.weather_main).to_string(),
            weather_main: r.weather_main,
            weather_description: r.weather_description,
            weather_icon: r.weather_icon,
            sunrise: r.sunrise.to_rfc3339(),
            sunset: r.sunset.to_rfc3339(),
            observed_at: r.observed_at.to_rfc3339(),
            recorded_at: r.recorded_at.to_rfc3339(),
        }
    }
}

/// Get the latest weather reading for every city.
///
/// Joins the readings table with city metadata and reduces to one entry per
/// city by maximum `recorded_at`. Cities with no readings yet are absent;
/// an empty table yields an empty list.
#[utoipa::path(
    get,
    path = "/api/v1/weather/latest",
    tag = "Weather",
    responses(
        (status = 200, description = "Latest reading per city", body = Vec<CityWeather>),
        (status = 500, description = "Snapshot query failed", body = ErrorResponse),
    )
)]
pub async fn get_latest_weather(
    State(pool): State<PgPool>,
) -> Result<Json<Vec<CityWeather>>, AppError> {
    let rows = queries::list_readings_with_cities(&pool).await?;
    let latest = snapshot::latest_per_city(rows);

    // HashMap iteration order is arbitrary; sort for stable output
    let mut items: Vec<CityWeather> = latest.into_values().map(CityWeather::from).collect();
    items.sort_by_key(|w| w.city_id);
    Ok(Json(items))
}
