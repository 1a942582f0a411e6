//! Weather ingestion cycle and background refresh scheduler.
//!
//! One cycle: list registered cities, fan out one OpenWeatherMap fetch per
//! city, normalize and upsert each reading on the `(city_id, recorded_at)`
//! idempotency key, then sweep out readings older than the retention window.
//!
//! Per-city failures (provider or storage) are logged and skipped — partial
//! success is success. Only a failure to list the cities at all, or an empty
//! city list, escapes the cycle. The retention sweep is best-effort: its
//! failure is logged but the cycle still reports success.

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::db::models::City;
use crate::db::queries::{self, UpsertReadingParams};
use crate::errors::AppError;
use crate::helpers::{dec_to_f64, epoch_secs_to_utc, f64_to_decimal_clamped};
use crate::services::owm::{CurrentWeather, OwmClient};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Readings older than this are deleted by the retention sweep.
const RETENTION_DAYS: i64 = 7;

/// Sleep between scheduler cycles when a cycle itself fails (seconds).
const SCHEDULER_ERROR_SLEEP_SECS: u64 = 60;

// ---------------------------------------------------------------------------
// Refresh state (in-memory, shared via Arc<RwLock<>>)
// ---------------------------------------------------------------------------

/// Status of a single city's last refresh attempt.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CityRefreshStatus {
    pub city_id: i64,
    pub city_name: String,
    pub recorded_at: Option<DateTime<Utc>>,
    /// "updated" or "error: ..."
    pub last_result: String,
}

/// Global refresh state, exposed via the status endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RefreshState {
    pub active: bool,
    pub next_wakeup_at: Option<DateTime<Utc>>,
    pub last_cycle_completed_at: Option<DateTime<Utc>>,
    pub last_cycle_duration_ms: Option<u64>,
    pub total_cycles: u64,
    pub cities: Vec<CityRefreshStatus>,
}

impl RefreshState {
    pub fn new() -> Self {
        Self {
            active: true,
            next_wakeup_at: None,
            last_cycle_completed_at: None,
            last_cycle_duration_ms: None,
            total_cycles: 0,
            cities: Vec::new(),
        }
    }
}

/// Shared refresh state handle.
pub type SharedRefreshState = Arc<RwLock<RefreshState>>;

/// Outcome of one refresh cycle, reported to the HTTP trigger.
#[derive(Debug)]
pub struct RefreshOutcome {
    pub cities_total: usize,
    pub cities_updated: usize,
    /// `None` when the retention sweep failed (logged, not fatal).
    pub expired_removed: Option<u64>,
}

// ---------------------------------------------------------------------------
// Refresh cycle
// ---------------------------------------------------------------------------

/// Run one full ingestion cycle.
///
/// Errors only when the city list cannot be read (`DatabaseError`) or is
/// empty (`NotFound` — a configuration problem, not a runtime fault).
pub async fn run_refresh_cycle(
    pool: &PgPool,
    owm_client: &OwmClient,
    state: &SharedRefreshState,
) -> Result<RefreshOutcome, AppError> {
    let cycle_start = Utc::now();

    let cities = queries::list_cities(pool).await?;
    if cities.is_empty() {
        return Err(AppError::NotFound("No cities registered".to_string()));
    }

    // Fan out one fetch-then-upsert future per city. Each city's row is
    // disjoint, so no coordination beyond the keyed upsert is needed.
    let refreshes = cities.iter().map(|city| refresh_city(pool, owm_client, city));
    let results = join_all(refreshes).await;

    let mut statuses = Vec::with_capacity(cities.len());
    let mut cities_updated = 0;
    for (city, result) in cities.iter().zip(results) {
        let status = match result {
            CityResult::Updated { recorded_at } => {
                cities_updated += 1;
                CityRefreshStatus {
                    city_id: city.id,
                    city_name: city.name.clone(),
                    recorded_at: Some(recorded_at),
                    last_result: "updated".to_string(),
                }
            }
            CityResult::Failed(msg) => CityRefreshStatus {
                city_id: city.id,
                city_name: city.name.clone(),
                recorded_at: None,
                last_result: format!("error: {}", msg),
            },
        };
        statuses.push(status);
    }

    // Retention sweep — best-effort maintenance; the primary duty (fetching
    // current data) has already completed.
    let cutoff = retention_cutoff(Utc::now());
    let expired_removed = match queries::delete_expired_readings(pool, cutoff).await {
        Ok(count) => {
            if count > 0 {
                tracing::info!("Retention sweep removed {} expired readings", count);
            }
            Some(count)
        }
        Err(e) => {
            tracing::error!("Retention sweep failed: {}", e);
            None
        }
    };

    let cycle_duration_ms = (Utc::now() - cycle_start).num_milliseconds().max(0) as u64;
    {
        let mut s = state.write().await;
        s.cities = statuses;
        s.last_cycle_completed_at = Some(Utc::now());
        s.last_cycle_duration_ms = Some(cycle_duration_ms);
        s.total_cycles += 1;
    }

    tracing::info!(
        "Refresh cycle complete in {}ms: {}/{} cities updated",
        cycle_duration_ms,
        cities_updated,
        cities.len(),
    );

    Ok(RefreshOutcome {
        cities_total: cities.len(),
        cities_updated,
        expired_removed,
    })
}

// ---------------------------------------------------------------------------
// Single-city refresh
// ---------------------------------------------------------------------------

enum CityResult {
    Updated { recorded_at: DateTime<Utc> },
    Failed(String),
}

async fn refresh_city(pool: &PgPool, owm_client: &OwmClient, city: &City) -> CityResult {
    let lat = dec_to_f64(city.latitude);
    let lon = dec_to_f64(city.longitude);

    let current = match owm_client.fetch_current(lat, lon).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Fetch failed for city {} ({}): {}", city.id, city.name, e);
            return CityResult::Failed(e.to_string());
        }
    };

    let recorded_at = Utc::now();
    let params = match build_reading_params(city.id, recorded_at, &current) {
        Some(p) => p,
        None => {
            tracing::warn!(
                "Malformed provider timestamps for city {} ({}), skipping",
                city.id,
                city.name,
            );
            return CityResult::Failed("malformed provider timestamps".to_string());
        }
    };

    match queries::upsert_reading(pool, params).await {
        Ok(()) => CityResult::Updated { recorded_at },
        Err(e) => {
            tracing::warn!("Upsert failed for city {} ({}): {}", city.id, city.name, e);
            CityResult::Failed(format!("storage error: {}", e))
        }
    }
}

/// Normalize a provider response into upsert parameters.
///
/// Temperatures and wind speed are clamped to the NUMERIC(5,2) column range,
/// wind direction is normalized into 0–359, and the three epoch fields are
/// converted to timestamps. Returns `None` when an epoch is unrepresentable —
/// a malformed field that skips the city.
pub(crate) fn build_reading_params(
    city_id: i64,
    recorded_at: DateTime<Utc>,
    current: &CurrentWeather,
) -> Option<UpsertReadingParams> {
    // fetch_current guarantees a non-empty weather array
    let condition = current.primary_condition()?;

    Some(UpsertReadingParams {
        city_id,
        recorded_at,
        reported_name: current.name.clone(),
        country: current.sys.country.clone(),
        temp: f64_to_decimal_clamped(current.main.temp),
        feels_like: f64_to_decimal_clamped(current.main.feels_like),
        temp_min: f64_to_decimal_clamped(current.main.temp_min),
        temp_max: f64_to_decimal_clamped(current.main.temp_max),
        pressure: current.main.pressure,
        humidity: current.main.humidity,
        wind_speed: f64_to_decimal_clamped(current.wind.speed),
        wind_deg: normalize_wind_deg(current.wind.deg),
        cloudiness: current.clouds.all,
        visibility: current.visibility,
        weather_main: condition.main.clone(),
        weather_description: condition.description.clone(),
        weather_icon: condition.icon.clone(),
        sunrise: epoch_secs_to_utc(current.sys.sunrise)?,
        sunset: epoch_secs_to_utc(current.sys.sunset)?,
        observed_at: epoch_secs_to_utc(current.dt)?,
    })
}

/// Normalize a wind direction into 0–359 degrees.
pub(crate) fn normalize_wind_deg(deg: f64) -> i32 {
    if !deg.is_finite() {
        return 0;
    }
    (((deg.round() as i64 % 360) + 360) % 360) as i32
}

/// The retention cutoff: readings recorded strictly before this are expired.
pub(crate) fn retention_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(RETENTION_DAYS)
}

// ---------------------------------------------------------------------------
// Background scheduler
// ---------------------------------------------------------------------------

/// Run the background refresh scheduler. Never returns (runs until process
/// exit); spawn via `tokio::spawn(run_scheduler(...))`.
///
/// Overlap with a manual HTTP-triggered cycle is safe — both paths write
/// through the same keyed upsert — at the cost of duplicate provider calls.
pub async fn run_scheduler(
    pool: PgPool,
    owm_client: OwmClient,
    state: SharedRefreshState,
    interval_secs: u64,
) {
    tracing::info!(
        "Background refresh scheduler started (interval {}s)",
        interval_secs
    );

    loop {
        let sleep_secs = match run_refresh_cycle(&pool, &owm_client, &state).await {
            Ok(outcome) => {
                tracing::debug!(
                    "Scheduled refresh: {}/{} cities updated, {} expired readings removed",
                    outcome.cities_updated,
                    outcome.cities_total,
                    outcome
                        .expired_removed
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "?".to_string()),
                );
                interval_secs
            }
            Err(AppError::NotFound(msg)) => {
                tracing::warn!("Scheduled refresh skipped: {}", msg);
                interval_secs
            }
            Err(e) => {
                tracing::error!("Scheduled refresh failed: {}", e);
                SCHEDULER_ERROR_SLEEP_SECS
            }
        };

        {
            let mut s = state.write().await;
            s.next_wakeup_at = Some(Utc::now() + Duration::seconds(sleep_secs as i64));
        }

        tokio::time::sleep(std::time::Duration::from_secs(sleep_secs)).await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::owm::{Clouds, Condition, MainReadings, Sys, Wind};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn sample_current() -> CurrentWeather {
        CurrentWeather {
            weather: vec![Condition {
                main: "Clouds".to_string(),
                description: Some("broken clouds".to_string()),
                icon: Some("04d".to_string()),
            }],
            main: MainReadings {
                temp: 18.3,
                feels_like: 17.9,
                temp_min: 16.1,
                temp_max: 20.2,
                pressure: 1015,
                humidity: 62,
            },
            visibility: 10000,
            wind: Wind {
                speed: 4.6,
                deg: 220.0,
            },
            clouds: Clouds { all: 75 },
            sys: Sys {
                sunrise: 1_740_000_000,
                sunset: 1_740_040_000,
                country: Some("JP".to_string()),
            },
            dt: 1_740_020_000,
            name: "Tokyo".to_string(),
        }
    }

    #[test]
    fn test_build_reading_params_normal() {
        let recorded_at = Utc::now();
        let params = build_reading_params(1, recorded_at, &sample_current()).unwrap();

        assert_eq!(params.city_id, 1);
        assert_eq!(params.recorded_at, recorded_at);
        assert_eq!(params.reported_name, "Tokyo");
        assert_eq!(params.temp, Decimal::from_str("18.30").unwrap());
        assert_eq!(params.wind_deg, 220);
        assert_eq!(params.sunrise.timestamp(), 1_740_000_000);
        assert_eq!(params.observed_at.timestamp(), 1_740_020_000);
        assert_eq!(params.weather_description.as_deref(), Some("broken clouds"));
    }

    #[test]
    fn test_build_reading_params_clamps_temperatures() {
        let mut current = sample_current();
        current.main.temp = 1500.0;
        current.main.temp_min = -1500.0;

        let params = build_reading_params(1, Utc::now(), &current).unwrap();
        assert_eq!(params.temp, Decimal::from_str("999.99").unwrap());
        assert_eq!(params.temp_min, Decimal::from_str("-999.99").unwrap());
    }

    #[test]
    fn test_build_reading_params_bad_epoch() {
        let mut current = sample_current();
        current.sys.sunrise = i64::MAX;
        assert!(build_reading_params(1, Utc::now(), &current).is_none());
    }

    #[test]
    fn test_build_reading_params_optional_fields_absent() {
        let mut current = sample_current();
        current.weather[0].description = None;
        current.weather[0].icon = None;
        current.sys.country = None;

        let params = build_reading_params(1, Utc::now(), &current).unwrap();
        assert_eq!(params.weather_description, None);
        assert_eq!(params.weather_icon, None);
        assert_eq!(params.country, None);
    }

    #[test]
    fn test_normalize_wind_deg_in_range() {
        assert_eq!(normalize_wind_deg(0.0), 0);
        assert_eq!(normalize_wind_deg(359.0), 359);
    }

    #[test]
    fn test_normalize_wind_deg_wraps() {
        assert_eq!(normalize_wind_deg(360.0), 0);
        assert_eq!(normalize_wind_deg(725.0), 5);
    }

    #[test]
    fn test_normalize_wind_deg_negative() {
        assert_eq!(normalize_wind_deg(-45.0), 315);
    }

    #[test]
    fn test_normalize_wind_deg_rounds() {
        assert_eq!(normalize_wind_deg(247.6), 248);
    }

    #[test]
    fn test_normalize_wind_deg_non_finite() {
        assert_eq!(normalize_wind_deg(f64::NAN), 0);
    }

    #[test]
    fn test_retention_cutoff_window() {
        let now = "2026-03-08T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let cutoff = retention_cutoff(now);

        let eight_days_old = now - Duration::days(8);
        let six_days_old = now - Duration::days(6);
        assert!(eight_days_old < cutoff, "8-day-old reading must be expired");
        assert!(six_days_old >= cutoff, "6-day-old reading must be retained");
    }
}
