//! Shared helpers for Decimal ↔ f64 and epoch conversions.
//!
//! Two f64→Decimal strategies exist because weather values and geo coordinates
//! have different storage requirements:
//!
//! - `f64_to_decimal_clamped`: rounds to 2 decimal places and clamps to the
//!   NUMERIC(5,2) column range (weather: temperature, wind speed)
//! - `f64_to_decimal_full`: preserves full f64 precision (geo: lat, lon)
//!
//! Both return `Decimal::ZERO` for non-finite inputs (NaN, ±Inf).

use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Largest value a NUMERIC(5,2) weather column can hold.
const WEATHER_COLUMN_MAX: f64 = 999.99;

/// Smallest value a NUMERIC(5,2) weather column can hold.
const WEATHER_COLUMN_MIN: f64 = -999.99;

/// Convert an f64 to Decimal, rounded to 2 decimal places and clamped to the
/// NUMERIC(5,2) range.
///
/// Out-of-range provider values are clamped rather than rejected so a single
/// absurd reading cannot fail the whole upsert.
pub(crate) fn f64_to_decimal_clamped(v: f64) -> Decimal {
    if !v.is_finite() {
        tracing::warn!(
            "f64_to_decimal_clamped received non-finite value {}, defaulting to 0",
            v
        );
        return Decimal::ZERO;
    }
    let bounded = v.clamp(WEATHER_COLUMN_MIN, WEATHER_COLUMN_MAX);
    Decimal::from_str_exact(&format!("{:.2}", bounded)).unwrap_or_default()
}

/// Convert an f64 to Decimal preserving full precision.
///
/// Used for latitude/longitude where full precision matters for the provider
/// coordinate lookup.
pub(crate) fn f64_to_decimal_full(v: f64) -> Decimal {
    if !v.is_finite() {
        tracing::warn!(
            "f64_to_decimal_full received non-finite value {}, defaulting to 0",
            v
        );
        return Decimal::ZERO;
    }
    Decimal::from_f64(v).unwrap_or_else(|| Decimal::new(v as i64, 0))
}

/// Convert a Decimal to f64, defaulting to 0.0 for values that can't be represented.
pub(crate) fn dec_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Convert provider UNIX-epoch seconds to a `DateTime<Utc>`.
///
/// Returns `None` for epochs outside chrono's representable range; callers
/// treat that as a malformed provider field.
pub(crate) fn epoch_secs_to_utc(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}
