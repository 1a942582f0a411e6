//! City seed file loader.
//!
//! Reads the JSON reference list of registered cities from
//! `DATA_DIR/cities.json` at startup. Each entry carries an externally
//! assigned id and the coordinates used for the provider lookup.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading the city seed file.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("IO error reading city seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One city entry from the seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct CitySeed {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Load and parse the city seed file from disk.
pub fn load_cities_file(path: &Path) -> Result<Vec<CitySeed>, SeedError> {
    let json = std::fs::read_to_string(path)?;
    parse_cities(&json)
}

/// Parse city seed JSON content.
pub fn parse_cities(json: &str) -> Result<Vec<CitySeed>, SeedError> {
    let cities: Vec<CitySeed> = serde_json::from_str(json)?;
    Ok(cities)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let json = r#"[
            { "id": 1, "name": "Tokyo", "latitude": 35.689722, "longitude": 139.692222 },
            { "id": 2, "name": "Osaka", "latitude": 34.693889, "longitude": 135.502222 }
        ]"#;
        let cities = parse_cities(json).unwrap();
        assert_eq!(cities.len(), 2);
        assert_eq!(cities[0].id, 1);
        assert_eq!(cities[0].name, "Tokyo");
        assert!((cities[1].latitude - 34.693889).abs() < 1e-9);
    }

    #[test]
    fn test_parse_empty_array() {
        let cities = parse_cities("[]").unwrap();
        assert!(cities.is_empty());
    }

    #[test]
    fn test_parse_malformed_json() {
        assert!(parse_cities("{ not json").is_err());
    }

    #[test]
    fn test_parse_missing_field() {
        let json = r#"[ { "id": 1, "name": "Tokyo", "latitude": 35.689722 } ]"#;
        assert!(parse_cities(json).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_cities_file(Path::new("/nonexistent/cities.json")).unwrap_err();
        assert!(matches!(err, SeedError::Io(_)));
    }
}
