//! OpenWeatherMap current-weather client.
//!
//! Fetches current conditions by coordinate pair from the OWM 2.5 API.
//! See: https://openweathermap.org/current

use serde::Deserialize;

use crate::errors::AppError;

const OWM_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Client for the OpenWeatherMap current-weather API.
#[derive(Debug, Clone)]
pub struct OwmClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

// --- OpenWeatherMap JSON response types ---
//
// Every field the ingestion cycle persists is required here, so a response
// missing any of them fails deserialization and the city is skipped for
// this cycle. Only description/icon/country are genuinely optional.

/// One current-weather observation as returned by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentWeather {
    pub weather: Vec<Condition>,
    pub main: MainReadings,
    pub visibility: i32,
    pub wind: Wind,
    pub clouds: Clouds,
    pub sys: Sys,
    /// Observation time, UNIX epoch seconds
    pub dt: i64,
    /// Provider's name for the location (may differ from the registered name)
    pub name: String,
}

/// Weather classification block. OWM sends an array but only the first
/// entry is the primary condition.
#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    pub main: String,
    pub description: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: i32,
    pub humidity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Wind {
    pub speed: f64,
    pub deg: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Clouds {
    pub all: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sys {
    /// UNIX epoch seconds
    pub sunrise: i64,
    /// UNIX epoch seconds
    pub sunset: i64,
    pub country: Option<String>,
}

impl CurrentWeather {
    /// The primary (first) weather condition.
    pub fn primary_condition(&self) -> Option<&Condition> {
        self.weather.first()
    }
}

impl OwmClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, OWM_API_URL)
    }

    /// Construct a client against a non-default base URL (test seam).
    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
        }
    }

    /// Fetch current weather for a coordinate pair.
    ///
    /// Any transport error, non-success status, undeserializable body, or
    /// empty `weather` array is an `ExternalServiceError`; the caller treats
    /// it as a per-city skip.
    pub async fn fetch_current(&self, lat: f64, lon: f64) -> Result<CurrentWeather, AppError> {
        let url = format!(
            "{}?lat={:.4}&lon={:.4}&appid={}&units=metric",
            self.base_url, lat, lon, self.api_key
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            AppError::ExternalServiceError(format!("OpenWeatherMap request failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "OpenWeatherMap returned HTTP {}",
                response.status()
            )));
        }

        let current: CurrentWeather = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("OpenWeatherMap JSON parse error: {}", e))
        })?;

        if current.weather.is_empty() {
            return Err(AppError::ExternalServiceError(
                "OpenWeatherMap returned empty weather array".to_string(),
            ));
        }

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_body() -> serde_json::Value {
        serde_json::json!({
            "weather": [
                { "id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d" }
            ],
            "main": {
                "temp": 18.3,
                "feels_like": 17.9,
                "temp_min": 16.1,
                "temp_max": 20.2,
                "pressure": 1015,
                "humidity": 62
            },
            "visibility": 10000,
            "wind": { "speed": 4.6, "deg": 220 },
            "clouds": { "all": 75 },
            "sys": { "country": "JP", "sunrise": 1740000000i64, "sunset": 1740040000i64 },
            "dt": 1740020000i64,
            "name": "Tokyo"
        })
    }

    #[tokio::test]
    async fn test_fetch_current_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(query_param("lat", "35.6897"))
            .and(query_param("lon", "139.6922"))
            .and(query_param("appid", "test-key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
            .mount(&server)
            .await;

        let client = OwmClient::with_base_url("test-key", &server.uri());
        let current = client.fetch_current(35.689722, 139.692222).await.unwrap();

        assert_eq!(current.name, "Tokyo");
        assert_eq!(current.main.pressure, 1015);
        assert_eq!(current.sys.country.as_deref(), Some("JP"));
        assert_eq!(current.primary_condition().unwrap().main, "Clouds");
    }

    #[tokio::test]
    async fn test_fetch_current_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = OwmClient::with_base_url("test-key", &server.uri());
        let err = client.fetch_current(35.0, 139.0).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_fetch_current_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "weather": "not-an-array" })),
            )
            .mount(&server)
            .await;

        let client = OwmClient::with_base_url("test-key", &server.uri());
        let err = client.fetch_current(35.0, 139.0).await.unwrap_err();
        assert!(err.to_string().contains("JSON parse error"));
    }

    #[tokio::test]
    async fn test_fetch_current_missing_field() {
        // main.humidity absent — deserialization must fail, the city is skipped
        let mut body = sample_body();
        body["main"].as_object_mut().unwrap().remove("humidity");

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = OwmClient::with_base_url("test-key", &server.uri());
        assert!(client.fetch_current(35.0, 139.0).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_current_empty_weather_array() {
        let mut body = sample_body();
        body["weather"] = serde_json::json!([]);

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = OwmClient::with_base_url("test-key", &server.uri());
        let err = client.fetch_current(35.0, 139.0).await.unwrap_err();
        assert!(err.to_string().contains("empty weather array"));
    }
}
