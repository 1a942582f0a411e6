// Hochu Weather API v0.1
use axum::{routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod db;
mod errors;
mod helpers;
mod routes;
mod services;

use config::AppConfig;
use routes::refresh::AppState;
use services::ingest::{RefreshState, SharedRefreshState};
use services::owm::OwmClient;

/// Maximum number of connections in the database pool.
const DB_POOL_MAX_CONNECTIONS: u32 = 5;
/// Minimum number of connections kept alive in the database pool.
const DB_POOL_MIN_CONNECTIONS: u32 = 2;

/// Hochu Weather API — OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Hochu Weather API",
        version = "0.1.0",
        description = "Near-real-time city weather API. Periodically ingests current \
            conditions from OpenWeatherMap for a fixed set of cities, caches them in \
            PostgreSQL with a 7-day retention window, and serves the latest reading \
            per city for display.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Weather", description = "Weather ingestion and latest readings"),
    ),
    paths(
        routes::health::health_check,
        routes::refresh::trigger_refresh,
        routes::refresh::get_refresh_status,
        routes::weather::get_latest_weather,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::refresh::RefreshResponse,
            routes::weather::CityWeather,
            services::ingest::RefreshState,
            services::ingest::CityRefreshStatus,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hochu_weather_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // Set up database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(DB_POOL_MAX_CONNECTIONS)
        .min_connections(DB_POOL_MIN_CONNECTIONS)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Seed cities from the JSON reference file
    let seed_path = std::path::Path::new(&config.data_dir).join("cities.json");
    match services::cities::load_cities_file(&seed_path) {
        Ok(cities) => {
            for city in &cities {
                match db::queries::upsert_city(&pool, city).await {
                    Ok(()) => {
                        tracing::info!(
                            "Seeded city '{}' ({:.4}, {:.4}) → id={}",
                            city.name,
                            city.latitude,
                            city.longitude,
                            city.id
                        );
                    }
                    Err(e) => {
                        tracing::error!("Failed to seed city '{}': {}", city.name, e);
                    }
                }
            }
            if cities.is_empty() {
                tracing::warn!("City seed file {} is empty", seed_path.display());
            }
        }
        Err(e) => {
            tracing::error!("Failed to load city seed {}: {}", seed_path.display(), e);
        }
    }

    // Create OpenWeatherMap client
    let owm_client = OwmClient::new(&config.openweather_api_key);

    // Create shared refresh state and spawn the background scheduler
    let refresh_state: SharedRefreshState = Arc::new(RwLock::new(RefreshState::new()));
    tokio::spawn(services::ingest::run_scheduler(
        pool.clone(),
        owm_client.clone(),
        refresh_state.clone(),
        config.refresh_interval_secs,
    ));

    // Build shared application state for the refresh trigger
    let app_state = AppState {
        pool: pool.clone(),
        owm_client,
        refresh_state: refresh_state.clone(),
    };

    // CORS — read-only API, restrict methods to GET
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    // Build router
    // The refresh trigger uses AppState; read routes use PgPool directly.
    let refresh_routes = Router::new()
        .route(
            "/api/v1/weather/refresh",
            get(routes::refresh::trigger_refresh),
        )
        .with_state(app_state);

    let weather_routes = Router::new()
        .route(
            "/api/v1/weather/latest",
            get(routes::weather::get_latest_weather),
        )
        .with_state(pool.clone());

    // Health check uses PgPool to verify DB connectivity
    let health_routes = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .with_state(pool);

    // Refresh status uses SharedRefreshState
    let status_routes = Router::new()
        .route(
            "/api/v1/refresh/status",
            get(routes::refresh::get_refresh_status),
        )
        .with_state(refresh_state);

    let app = Router::new()
        .merge(health_routes)
        .merge(refresh_routes)
        .merge(weather_routes)
        .merge(status_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
