pub mod cities;
pub mod ingest;
pub mod owm;
pub mod snapshot;
