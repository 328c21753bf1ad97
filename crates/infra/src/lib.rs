//! Infrastructure layer: configuration, catalog stores, schema and media files.

pub mod config;
pub mod db;
pub mod media;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use media::{LocalMediaStore, MediaError, MediaStore, content_type};
pub use store::{CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, StoreError, StoreResult};
