//! Configuration loading and representation.
//!
//! Everything comes from environment variables. Unset variables fall back to
//! defaults; set but malformed variables are an error.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use storefront_catalog::{CatalogPolicy, DEFAULT_UPLOAD_TO, UploadTo};

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_MEDIA_ROOT: &str = "media";
pub const DEFAULT_MEDIA_URL: &str = "/media/";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind: SocketAddr,
    /// `None` runs on the in-memory store.
    pub database_url: Option<String>,
    pub media_root: PathBuf,
    /// Prefix of public media URLs, always ending in `/`.
    pub media_url: String,
    pub upload_to: UploadTo,
    pub policy: CatalogPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: None,
            media_root: PathBuf::from(DEFAULT_MEDIA_ROOT),
            media_url: DEFAULT_MEDIA_URL.to_string(),
            upload_to: UploadTo::default(),
            policy: CatalogPolicy::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = CatalogPolicy::default();

        let bind_raw = get("STOREFRONT_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw.trim().parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
            var: "STOREFRONT_BIND",
            value: bind_raw.clone(),
            reason: e.to_string(),
        })?;

        let media_url = get("MEDIA_URL").unwrap_or_else(|| DEFAULT_MEDIA_URL.to_string());
        let media_url = normalise_media_url(media_url.trim())?;

        let upload_raw = get("IMAGE_UPLOAD_TO").unwrap_or_else(|| DEFAULT_UPLOAD_TO.to_string());
        let upload_to = UploadTo::new(&upload_raw).map_err(|e| ConfigError::Invalid {
            var: "IMAGE_UPLOAD_TO",
            value: upload_raw.clone(),
            reason: e.to_string(),
        })?;

        let flag = |var: &'static str, default: bool| -> Result<bool, ConfigError> {
            match get(var) {
                Some(value) => parse_bool(var, &value),
                None => Ok(default),
            }
        };

        Ok(Self {
            bind,
            database_url: get("DATABASE_URL"),
            media_root: get("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MEDIA_ROOT)),
            media_url,
            upload_to,
            policy: CatalogPolicy {
                enforce_specification_type: flag(
                    "CATALOG_ENFORCE_SPECIFICATION_TYPE",
                    defaults.enforce_specification_type,
                )?,
                unique_specification_values: flag(
                    "CATALOG_UNIQUE_SPECIFICATION_VALUES",
                    defaults.unique_specification_values,
                )?,
                exclusive_feature_image: flag(
                    "CATALOG_EXCLUSIVE_FEATURE_IMAGE",
                    defaults.exclusive_feature_image,
                )?,
            },
        })
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "expected a boolean (true/false, 1/0, yes/no, on/off)".to_string(),
        }),
    }
}

fn normalise_media_url(value: &str) -> Result<String, ConfigError> {
    let absolute = value.starts_with('/') || value.starts_with("http://") || value.starts_with("https://");
    if !absolute {
        return Err(ConfigError::Invalid {
            var: "MEDIA_URL",
            value: value.to_string(),
            reason: "must start with '/' or be an absolute http(s) URL".to_string(),
        });
    }
    if value.trim_end_matches('/').is_empty() {
        return Err(ConfigError::Invalid {
            var: "MEDIA_URL",
            value: value.to_string(),
            reason: "must name a path below '/'; a bare '/' would shadow every other route"
                .to_string(),
        });
    }
    Ok(if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{value}/")
    })
}
