//! Serves stored media files below the configured media URL prefix.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use storefront_catalog::ImagePath;
use storefront_core::DomainError;
use storefront_infra::content_type;

use crate::app::errors::ApiError;
use crate::app::services::AppServices;

/// Router mounted at `prefix` (which ends in `/`), or `None` when media is
/// served from another host.
pub fn router(prefix: &str) -> Option<Router> {
    if !prefix.starts_with('/') {
        return None;
    }
    Some(Router::new().route(&format!("{prefix}*path"), get(serve_media)))
}

pub async fn serve_media(
    Extension(services): Extension<Arc<AppServices>>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let path = ImagePath::parse(&path).map_err(|_| DomainError::not_found())?;
    let bytes = services.media.read(&path).await?;
    Ok(([(header::CONTENT_TYPE, content_type(&path))], bytes).into_response())
}
