//! Public storefront pages: home listing, category and product detail.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use storefront_catalog::ProductQuery;
use storefront_core::{DomainError, Slug};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::urls;

pub fn router() -> Router {
    Router::new()
        .route(urls::STORE_HOME_PATH, get(store_home))
        .route(urls::CATEGORY_DETAIL_PATH, get(category_detail))
        .route(urls::PRODUCT_DETAIL_PATH, get(product_detail))
}

/// Active products, newest first.
pub async fn store_home(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Response, ApiError> {
    let products = services.store.products(ProductQuery::storefront()).await?;

    Ok(Json(json!({
        "url": urls::store_home(),
        "products": products.iter().map(dto::product_to_json).collect::<Vec<_>>(),
    }))
    .into_response())
}

pub async fn category_detail(
    Extension(services): Extension<Arc<AppServices>>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    // Anything that is not a valid slug cannot name a category.
    let slug = Slug::parse(&slug).map_err(|_| DomainError::not_found())?;
    let detail = services.store.category_detail(&slug).await?;
    if !detail.category.is_active {
        return Err(DomainError::not_found().into());
    }

    Ok(Json(dto::category_detail_to_json(&detail)).into_response())
}

pub async fn product_detail(
    Extension(services): Extension<Arc<AppServices>>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let slug = Slug::parse(&slug).map_err(|_| DomainError::not_found())?;
    let detail = services.store.storefront_product(&slug).await?;

    Ok(Json(dto::product_detail_to_json(&detail, services.media.as_ref())).into_response())
}
