use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde_json::json;

use storefront_catalog::{ImagePath, NewProduct, NewSpecificationValue, ProductPatch, ProductQuery};
use storefront_core::{CategoryId, ProductId, ProductSpecificationId, SpecificationValueId};

use crate::app::dto;
use crate::app::errors::{self, ApiError, JsonBody};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route(
            "/products/:id/values",
            get(list_specification_values).post(set_specification_value),
        )
        .route("/values/:id", delete(delete_specification_value))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::ProductListParams>,
) -> Result<Response, ApiError> {
    let mut query = ProductQuery {
        active_only: params.active_only,
        ..ProductQuery::default()
    };
    if let Some(category) = params.category.as_deref() {
        let category: CategoryId = errors::parse_id(category)?;
        query = query.in_category(category, params.include_subcategories);
    }

    let products = services.store.products(query).await?;
    Ok(Json(products.iter().map(dto::product_to_json).collect::<Vec<_>>()).into_response())
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<NewProduct>,
) -> Result<Response, ApiError> {
    let product = services.store.create_product(body).await?;
    Ok((StatusCode::CREATED, Json(dto::product_to_json(&product))).into_response())
}

/// Full detail, regardless of the product's active flag.
pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: ProductId = errors::parse_id(&id)?;
    let detail = services.store.product_detail(id).await?;
    Ok(Json(dto::product_detail_to_json(&detail, services.media.as_ref())).into_response())
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<ProductPatch>,
) -> Result<Response, ApiError> {
    let id: ProductId = errors::parse_id(&id)?;
    let product = services.store.update_product(id, body).await?;
    Ok(Json(dto::product_to_json(&product)).into_response())
}

/// Deletes the product, its specification values and its images, files included.
pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: ProductId = errors::parse_id(&id)?;
    let removed = services.store.delete_product(id).await?;
    let files: Vec<ImagePath> = removed.images.iter().map(|img| img.image.clone()).collect();
    services.discard_files(&files).await;

    Ok(Json(json!({
        "id": removed.product.id.to_string(),
        "deleted_values": removed.values.len(),
        "deleted_images": removed.images.len(),
    }))
    .into_response())
}

pub async fn list_specification_values(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: ProductId = errors::parse_id(&id)?;
    services.store.product(id).await?;
    let values = services.store.specification_values(id).await?;
    Ok(Json(values.iter().map(dto::specification_value_to_json).collect::<Vec<_>>()).into_response())
}

pub async fn set_specification_value(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::SetSpecificationValueRequest>,
) -> Result<Response, ApiError> {
    let product: ProductId = errors::parse_id(&id)?;
    let specification: ProductSpecificationId = errors::parse_id(&body.specification)?;
    let value = services
        .store
        .set_specification_value(NewSpecificationValue {
            product,
            specification,
            value: body.value,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(dto::specification_value_to_json(&value))).into_response())
}

pub async fn delete_specification_value(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: SpecificationValueId = errors::parse_id(&id)?;
    services.store.delete_specification_value(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
