use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};

use storefront_catalog::{NewProductSpecification, NewProductType, ProductTypePatch};
use storefront_core::{ProductSpecificationId, ProductTypeId};

use crate::app::dto;
use crate::app::errors::{self, ApiError, JsonBody};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/product-types", get(list_product_types).post(create_product_type))
        .route(
            "/product-types/:id",
            get(get_product_type)
                .patch(update_product_type)
                .delete(delete_product_type),
        )
        .route(
            "/product-types/:id/specifications",
            get(list_specifications).post(create_specification),
        )
        .route("/specifications/:id", delete(delete_specification))
}

pub async fn list_product_types(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Response, ApiError> {
    let types = services.store.product_types().await?;
    Ok(Json(types.iter().map(dto::product_type_to_json).collect::<Vec<_>>()).into_response())
}

pub async fn create_product_type(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<NewProductType>,
) -> Result<Response, ApiError> {
    let product_type = services.store.create_product_type(body).await?;
    Ok((StatusCode::CREATED, Json(dto::product_type_to_json(&product_type))).into_response())
}

pub async fn get_product_type(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: ProductTypeId = errors::parse_id(&id)?;
    let product_type = services.store.product_type(id).await?;
    Ok(Json(dto::product_type_to_json(&product_type)).into_response())
}

pub async fn update_product_type(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<ProductTypePatch>,
) -> Result<Response, ApiError> {
    let id: ProductTypeId = errors::parse_id(&id)?;
    let product_type = services.store.update_product_type(id, body).await?;
    Ok(Json(dto::product_type_to_json(&product_type)).into_response())
}

/// Refused while specifications or products still use the type.
pub async fn delete_product_type(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: ProductTypeId = errors::parse_id(&id)?;
    services.store.delete_product_type(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn list_specifications(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: ProductTypeId = errors::parse_id(&id)?;
    services.store.product_type(id).await?;
    let specs = services.store.specifications(id).await?;
    Ok(Json(specs.iter().map(dto::specification_to_json).collect::<Vec<_>>()).into_response())
}

pub async fn create_specification(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::CreateSpecificationRequest>,
) -> Result<Response, ApiError> {
    let product_type: ProductTypeId = errors::parse_id(&id)?;
    let spec = services
        .store
        .create_specification(NewProductSpecification {
            product_type,
            name: body.name,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(dto::specification_to_json(&spec))).into_response())
}

pub async fn delete_specification(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: ProductSpecificationId = errors::parse_id(&id)?;
    services.store.delete_specification(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
