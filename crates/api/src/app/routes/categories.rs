use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use storefront_catalog::{CategoryPatch, NewCategory};
use storefront_core::CategoryId;

use crate::app::dto;
use crate::app::errors::{self, ApiError, JsonBody};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/:id",
            get(get_category).patch(update_category).delete(delete_category),
        )
}

/// The whole tree in pre-order.
pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Response, ApiError> {
    let tree = services.store.category_tree().await?;
    Ok(Json(dto::category_tree_to_json(&tree)).into_response())
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<NewCategory>,
) -> Result<Response, ApiError> {
    let category = services.store.create_category(body).await?;
    Ok((StatusCode::CREATED, Json(dto::category_to_json(&category))).into_response())
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: CategoryId = errors::parse_id(&id)?;
    let category = services.store.category(id).await?;
    Ok(Json(dto::category_to_json(&category)).into_response())
}

/// Rename, re-slug, (de)activate or move. `"parent": null` moves to the root.
pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<CategoryPatch>,
) -> Result<Response, ApiError> {
    let id: CategoryId = errors::parse_id(&id)?;
    let category = services.store.update_category(id, body).await?;
    Ok(Json(dto::category_to_json(&category)).into_response())
}

/// Deletes the category with all of its descendants.
pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: CategoryId = errors::parse_id(&id)?;
    let removed = services.store.delete_category(id).await?;
    Ok(Json(json!({
        "deleted": removed.iter().map(|c| c.id.to_string()).collect::<Vec<_>>(),
    }))
    .into_response())
}
