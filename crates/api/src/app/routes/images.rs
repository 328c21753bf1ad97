use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Extension, Multipart, Path, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};

use storefront_catalog::{NewProductImage, ProductImagePatch};
use storefront_core::{DomainError, ProductId, ProductImageId};
use storefront_infra::MediaError;
use storefront_infra::media::MAX_UPLOAD_BYTES;

use crate::app::dto;
use crate::app::errors::{self, ApiError, JsonBody};
use crate::app::services::AppServices;

// Room for the multipart framing and the text fields around the file.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

pub fn router() -> Router {
    Router::new()
        .route(
            "/products/:id/images",
            get(list_images)
                .post(upload_image)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/images/:id", patch(update_image).delete(delete_image))
}

pub async fn list_images(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: ProductId = errors::parse_id(&id)?;
    let images = services.store.images(id).await?;
    let media = services.media.as_ref();
    Ok(Json(images.iter().map(|img| dto::image_to_json(img, media)).collect::<Vec<_>>()).into_response())
}

/// Multipart upload with an `image` file and optional `alt_text` and `is_feature`.
pub async fn upload_image(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let product: ProductId = errors::parse_id(&id)?;
    // Fail before touching the disk when the product does not exist.
    services.store.product(product).await?;

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut alt_text: Option<String> = None;
    let mut is_feature = false;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((name, bytes.to_vec()));
            }
            Some("alt_text") => {
                let text = field.text().await.map_err(multipart_error)?;
                alt_text = Some(text).filter(|t| !t.trim().is_empty());
            }
            Some("is_feature") => {
                let text = field.text().await.map_err(multipart_error)?;
                is_feature = parse_checkbox(&text)?;
            }
            _ => {}
        }
    }

    let (name, bytes) = file
        .ok_or_else(|| DomainError::field("image", "required", "No file was submitted."))?;
    let path = services.media.save(&name, &bytes).await?;

    let new = NewProductImage {
        product,
        image: path.clone(),
        alt_text,
        is_feature,
    };
    match services.store.add_image(new).await {
        Ok(image) => Ok((
            StatusCode::CREATED,
            Json(dto::image_to_json(&image, services.media.as_ref())),
        )
            .into_response()),
        Err(err) => {
            services.discard_files(std::slice::from_ref(&path)).await;
            Err(err.into())
        }
    }
}

pub async fn update_image(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<ProductImagePatch>,
) -> Result<Response, ApiError> {
    let id: ProductImageId = errors::parse_id(&id)?;
    let image = services.store.update_image(id, body).await?;
    Ok(Json(dto::image_to_json(&image, services.media.as_ref())).into_response())
}

pub async fn delete_image(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: ProductImageId = errors::parse_id(&id)?;
    let image = services.store.delete_image(id).await?;
    services.discard_files(std::slice::from_ref(&image.image)).await;
    Ok(StatusCode::NO_CONTENT.into_response())
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return MediaError::TooLarge { max: MAX_UPLOAD_BYTES }.into();
    }
    ApiError::bad_request(format!("malformed multipart body: {}", err.body_text()))
}

/// Form checkbox semantics: absent or empty is false.
fn parse_checkbox(value: &str) -> Result<bool, ApiError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "off" | "no" => Ok(false),
        "1" | "true" | "on" | "yes" => Ok(true),
        _ => Err(DomainError::field("is_feature", "invalid", "Enter a valid boolean.").into()),
    }
}
