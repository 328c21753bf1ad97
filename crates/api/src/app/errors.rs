use std::str::FromStr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use storefront_core::{DomainError, FieldError};
use storefront_infra::{MediaError, StoreError};

/// Everything a handler can fail with. Converted into a JSON error body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    InvalidBody {
        field: Option<String>,
        message: String,
    },
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
            ApiError::Media(err) => media_error_to_response(err),
            ApiError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::InvalidBody { field, message } => (
                StatusCode::BAD_REQUEST,
                axum::Json(json!({
                    "error": "bad_request",
                    "message": message,
                    "field": field,
                })),
            )
                .into_response(),
        }
    }
}

/// `axum::Json` with rejections rendered as the JSON error body.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    let message = rejection.body_text();
    let field = match &rejection {
        JsonRejection::JsonDataError(_) => rejected_field(&message),
        _ => None,
    };
    ApiError::InvalidBody { field, message }
}

/// Field named by a serde data error, either as a path prefix
/// (`price: invalid type ...`) or quoted in backticks after `missing field`.
fn rejected_field(message: &str) -> Option<String> {
    let detail = message.rsplit_once("target type: ").map_or(message, |(_, d)| d);
    for marker in ["missing field `", "unknown field `", "duplicate field `"] {
        if let Some(rest) = detail.split_once(marker).map(|(_, r)| r) {
            return rest.split_once('`').map(|(name, _)| name.to_string());
        }
    }
    let (path, _) = detail.split_once(": ")?;
    let is_path = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'));
    is_path.then(|| path.to_string())
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidField(field) => field_error(StatusCode::BAD_REQUEST, field),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::Restricted(msg) => json_error(StatusCode::CONFLICT, "restricted", msg),
    }
}

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::Domain(err) => domain_error_to_response(err),
        StoreError::Database(err) => {
            tracing::error!(error = %err, "database error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "database error")
        }
        StoreError::Unavailable(msg) => {
            tracing::error!(error = %msg, "store unavailable");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_unavailable", msg)
        }
    }
}

pub fn media_error_to_response(err: MediaError) -> Response {
    match err {
        MediaError::Domain(err) => domain_error_to_response(err),
        MediaError::Io(err) => {
            tracing::error!(error = %err, "media io error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "media_error", "media storage failed")
        }
        MediaError::NotFound(path) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("file not found: {path}"))
        }
        other => {
            let code = match &other {
                MediaError::Empty => "empty",
                MediaError::TooLarge { .. } => "file_too_large",
                MediaError::UnsupportedExtension(_) => "invalid_extension",
                _ => "invalid_image",
            };
            field_error(StatusCode::BAD_REQUEST, FieldError::new("image", code, other.to_string()))
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

fn field_error(status: StatusCode, err: FieldError) -> Response {
    (
        status,
        axum::Json(json!({
            "error": "invalid_field",
            "message": err.message,
            "field": err.field,
            "code": err.code,
        })),
    )
        .into_response()
}

/// Parse a path identifier, reporting a malformed one as `400 invalid_id`.
pub fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = DomainError>,
{
    Ok(raw.parse::<T>()?)
}
