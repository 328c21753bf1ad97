use axum::{routing::get, Router};

pub mod categories;
pub mod images;
pub mod media;
pub mod product_types;
pub mod products;
pub mod store;
pub mod system;

/// Public storefront plus the management API under `/manage`.
pub fn router(media_url: &str) -> Router {
    let manage = Router::new()
        .nest("/categories", categories::router())
        .merge(product_types::router())
        .merge(products::router())
        .merge(images::router());

    let router = Router::new()
        .route("/health", get(system::health))
        .merge(store::router())
        .nest("/manage", manage);

    match media::router(media_url) {
        Some(media) => router.merge(media),
        None => router,
    }
}
