use std::sync::Arc;

use storefront_catalog::ImagePath;
use storefront_infra::{
    AppConfig, CatalogStore, InMemoryCatalogStore, LocalMediaStore, MediaStore,
    PostgresCatalogStore, StoreError,
};

/// Shared handles every handler reaches through `Extension<Arc<AppServices>>`.
#[derive(Clone)]
pub struct AppServices {
    pub store: Arc<dyn CatalogStore>,
    pub media: Arc<dyn MediaStore>,
}

impl AppServices {
    pub fn new(store: Arc<dyn CatalogStore>, media: Arc<dyn MediaStore>) -> Self {
        Self { store, media }
    }

    /// Remove stored files whose rows are gone. Failures are logged; the rows
    /// are already deleted at this point.
    pub async fn discard_files(&self, paths: &[ImagePath]) {
        for path in paths {
            if let Err(err) = self.media.delete(path).await {
                tracing::warn!(path = %path, error = %err, "failed to delete media file");
            }
        }
    }
}

/// Wire the store and media storage described by `config`.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StoreError> {
    let store: Arc<dyn CatalogStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("using postgres catalog store");
            Arc::new(PostgresCatalogStore::connect(url, config.policy).await?)
        }
        None => {
            tracing::info!("using in-memory catalog store");
            Arc::new(InMemoryCatalogStore::new(config.policy))
        }
    };

    let media = LocalMediaStore::new(
        config.media_root.clone(),
        config.media_url.clone(),
        config.upload_to.clone(),
    );
    tracing::info!(root = %media.root().display(), url = %config.media_url, "media storage ready");

    Ok(AppServices::new(store, Arc::new(media)))
}
