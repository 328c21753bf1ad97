//! Catalog persistence boundary.
//!
//! [`CatalogStore`] is the one interface the HTTP layer talks to. Every method
//! is a complete unit of work: it either commits entirely or changes nothing.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use thiserror::Error;

use storefront_catalog::{
    Category, CategoryDetail, CategoryPatch, CategoryTree, CatalogPolicy, NewCategory,
    NewProduct, NewProductImage, NewProductSpecification, NewProductType, NewSpecificationValue,
    Product, ProductDetail, ProductImage, ProductImagePatch, ProductPatch, ProductQuery,
    ProductSpecification, ProductSpecificationValue, ProductType, ProductTypePatch,
    RemovedProduct,
};
use storefront_core::{
    CategoryId, DomainError, ProductId, ProductImageId, ProductSpecificationId, ProductTypeId,
    Slug, SpecificationValueId,
};

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Timestamp for a write. Truncated to microseconds so values read back from
/// Postgres compare equal to the ones returned at write time.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    fn policy(&self) -> CatalogPolicy;

    // categories
    async fn category_tree(&self) -> StoreResult<CategoryTree>;
    async fn category(&self, id: CategoryId) -> StoreResult<Category>;
    async fn create_category(&self, new: NewCategory) -> StoreResult<Category>;
    async fn update_category(&self, id: CategoryId, patch: CategoryPatch) -> StoreResult<Category>;
    /// Deletes the whole subtree. Returns the removed categories in pre-order.
    async fn delete_category(&self, id: CategoryId) -> StoreResult<Vec<Category>>;
    async fn category_detail(&self, slug: &Slug) -> StoreResult<CategoryDetail>;

    // product types and specifications
    async fn product_types(&self) -> StoreResult<Vec<ProductType>>;
    async fn product_type(&self, id: ProductTypeId) -> StoreResult<ProductType>;
    async fn create_product_type(&self, new: NewProductType) -> StoreResult<ProductType>;
    async fn update_product_type(
        &self,
        id: ProductTypeId,
        patch: ProductTypePatch,
    ) -> StoreResult<ProductType>;
    async fn delete_product_type(&self, id: ProductTypeId) -> StoreResult<ProductType>;
    async fn specifications(&self, product_type: ProductTypeId) -> StoreResult<Vec<ProductSpecification>>;
    async fn create_specification(
        &self,
        new: NewProductSpecification,
    ) -> StoreResult<ProductSpecification>;
    async fn delete_specification(&self, id: ProductSpecificationId) -> StoreResult<ProductSpecification>;

    // products
    async fn products(&self, query: ProductQuery) -> StoreResult<Vec<Product>>;
    async fn product(&self, id: ProductId) -> StoreResult<Product>;
    async fn product_detail(&self, id: ProductId) -> StoreResult<ProductDetail>;
    /// Detail of the newest active product with this slug.
    async fn storefront_product(&self, slug: &Slug) -> StoreResult<ProductDetail>;
    async fn create_product(&self, new: NewProduct) -> StoreResult<Product>;
    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> StoreResult<Product>;
    /// Deletes the product with its values and images.
    async fn delete_product(&self, id: ProductId) -> StoreResult<RemovedProduct>;

    // specification values
    async fn specification_values(&self, product: ProductId) -> StoreResult<Vec<ProductSpecificationValue>>;
    async fn set_specification_value(
        &self,
        new: NewSpecificationValue,
    ) -> StoreResult<ProductSpecificationValue>;
    async fn delete_specification_value(
        &self,
        id: SpecificationValueId,
    ) -> StoreResult<ProductSpecificationValue>;

    // images
    async fn images(&self, product: ProductId) -> StoreResult<Vec<ProductImage>>;
    async fn image(&self, id: ProductImageId) -> StoreResult<ProductImage>;
    async fn add_image(&self, new: NewProductImage) -> StoreResult<ProductImage>;
    async fn update_image(&self, id: ProductImageId, patch: ProductImagePatch) -> StoreResult<ProductImage>;
    async fn delete_image(&self, id: ProductImageId) -> StoreResult<ProductImage>;
}
