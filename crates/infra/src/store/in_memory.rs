use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use storefront_catalog::{
    Catalog, Category, CategoryDetail, CategoryPatch, CategoryTree, CatalogPolicy, NewCategory,
    NewProduct, NewProductImage, NewProductSpecification, NewProductType, NewSpecificationValue,
    Product, ProductDetail, ProductImage, ProductImagePatch, ProductPatch, ProductQuery,
    ProductSpecification, ProductSpecificationValue, ProductType, ProductTypePatch,
    RemovedProduct,
};
use storefront_core::{
    CategoryId, DomainResult, ProductId, ProductImageId, ProductSpecificationId, ProductTypeId,
    Slug, SpecificationValueId,
};

use super::{CatalogStore, StoreError, StoreResult, now};

/// In-memory catalog store.
///
/// Intended for tests/dev and for running without a database. Writes are
/// serialised behind one lock; each operation takes it exactly once.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    catalog: RwLock<Catalog>,
}

impl InMemoryCatalogStore {
    pub fn new(policy: CatalogPolicy) -> Self {
        Self {
            catalog: RwLock::new(Catalog::new(policy)),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Catalog>> {
        self.catalog
            .read()
            .map_err(|_| StoreError::Unavailable("catalog lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Catalog>> {
        self.catalog
            .write()
            .map_err(|_| StoreError::Unavailable("catalog lock poisoned".to_string()))
    }

    fn mutate<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut Catalog) -> DomainResult<T>,
    ) -> StoreResult<T> {
        let mut catalog = self.write()?;
        f(&mut catalog).map_err(|err| {
            tracing::debug!(operation, error = %err, "catalog write rejected");
            StoreError::from(err)
        })
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    fn policy(&self) -> CatalogPolicy {
        self.read().map(|c| c.policy()).unwrap_or_default()
    }

    async fn category_tree(&self) -> StoreResult<CategoryTree> {
        Ok(self.read()?.categories().clone())
    }

    async fn category(&self, id: CategoryId) -> StoreResult<Category> {
        Ok(self.read()?.category(id)?.clone())
    }

    async fn create_category(&self, new: NewCategory) -> StoreResult<Category> {
        let category = self.mutate("create_category", |c| c.create_category(new))?;
        tracing::info!(category_id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    async fn update_category(&self, id: CategoryId, patch: CategoryPatch) -> StoreResult<Category> {
        let category = self.mutate("update_category", |c| c.update_category(id, &patch))?;
        tracing::info!(category_id = %id, "category updated");
        Ok(category)
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<Vec<Category>> {
        let removed = self.mutate("delete_category", |c| c.delete_category(id))?;
        tracing::info!(category_id = %id, removed = removed.len(), "category subtree deleted");
        Ok(removed)
    }

    async fn category_detail(&self, slug: &Slug) -> StoreResult<CategoryDetail> {
        Ok(self.read()?.category_detail(slug.as_str())?)
    }

    async fn product_types(&self) -> StoreResult<Vec<ProductType>> {
        Ok(self.read()?.product_types().into_iter().cloned().collect())
    }

    async fn product_type(&self, id: ProductTypeId) -> StoreResult<ProductType> {
        Ok(self.read()?.product_type(id)?.clone())
    }

    async fn create_product_type(&self, new: NewProductType) -> StoreResult<ProductType> {
        let product_type = self.mutate("create_product_type", |c| c.create_product_type(new))?;
        tracing::info!(product_type_id = %product_type.id, name = %product_type.name, "product type created");
        Ok(product_type)
    }

    async fn update_product_type(
        &self,
        id: ProductTypeId,
        patch: ProductTypePatch,
    ) -> StoreResult<ProductType> {
        let product_type = self.mutate("update_product_type", |c| c.update_product_type(id, &patch))?;
        tracing::info!(product_type_id = %id, "product type updated");
        Ok(product_type)
    }

    async fn delete_product_type(&self, id: ProductTypeId) -> StoreResult<ProductType> {
        let product_type = self.mutate("delete_product_type", |c| c.delete_product_type(id))?;
        tracing::info!(product_type_id = %id, "product type deleted");
        Ok(product_type)
    }

    async fn specifications(&self, product_type: ProductTypeId) -> StoreResult<Vec<ProductSpecification>> {
        let catalog = self.read()?;
        catalog.product_type(product_type)?;
        Ok(catalog.specifications(product_type).into_iter().cloned().collect())
    }

    async fn create_specification(
        &self,
        new: NewProductSpecification,
    ) -> StoreResult<ProductSpecification> {
        let spec = self.mutate("create_specification", |c| c.create_specification(new))?;
        tracing::info!(specification_id = %spec.id, name = %spec.name, "specification created");
        Ok(spec)
    }

    async fn delete_specification(&self, id: ProductSpecificationId) -> StoreResult<ProductSpecification> {
        let spec = self.mutate("delete_specification", |c| c.delete_specification(id))?;
        tracing::info!(specification_id = %id, "specification deleted");
        Ok(spec)
    }

    async fn products(&self, query: ProductQuery) -> StoreResult<Vec<Product>> {
        Ok(self.read()?.products(&query).into_iter().cloned().collect())
    }

    async fn product(&self, id: ProductId) -> StoreResult<Product> {
        Ok(self.read()?.product(id)?.clone())
    }

    async fn product_detail(&self, id: ProductId) -> StoreResult<ProductDetail> {
        Ok(self.read()?.product_detail(id)?)
    }

    async fn storefront_product(&self, slug: &Slug) -> StoreResult<ProductDetail> {
        let catalog = self.read()?;
        let id = catalog.storefront_product(slug)?.id;
        Ok(catalog.product_detail(id)?)
    }

    async fn create_product(&self, new: NewProduct) -> StoreResult<Product> {
        let product = self.mutate("create_product", |c| c.create_product(new, now()))?;
        tracing::info!(product_id = %product.id, title = %product.title, "product created");
        Ok(product)
    }

    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> StoreResult<Product> {
        let product = self.mutate("update_product", |c| c.update_product(id, &patch, now()))?;
        tracing::info!(product_id = %id, "product updated");
        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<RemovedProduct> {
        let removed = self.mutate("delete_product", |c| c.delete_product(id))?;
        tracing::info!(
            product_id = %id,
            values = removed.values.len(),
            images = removed.images.len(),
            "product deleted"
        );
        Ok(removed)
    }

    async fn specification_values(&self, product: ProductId) -> StoreResult<Vec<ProductSpecificationValue>> {
        let catalog = self.read()?;
        catalog.product(product)?;
        Ok(catalog.specification_values(product).into_iter().cloned().collect())
    }

    async fn set_specification_value(
        &self,
        new: NewSpecificationValue,
    ) -> StoreResult<ProductSpecificationValue> {
        let value = self.mutate("set_specification_value", |c| c.set_specification_value(new))?;
        tracing::debug!(
            value_id = %value.id,
            product_id = %value.product,
            specification_id = %value.specification,
            "specification value set"
        );
        Ok(value)
    }

    async fn delete_specification_value(
        &self,
        id: SpecificationValueId,
    ) -> StoreResult<ProductSpecificationValue> {
        let value = self.mutate("delete_specification_value", |c| c.delete_specification_value(id))?;
        tracing::debug!(value_id = %id, "specification value deleted");
        Ok(value)
    }

    async fn images(&self, product: ProductId) -> StoreResult<Vec<ProductImage>> {
        let catalog = self.read()?;
        catalog.product(product)?;
        Ok(catalog.images(product).into_iter().cloned().collect())
    }

    async fn image(&self, id: ProductImageId) -> StoreResult<ProductImage> {
        Ok(self.read()?.image(id)?.clone())
    }

    async fn add_image(&self, new: NewProductImage) -> StoreResult<ProductImage> {
        let image = self.mutate("add_image", |c| c.add_image(new, now()))?;
        tracing::info!(image_id = %image.id, product_id = %image.product, path = %image.image, "image added");
        Ok(image)
    }

    async fn update_image(&self, id: ProductImageId, patch: ProductImagePatch) -> StoreResult<ProductImage> {
        let image = self.mutate("update_image", |c| c.update_image(id, &patch, now()))?;
        tracing::debug!(image_id = %id, is_feature = image.is_feature, "image updated");
        Ok(image)
    }

    async fn delete_image(&self, id: ProductImageId) -> StoreResult<ProductImage> {
        let image = self.mutate("delete_image", |c| c.delete_image(id))?;
        tracing::info!(image_id = %id, path = %image.image, "image deleted");
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use storefront_core::DomainError;

    async fn seeded() -> (InMemoryCatalogStore, ProductType, Category) {
        let store = InMemoryCatalogStore::new(CatalogPolicy::default());
        let shoes = store
            .create_product_type(NewProductType { name: "Shoes".into(), is_active: None })
            .await
            .unwrap();
        let footwear = store.create_category(NewCategory::new("Footwear")).await.unwrap();
        (store, shoes, footwear)
    }

    fn runner(product_type: &ProductType, category: &Category) -> NewProduct {
        NewProduct {
            product_type: product_type.id,
            category: category.id,
            title: "Trail Runner".into(),
            description: String::new(),
            slug: None,
            regular_price: Decimal::new(12_000, 2),
            discount_price: Decimal::new(9_900, 2),
            is_active: None,
        }
    }

    #[tokio::test]
    async fn rejected_writes_surface_as_domain_errors() {
        let (store, shoes, footwear) = seeded().await;
        store.create_product(runner(&shoes, &footwear)).await.unwrap();

        let err = store.delete_product_type(shoes.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Restricted(_))));

        let err = store.create_category(NewCategory::new("Footwear")).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn storefront_product_returns_the_detail_of_the_slug_match() {
        let (store, shoes, footwear) = seeded().await;
        let product = store.create_product(runner(&shoes, &footwear)).await.unwrap();

        let slug = Slug::parse("trail-runner").unwrap();
        let detail = store.storefront_product(&slug).await.unwrap();
        assert_eq!(detail.product.id, product.id);
        assert_eq!(detail.category_path.len(), 1);

        let missing = Slug::parse("nope").unwrap();
        assert!(matches!(
            store.storefront_product(&missing).await,
            Err(StoreError::Domain(DomainError::NotFound))
        ));
    }

    #[tokio::test]
    async fn timestamps_have_microsecond_precision() {
        let (store, shoes, footwear) = seeded().await;
        let product = store.create_product(runner(&shoes, &footwear)).await.unwrap();
        assert_eq!(product.created_at.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[tokio::test]
    async fn listing_for_unknown_product_is_not_found() {
        let (store, _, _) = seeded().await;
        assert!(matches!(
            store.images(ProductId::new()).await,
            Err(StoreError::Domain(DomainError::NotFound))
        ));
    }
}
