//! The catalog as one consistent unit of work.
//!
//! [`Catalog`] owns every entity and enforces the rules that span more than one
//! of them: references must exist, restricted references block deletion,
//! products cascade to their values and images, and the [`CatalogPolicy`]
//! switches. Each method either applies completely or leaves the catalog
//! untouched.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use storefront_core::{
    CategoryId, DomainError, DomainResult, Entity, ProductId, ProductImageId, ProductSpecificationId,
    ProductTypeId, Slug, SpecificationValueId,
};

use crate::category::{Category, CategoryPatch, NewCategory};
use crate::image::{NewProductImage, ProductImage, ProductImagePatch};
use crate::policy::CatalogPolicy;
use crate::product::{NewProduct, Product, ProductPatch, newest_first};
use crate::product_type::{
    NewProductSpecification, NewProductType, ProductSpecification, ProductType, ProductTypePatch,
};
use crate::query::{CategoryDetail, ProductDetail, ProductQuery, SpecificationEntry, feature_image};
use crate::specification_value::{NewSpecificationValue, ProductSpecificationValue};
use crate::tree::CategoryTree;

/// What deleting a product took with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedProduct {
    pub product: Product,
    pub values: Vec<ProductSpecificationValue>,
    pub images: Vec<ProductImage>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    policy: CatalogPolicy,
    categories: CategoryTree,
    product_types: HashMap<ProductTypeId, ProductType>,
    specifications: HashMap<ProductSpecificationId, ProductSpecification>,
    products: HashMap<ProductId, Product>,
    values: HashMap<SpecificationValueId, ProductSpecificationValue>,
    images: HashMap<ProductImageId, ProductImage>,
}

impl Catalog {
    pub fn new(policy: CatalogPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> CatalogPolicy {
        self.policy
    }

    // ---- categories ----

    pub fn categories(&self) -> &CategoryTree {
        &self.categories
    }

    pub fn category(&self, id: CategoryId) -> DomainResult<&Category> {
        self.categories.get(id).ok_or_else(DomainError::not_found)
    }

    pub fn create_category(&mut self, new: NewCategory) -> DomainResult<Category> {
        let category = Category::create(CategoryId::new(), new)?;
        self.categories.insert(category)
    }

    pub fn update_category(&mut self, id: CategoryId, patch: &CategoryPatch) -> DomainResult<Category> {
        self.categories.update(id, patch)
    }

    /// Delete a category and its whole subtree, unless a product still
    /// references any category of that subtree.
    pub fn delete_category(&mut self, id: CategoryId) -> DomainResult<Vec<Category>> {
        self.category(id)?;
        let subtree = self.categories.descendant_ids(id, true);
        if let Some(product) = self.products.values().find(|p| subtree.contains(&p.category)) {
            return Err(referenced::<Category, _>(product));
        }
        self.categories.remove(id)
    }

    pub fn category_detail(&self, slug: &str) -> DomainResult<CategoryDetail> {
        let category = self
            .categories
            .get_by_slug(slug)
            .ok_or_else(DomainError::not_found)?;

        let query = ProductQuery::storefront().in_category(category.id, true);
        Ok(CategoryDetail {
            category: category.clone(),
            ancestors: self
                .categories
                .ancestors(category.id, false)
                .into_iter()
                .cloned()
                .collect(),
            children: self
                .categories
                .children(category.id)
                .into_iter()
                .filter(|c| c.is_active)
                .cloned()
                .collect(),
            products: self.products(&query).into_iter().cloned().collect(),
        })
    }

    // ---- product types and specifications ----

    /// All product types ordered by name.
    pub fn product_types(&self) -> Vec<&ProductType> {
        let mut types: Vec<_> = self.product_types.values().collect();
        types.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        types
    }

    pub fn product_type(&self, id: ProductTypeId) -> DomainResult<&ProductType> {
        self.product_types.get(&id).ok_or_else(DomainError::not_found)
    }

    pub fn create_product_type(&mut self, new: NewProductType) -> DomainResult<ProductType> {
        let product_type = ProductType::create(ProductTypeId::new(), new)?;
        self.product_types.insert(product_type.id, product_type.clone());
        Ok(product_type)
    }

    pub fn update_product_type(
        &mut self,
        id: ProductTypeId,
        patch: &ProductTypePatch,
    ) -> DomainResult<ProductType> {
        let mut next = self.product_type(id)?.clone();
        next.apply_patch(patch)?;
        self.product_types.insert(id, next.clone());
        Ok(next)
    }

    pub fn delete_product_type(&mut self, id: ProductTypeId) -> DomainResult<ProductType> {
        self.product_type(id)?;
        if let Some(spec) = self.specifications.values().find(|s| s.product_type == id) {
            return Err(referenced::<ProductType, _>(spec));
        }
        if let Some(product) = self.products.values().find(|p| p.product_type == id) {
            return Err(referenced::<ProductType, _>(product));
        }
        self.product_types.remove(&id).ok_or_else(DomainError::not_found)
    }

    /// Specifications declared by a product type, ordered by name.
    pub fn specifications(&self, product_type: ProductTypeId) -> Vec<&ProductSpecification> {
        let mut specs: Vec<_> = self
            .specifications
            .values()
            .filter(|s| s.product_type == product_type)
            .collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        specs
    }

    pub fn specification(&self, id: ProductSpecificationId) -> DomainResult<&ProductSpecification> {
        self.specifications.get(&id).ok_or_else(DomainError::not_found)
    }

    pub fn create_specification(
        &mut self,
        new: NewProductSpecification,
    ) -> DomainResult<ProductSpecification> {
        if !self.product_types.contains_key(&new.product_type) {
            return Err(invalid_choice("product_type"));
        }
        let spec = ProductSpecification::create(ProductSpecificationId::new(), new)?;
        self.specifications.insert(spec.id, spec.clone());
        Ok(spec)
    }

    pub fn delete_specification(
        &mut self,
        id: ProductSpecificationId,
    ) -> DomainResult<ProductSpecification> {
        self.specification(id)?;
        if let Some(value) = self.values.values().find(|v| v.specification == id) {
            return Err(referenced::<ProductSpecification, _>(value));
        }
        self.specifications.remove(&id).ok_or_else(DomainError::not_found)
    }

    // ---- products ----

    pub fn product(&self, id: ProductId) -> DomainResult<&Product> {
        self.products.get(&id).ok_or_else(DomainError::not_found)
    }

    /// Products matching `query`, newest first.
    pub fn products(&self, query: &ProductQuery) -> Vec<&Product> {
        let scope = query.category_scope(&self.categories);
        let mut products: Vec<_> = self
            .products
            .values()
            .filter(|p| query.matches(p, scope.as_ref()))
            .collect();
        products.sort_by(|a, b| newest_first(a, b));
        products
    }

    /// The newest active product carrying `slug`. Product slugs are not unique.
    pub fn storefront_product(&self, slug: &Slug) -> DomainResult<&Product> {
        let query = ProductQuery::storefront().with_slug(slug.clone());
        self.products(&query)
            .into_iter()
            .next()
            .ok_or_else(DomainError::not_found)
    }

    pub fn create_product(&mut self, new: NewProduct, now: DateTime<Utc>) -> DomainResult<Product> {
        self.ensure_product_refs(new.product_type, new.category)?;
        let product = Product::create(ProductId::new(), new, now)?;
        self.products.insert(product.id, product.clone());
        Ok(product)
    }

    pub fn update_product(
        &mut self,
        id: ProductId,
        patch: &ProductPatch,
        now: DateTime<Utc>,
    ) -> DomainResult<Product> {
        let current = self.product(id)?;
        let next = current.patched(patch, now)?;
        self.ensure_product_refs(next.product_type, next.category)?;

        if self.policy.enforce_specification_type && next.product_type != current.product_type {
            let stale = self.values.values().any(|v| {
                v.product == id
                    && self
                        .specifications
                        .get(&v.specification)
                        .is_some_and(|s| s.product_type != next.product_type)
            });
            if stale {
                return Err(DomainError::field(
                    "product_type",
                    "invalid",
                    "Remove the specification values of the current product type first.",
                ));
            }
        }

        self.products.insert(id, next.clone());
        Ok(next)
    }

    /// Delete a product together with its specification values and images.
    pub fn delete_product(&mut self, id: ProductId) -> DomainResult<RemovedProduct> {
        let product = self.products.remove(&id).ok_or_else(DomainError::not_found)?;

        let value_ids: Vec<_> = self
            .values
            .values()
            .filter(|v| v.product == id)
            .map(|v| v.id)
            .collect();
        let values = value_ids.iter().filter_map(|v| self.values.remove(v)).collect();

        let image_ids: Vec<_> = self
            .images
            .values()
            .filter(|i| i.product == id)
            .map(|i| i.id)
            .collect();
        let mut images: Vec<_> = image_ids.iter().filter_map(|i| self.images.remove(i)).collect();
        images.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(RemovedProduct {
            product,
            values,
            images,
        })
    }

    fn ensure_product_refs(&self, product_type: ProductTypeId, category: CategoryId) -> DomainResult<()> {
        if !self.product_types.contains_key(&product_type) {
            return Err(invalid_choice("product_type"));
        }
        if !self.categories.contains(category) {
            return Err(invalid_choice("category"));
        }
        Ok(())
    }

    // ---- specification values ----

    /// Values held by a product, ordered by specification name.
    pub fn specification_values(&self, product: ProductId) -> Vec<&ProductSpecificationValue> {
        let mut values: Vec<_> = self.values.values().filter(|v| v.product == product).collect();
        values.sort_by(|a, b| {
            let name = |v: &ProductSpecificationValue| {
                self.specifications.get(&v.specification).map(|s| s.name.as_str())
            };
            name(a).cmp(&name(b)).then_with(|| a.id.cmp(&b.id))
        });
        values
    }

    pub fn specification_value(&self, id: SpecificationValueId) -> DomainResult<&ProductSpecificationValue> {
        self.values.get(&id).ok_or_else(DomainError::not_found)
    }

    /// Attach a value to a product. Under `unique_specification_values` an
    /// existing value for the same pair is replaced in place.
    pub fn set_specification_value(
        &mut self,
        new: NewSpecificationValue,
    ) -> DomainResult<ProductSpecificationValue> {
        let product = self.products.get(&new.product).ok_or_else(|| invalid_choice("product"))?;
        let spec = self
            .specifications
            .get(&new.specification)
            .ok_or_else(|| invalid_choice("specification"))?;
        if self.policy.enforce_specification_type && spec.product_type != product.product_type {
            return Err(DomainError::field(
                "specification",
                "invalid_choice",
                "The specification does not belong to the product's type.",
            ));
        }

        let existing = self
            .policy
            .unique_specification_values
            .then(|| {
                self.values
                    .values()
                    .find(|v| v.product == new.product && v.specification == new.specification)
                    .map(|v| v.id)
            })
            .flatten();

        let value = ProductSpecificationValue::create(existing.unwrap_or_else(SpecificationValueId::new), new)?;
        self.values.insert(value.id, value.clone());
        Ok(value)
    }

    pub fn delete_specification_value(
        &mut self,
        id: SpecificationValueId,
    ) -> DomainResult<ProductSpecificationValue> {
        self.values.remove(&id).ok_or_else(DomainError::not_found)
    }

    // ---- images ----

    /// Images of a product, oldest first.
    pub fn images(&self, product: ProductId) -> Vec<&ProductImage> {
        let mut images: Vec<_> = self.images.values().filter(|i| i.product == product).collect();
        images.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        images
    }

    pub fn image(&self, id: ProductImageId) -> DomainResult<&ProductImage> {
        self.images.get(&id).ok_or_else(DomainError::not_found)
    }

    pub fn feature_image(&self, product: ProductId) -> Option<&ProductImage> {
        feature_image(self.images.values().filter(|i| i.product == product))
    }

    pub fn add_image(&mut self, new: NewProductImage, now: DateTime<Utc>) -> DomainResult<ProductImage> {
        if !self.products.contains_key(&new.product) {
            return Err(invalid_choice("product"));
        }
        let image = ProductImage::create(ProductImageId::new(), new, now)?;
        if image.is_feature {
            self.clear_other_features(&image, now);
        }
        self.images.insert(image.id, image.clone());
        Ok(image)
    }

    pub fn update_image(
        &mut self,
        id: ProductImageId,
        patch: &ProductImagePatch,
        now: DateTime<Utc>,
    ) -> DomainResult<ProductImage> {
        let next = self.image(id)?.patched(patch, now)?;
        if patch.is_feature == Some(true) {
            self.clear_other_features(&next, now);
        }
        self.images.insert(id, next.clone());
        Ok(next)
    }

    pub fn delete_image(&mut self, id: ProductImageId) -> DomainResult<ProductImage> {
        self.images.remove(&id).ok_or_else(DomainError::not_found)
    }

    fn clear_other_features(&mut self, keep: &ProductImage, now: DateTime<Utc>) {
        if !self.policy.exclusive_feature_image {
            return;
        }
        for other in self.images.values_mut() {
            if other.product == keep.product && other.id != keep.id && other.is_feature {
                other.is_feature = false;
                other.updated_at = now;
            }
        }
    }

    // ---- read models ----

    pub fn product_detail(&self, id: ProductId) -> DomainResult<ProductDetail> {
        let product = self.product(id)?;
        let specifications = self
            .specification_values(id)
            .into_iter()
            .filter_map(|value| {
                let specification = self.specifications.get(&value.specification)?;
                Some(SpecificationEntry {
                    specification: specification.clone(),
                    value: value.clone(),
                })
            })
            .collect();

        Ok(ProductDetail {
            product: product.clone(),
            category_path: self
                .categories
                .ancestors(product.category, true)
                .into_iter()
                .cloned()
                .collect(),
            product_type: self.product_type(product.product_type)?.clone(),
            specifications,
            images: self.images(id).into_iter().cloned().collect(),
            feature_image: self.feature_image(id).cloned(),
        })
    }
}

/// A delete of some `T` blocked by `referrer`.
fn referenced<T: Entity, R: Entity>(referrer: &R) -> DomainError {
    DomainError::restricted(format!(
        "{} is still referenced by {} {}",
        T::KIND,
        R::KIND,
        referrer.id()
    ))
}

/// Error for a reference to a row that does not exist.
pub fn invalid_choice(field: &'static str) -> DomainError {
    DomainError::field(
        field,
        "invalid_choice",
        "Select a valid choice. That choice is not one of the available choices.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;

    use crate::image::ImagePath;

    struct Fixture {
        catalog: Catalog,
        shoes: ProductType,
        books: ProductType,
        footwear: Category,
        running: Category,
    }

    fn fixture(policy: CatalogPolicy) -> Fixture {
        let mut catalog = Catalog::new(policy);
        let shoes = catalog.create_product_type(NewProductType { name: "Shoes".into(), is_active: None }).unwrap();
        let books = catalog.create_product_type(NewProductType { name: "Books".into(), is_active: None }).unwrap();
        let footwear = catalog.create_category(NewCategory::new("Footwear")).unwrap();
        let running = catalog
            .create_category(NewCategory::new("Running").under(footwear.id))
            .unwrap();
        Fixture {
            catalog,
            shoes,
            books,
            footwear,
            running,
        }
    }

    fn new_product(f: &Fixture, title: &str, regular: Decimal) -> NewProduct {
        NewProduct {
            product_type: f.shoes.id,
            category: f.running.id,
            title: title.into(),
            description: String::new(),
            slug: None,
            regular_price: regular,
            discount_price: Decimal::ZERO,
            is_active: None,
        }
    }

    fn image(product: ProductId, name: &str, is_feature: bool) -> NewProductImage {
        let mut new = NewProductImage::new(product, ImagePath::parse(&format!("images/{name}")).unwrap());
        new.is_feature = is_feature;
        new
    }

    fn assert_field(err: DomainError, field: &str, code: &str) {
        match err {
            DomainError::InvalidField(f) => {
                assert_eq!(f.field, field);
                assert_eq!(f.code, code);
            }
            other => panic!("expected InvalidField({field}), got {other:?}"),
        }
    }

    #[test]
    fn price_ceiling_is_999_99() {
        let mut f = fixture(CatalogPolicy::default());
        let now = Utc::now();

        let err = f
            .catalog
            .create_product(new_product(&f, "Too dear", Decimal::new(100_000, 2)), now)
            .unwrap_err();
        assert_field(err, "regular_price", "max_whole_digits");

        let ok = f
            .catalog
            .create_product(new_product(&f, "Just right", Decimal::new(99_999, 2)), now)
            .unwrap();
        assert_eq!(ok.regular_price.amount(), Decimal::new(99_999, 2));
    }

    #[test]
    fn product_requires_existing_type_and_category() {
        let mut f = fixture(CatalogPolicy::default());
        let mut new = new_product(&f, "Orphan", Decimal::ONE);
        new.category = CategoryId::new();
        assert_field(f.catalog.create_product(new, Utc::now()).unwrap_err(), "category", "invalid_choice");

        let mut new = new_product(&f, "Orphan", Decimal::ONE);
        new.product_type = ProductTypeId::new();
        assert_field(
            f.catalog.create_product(new, Utc::now()).unwrap_err(),
            "product_type",
            "invalid_choice",
        );
    }

    #[test]
    fn deleting_a_referenced_product_type_is_restricted() {
        let mut f = fixture(CatalogPolicy::default());
        let product = f
            .catalog
            .create_product(new_product(&f, "Trail Runner", Decimal::ONE), Utc::now())
            .unwrap();

        let err = f.catalog.delete_product_type(f.shoes.id).unwrap_err();
        assert_eq!(
            err,
            DomainError::restricted(format!(
                "product type is still referenced by product {}",
                product.id
            ))
        );

        f.catalog.delete_product(product.id).unwrap();
        assert!(f.catalog.product_type(f.shoes.id).is_ok());
        f.catalog.delete_product_type(f.shoes.id).unwrap();
        assert_eq!(f.catalog.product_types().len(), 1);
    }

    #[test]
    fn deleting_a_specification_with_values_is_restricted() {
        let mut f = fixture(CatalogPolicy::default());
        let color = f
            .catalog
            .create_specification(NewProductSpecification { product_type: f.shoes.id, name: "Color".into() })
            .unwrap();
        assert!(matches!(
            f.catalog.delete_product_type(f.shoes.id).unwrap_err(),
            DomainError::Restricted(_)
        ));

        let product = f
            .catalog
            .create_product(new_product(&f, "Trail Runner", Decimal::ONE), Utc::now())
            .unwrap();
        let value = f
            .catalog
            .set_specification_value(NewSpecificationValue {
                product: product.id,
                specification: color.id,
                value: "Red".into(),
            })
            .unwrap();

        assert!(matches!(
            f.catalog.delete_specification(color.id).unwrap_err(),
            DomainError::Restricted(_)
        ));
        f.catalog.delete_specification_value(value.id).unwrap();
        f.catalog.delete_specification(color.id).unwrap();
    }

    #[test]
    fn deleting_a_category_cascades_to_the_subtree() {
        let mut f = fixture(CatalogPolicy::default());
        let trail = f
            .catalog
            .create_category(NewCategory::new("Trail").under(f.running.id))
            .unwrap();

        let removed = f.catalog.delete_category(f.footwear.id).unwrap();
        let ids: Vec<_> = removed.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![f.footwear.id, f.running.id, trail.id]);
        assert!(f.catalog.categories().is_empty());
    }

    #[test]
    fn deleting_a_category_with_products_in_its_subtree_is_restricted() {
        let mut f = fixture(CatalogPolicy::default());
        f.catalog
            .create_product(new_product(&f, "Trail Runner", Decimal::ONE), Utc::now())
            .unwrap();

        let err = f.catalog.delete_category(f.footwear.id).unwrap_err();
        assert!(matches!(err, DomainError::Restricted(_)));
        assert_eq!(f.catalog.categories().len(), 2);
    }

    #[test]
    fn deleting_a_product_cascades_to_values_and_images() {
        let mut f = fixture(CatalogPolicy::default());
        let now = Utc::now();
        let product = f
            .catalog
            .create_product(new_product(&f, "Trail Runner", Decimal::ONE), now)
            .unwrap();
        let color = f
            .catalog
            .create_specification(NewProductSpecification { product_type: f.shoes.id, name: "Color".into() })
            .unwrap();
        f.catalog
            .set_specification_value(NewSpecificationValue {
                product: product.id,
                specification: color.id,
                value: "Red".into(),
            })
            .unwrap();
        f.catalog.add_image(image(product.id, "a.png", true), now).unwrap();
        f.catalog
            .add_image(image(product.id, "b.png", false), now + Duration::seconds(1))
            .unwrap();

        let removed = f.catalog.delete_product(product.id).unwrap();
        assert_eq!(removed.values.len(), 1);
        assert_eq!(removed.images.len(), 2);
        assert_eq!(removed.images[0].image.as_str(), "images/a.png");
        assert!(f.catalog.images(product.id).is_empty());
        assert!(f.catalog.specification_values(product.id).is_empty());
        assert!(f.catalog.specification(color.id).is_ok());
    }

    #[test]
    fn image_feature_flag_defaults_to_false() {
        let mut f = fixture(CatalogPolicy::default());
        let product = f
            .catalog
            .create_product(new_product(&f, "Trail Runner", Decimal::ONE), Utc::now())
            .unwrap();
        let img = f
            .catalog
            .add_image(NewProductImage::new(product.id, ImagePath::parse("images/a.png").unwrap()), Utc::now())
            .unwrap();
        assert!(!img.is_feature);
        assert_eq!(f.catalog.feature_image(product.id), None);
    }

    #[test]
    fn feature_images_are_not_exclusive_by_default() {
        let mut f = fixture(CatalogPolicy::default());
        let now = Utc::now();
        let product = f
            .catalog
            .create_product(new_product(&f, "Trail Runner", Decimal::ONE), now)
            .unwrap();
        let first = f.catalog.add_image(image(product.id, "a.png", true), now).unwrap();
        f.catalog
            .add_image(image(product.id, "b.png", true), now + Duration::seconds(1))
            .unwrap();

        let flagged = f.catalog.images(product.id).iter().filter(|i| i.is_feature).count();
        assert_eq!(flagged, 2);
        assert_eq!(f.catalog.feature_image(product.id).map(|i| i.id), Some(first.id));
    }

    #[test]
    fn exclusive_feature_policy_clears_other_flags() {
        let mut f = fixture(CatalogPolicy {
            exclusive_feature_image: true,
            ..CatalogPolicy::default()
        });
        let now = Utc::now();
        let product = f
            .catalog
            .create_product(new_product(&f, "Trail Runner", Decimal::ONE), now)
            .unwrap();
        let first = f.catalog.add_image(image(product.id, "a.png", true), now).unwrap();
        let second = f
            .catalog
            .add_image(image(product.id, "b.png", false), now + Duration::seconds(1))
            .unwrap();

        let later = now + Duration::seconds(2);
        let patch = ProductImagePatch {
            is_feature: Some(true),
            ..ProductImagePatch::default()
        };
        f.catalog.update_image(second.id, &patch, later).unwrap();

        let first = f.catalog.image(first.id).unwrap();
        assert!(!first.is_feature);
        assert_eq!(first.updated_at, later);
        assert_eq!(f.catalog.feature_image(product.id).map(|i| i.id), Some(second.id));
    }

    #[test]
    fn specification_must_belong_to_the_product_type() {
        let mut f = fixture(CatalogPolicy::default());
        let pages = f
            .catalog
            .create_specification(NewProductSpecification { product_type: f.books.id, name: "Pages".into() })
            .unwrap();
        let product = f
            .catalog
            .create_product(new_product(&f, "Trail Runner", Decimal::ONE), Utc::now())
            .unwrap();

        let err = f
            .catalog
            .set_specification_value(NewSpecificationValue {
                product: product.id,
                specification: pages.id,
                value: "320".into(),
            })
            .unwrap_err();
        assert_field(err, "specification", "invalid_choice");

        let mut lax = fixture(CatalogPolicy {
            enforce_specification_type: false,
            ..CatalogPolicy::default()
        });
        let pages = lax
            .catalog
            .create_specification(NewProductSpecification { product_type: lax.books.id, name: "Pages".into() })
            .unwrap();
        let product = lax
            .catalog
            .create_product(new_product(&lax, "Trail Runner", Decimal::ONE), Utc::now())
            .unwrap();
        assert!(lax
            .catalog
            .set_specification_value(NewSpecificationValue {
                product: product.id,
                specification: pages.id,
                value: "320".into(),
            })
            .is_ok());
    }

    #[test]
    fn changing_the_type_of_a_product_with_values_is_rejected() {
        let mut f = fixture(CatalogPolicy::default());
        let color = f
            .catalog
            .create_specification(NewProductSpecification { product_type: f.shoes.id, name: "Color".into() })
            .unwrap();
        let product = f
            .catalog
            .create_product(new_product(&f, "Trail Runner", Decimal::ONE), Utc::now())
            .unwrap();
        f.catalog
            .set_specification_value(NewSpecificationValue {
                product: product.id,
                specification: color.id,
                value: "Red".into(),
            })
            .unwrap();

        let patch = ProductPatch {
            product_type: Some(f.books.id),
            ..ProductPatch::default()
        };
        assert_field(
            f.catalog.update_product(product.id, &patch, Utc::now()).unwrap_err(),
            "product_type",
            "invalid",
        );
        assert_eq!(f.catalog.product(product.id).unwrap().product_type, f.shoes.id);
    }

    #[test]
    fn values_per_pair_are_only_unique_under_policy() {
        for unique in [false, true] {
            let mut f = fixture(CatalogPolicy {
                unique_specification_values: unique,
                ..CatalogPolicy::default()
            });
            let color = f
                .catalog
                .create_specification(NewProductSpecification { product_type: f.shoes.id, name: "Color".into() })
                .unwrap();
            let product = f
                .catalog
                .create_product(new_product(&f, "Trail Runner", Decimal::ONE), Utc::now())
                .unwrap();
            for value in ["Red", "Blue"] {
                f.catalog
                    .set_specification_value(NewSpecificationValue {
                        product: product.id,
                        specification: color.id,
                        value: value.into(),
                    })
                    .unwrap();
            }

            let values = f.catalog.specification_values(product.id);
            if unique {
                assert_eq!(values.len(), 1);
                assert_eq!(values[0].value, "Blue");
            } else {
                assert_eq!(values.len(), 2);
            }
        }
    }

    #[test]
    fn listing_is_newest_first_and_hides_inactive_products() {
        let mut f = fixture(CatalogPolicy::default());
        let now = Utc::now();
        let old = f.catalog.create_product(new_product(&f, "Old", Decimal::ONE), now).unwrap();
        let new = f
            .catalog
            .create_product(new_product(&f, "New", Decimal::ONE), now + Duration::seconds(1))
            .unwrap();
        let mut hidden = new_product(&f, "Hidden", Decimal::ONE);
        hidden.is_active = Some(false);
        f.catalog.create_product(hidden, now + Duration::seconds(2)).unwrap();

        let listed: Vec<_> = f
            .catalog
            .products(&ProductQuery::storefront())
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(listed, vec![new.id, old.id]);
        assert_eq!(f.catalog.products(&ProductQuery::default()).len(), 3);
    }

    #[test]
    fn storefront_product_picks_the_newest_active_slug_match() {
        let mut f = fixture(CatalogPolicy::default());
        let now = Utc::now();
        f.catalog.create_product(new_product(&f, "Runner", Decimal::ONE), now).unwrap();
        let newer = f
            .catalog
            .create_product(new_product(&f, "Runner", Decimal::TWO), now + Duration::seconds(1))
            .unwrap();
        let mut inactive = new_product(&f, "Runner", Decimal::TEN);
        inactive.is_active = Some(false);
        f.catalog.create_product(inactive, now + Duration::seconds(2)).unwrap();

        let slug = Slug::parse("runner").unwrap();
        assert_eq!(f.catalog.storefront_product(&slug).unwrap().id, newer.id);
    }

    #[test]
    fn category_detail_covers_the_subtree() {
        let mut f = fixture(CatalogPolicy::default());
        let product = f
            .catalog
            .create_product(new_product(&f, "Trail Runner", Decimal::ONE), Utc::now())
            .unwrap();
        let mut hidden = NewCategory::new("Archive").under(f.footwear.id);
        hidden.is_active = Some(false);
        f.catalog.create_category(hidden).unwrap();

        let detail = f.catalog.category_detail("footwear").unwrap();
        assert!(detail.ancestors.is_empty());
        assert_eq!(detail.children.iter().map(|c| c.id).collect::<Vec<_>>(), vec![f.running.id]);
        assert_eq!(detail.products.iter().map(|p| p.id).collect::<Vec<_>>(), vec![product.id]);

        let detail = f.catalog.category_detail("running").unwrap();
        assert_eq!(detail.ancestors.iter().map(|c| c.id).collect::<Vec<_>>(), vec![f.footwear.id]);
        assert!(matches!(f.catalog.category_detail("nope"), Err(DomainError::NotFound)));
    }

    #[test]
    fn product_detail_collects_everything_for_the_page() {
        let mut f = fixture(CatalogPolicy::default());
        let now = Utc::now();
        let product = f
            .catalog
            .create_product(new_product(&f, "Trail Runner", Decimal::ONE), now)
            .unwrap();
        for name in ["Size", "Color"] {
            let spec = f
                .catalog
                .create_specification(NewProductSpecification { product_type: f.shoes.id, name: name.into() })
                .unwrap();
            f.catalog
                .set_specification_value(NewSpecificationValue {
                    product: product.id,
                    specification: spec.id,
                    value: "x".into(),
                })
                .unwrap();
        }
        let feature = f.catalog.add_image(image(product.id, "a.png", true), now).unwrap();

        let detail = f.catalog.product_detail(product.id).unwrap();
        assert_eq!(
            detail.category_path.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![f.footwear.id, f.running.id]
        );
        assert_eq!(detail.category().map(|c| c.id), Some(f.running.id));
        assert_eq!(detail.product_type.id, f.shoes.id);
        let names: Vec<_> = detail.specifications.iter().map(|s| s.specification.name.as_str()).collect();
        assert_eq!(names, vec!["Color", "Size"]);
        assert_eq!(detail.feature_image.map(|i| i.id), Some(feature.id));
    }

    #[test]
    fn reparenting_below_a_descendant_is_rejected() {
        let mut f = fixture(CatalogPolicy::default());
        let err = f
            .catalog
            .update_category(f.footwear.id, &CategoryPatch::move_to(Some(f.running.id)))
            .unwrap_err();
        assert_field(err, "parent", "invalid_move");
        assert_eq!(f.catalog.categories().level(f.running.id), Some(1));
    }
}
