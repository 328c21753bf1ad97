use std::collections::HashSet;

use serde::Serialize;

use storefront_core::{CategoryId, Slug};

use crate::category::Category;
use crate::image::ProductImage;
use crate::product::Product;
use crate::product_type::{ProductSpecification, ProductType};
use crate::specification_value::ProductSpecificationValue;
use crate::tree::CategoryTree;

/// Product listing filter. Results are always ordered newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub active_only: bool,
    pub category: Option<CategoryId>,
    /// With `category`, also match products of every descendant category.
    pub include_subcategories: bool,
    pub slug: Option<Slug>,
}

impl ProductQuery {
    /// What the storefront shows: active products only.
    pub fn storefront() -> Self {
        Self {
            active_only: true,
            ..Self::default()
        }
    }

    pub fn in_category(mut self, category: CategoryId, include_subcategories: bool) -> Self {
        self.category = Some(category);
        self.include_subcategories = include_subcategories;
        self
    }

    pub fn with_slug(mut self, slug: Slug) -> Self {
        self.slug = Some(slug);
        self
    }

    /// Categories a product may belong to, or `None` when unrestricted.
    pub fn category_scope(&self, tree: &CategoryTree) -> Option<HashSet<CategoryId>> {
        let category = self.category?;
        if self.include_subcategories {
            Some(tree.descendant_ids(category, true).into_iter().collect())
        } else {
            Some(HashSet::from([category]))
        }
    }

    pub fn matches(&self, product: &Product, scope: Option<&HashSet<CategoryId>>) -> bool {
        if self.active_only && !product.is_active {
            return false;
        }
        if let Some(slug) = &self.slug {
            if &product.slug != slug {
                return false;
            }
        }
        scope.is_none_or(|s| s.contains(&product.category))
    }
}

/// A specification of the product's type together with the product's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecificationEntry {
    pub specification: ProductSpecification,
    pub value: ProductSpecificationValue,
}

/// Everything a product page needs in one read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductDetail {
    pub product: Product,
    /// Root-first path ending with the product's own category.
    pub category_path: Vec<Category>,
    pub product_type: ProductType,
    pub specifications: Vec<SpecificationEntry>,
    /// Oldest first.
    pub images: Vec<ProductImage>,
    pub feature_image: Option<ProductImage>,
}

impl ProductDetail {
    pub fn category(&self) -> Option<&Category> {
        self.category_path.last()
    }
}

/// A category page: the node, where it sits, where to go next and what it sells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryDetail {
    pub category: Category,
    /// Root-first ancestors, excluding the category itself.
    pub ancestors: Vec<Category>,
    /// Active children in sibling order.
    pub children: Vec<Category>,
    /// Active products of the whole subtree, newest first.
    pub products: Vec<Product>,
}

/// Pick the feature image: the oldest image flagged `is_feature`.
pub fn feature_image<'a>(images: impl IntoIterator<Item = &'a ProductImage>) -> Option<&'a ProductImage> {
    images
        .into_iter()
        .filter(|i| i.is_feature)
        .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
}
