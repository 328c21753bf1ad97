use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storefront_core::text::required_text;
use storefront_core::{
    CategoryId, DomainResult, Entity, ProductId, ProductTypeId, SHORT_TEXT_MAX, Slug,
};

use crate::price::Price;

/// A sellable catalog entry.
///
/// `created_at` is set once by [`Product::create`]; patches only ever move
/// `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub product_type: ProductTypeId,
    pub category: CategoryId,
    pub title: String,
    pub description: String,
    pub slug: Slug,
    pub regular_price: Price,
    pub discount_price: Price,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    const KIND: &'static str = "product";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for creating a product. Prices arrive as raw decimals and are
/// validated here so failures carry the field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub product_type: ProductTypeId,
    pub category: CategoryId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub regular_price: Decimal,
    pub discount_price: Decimal,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub product_type: Option<ProductTypeId>,
    #[serde(default)]
    pub category: Option<CategoryId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub regular_price: Option<Decimal>,
    #[serde(default)]
    pub discount_price: Option<Decimal>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl Product {
    pub fn create(id: ProductId, new: NewProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        let title = required_text("title", &new.title, SHORT_TEXT_MAX)?;
        let slug = match new.slug.as_deref() {
            Some(s) => Slug::parse(s)?,
            None => Slug::slugify("slug", &title)?,
        };

        Ok(Self {
            id,
            product_type: new.product_type,
            category: new.category,
            title,
            description: new.description.trim().to_string(),
            slug,
            regular_price: Price::parse_field("regular_price", new.regular_price)?,
            discount_price: Price::parse_field("discount_price", new.discount_price)?,
            is_active: new.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }

    /// Return a copy with `patch` applied and `updated_at` moved to `now`.
    ///
    /// Every field is validated before anything is assigned, so a failing
    /// patch leaves no partial update behind.
    pub fn patched(&self, patch: &ProductPatch, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut next = self.clone();
        if let Some(t) = patch.product_type {
            next.product_type = t;
        }
        if let Some(c) = patch.category {
            next.category = c;
        }
        if let Some(title) = patch.title.as_deref() {
            next.title = required_text("title", title, SHORT_TEXT_MAX)?;
        }
        if let Some(description) = patch.description.as_deref() {
            next.description = description.trim().to_string();
        }
        if let Some(slug) = patch.slug.as_deref() {
            next.slug = Slug::parse(slug)?;
        }
        if let Some(price) = patch.regular_price {
            next.regular_price = Price::parse_field("regular_price", price)?;
        }
        if let Some(price) = patch.discount_price {
            next.discount_price = Price::parse_field("discount_price", price)?;
        }
        if let Some(active) = patch.is_active {
            next.is_active = active;
        }
        next.updated_at = now;
        Ok(next)
    }
}

/// Default listing order: newest first, ties broken by id (also newest first).
pub fn newest_first(a: &Product, b: &Product) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}
