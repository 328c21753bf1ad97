use serde::{Deserialize, Serialize};

use storefront_core::text::required_text;
use storefront_core::{DomainResult, Entity, ProductSpecificationId, ProductTypeId, SHORT_TEXT_MAX};

/// A family of products ("Shoes", "Books") and the specifications they share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductType {
    pub id: ProductTypeId,
    pub name: String,
    pub is_active: bool,
}

impl Entity for ProductType {
    type Id = ProductTypeId;

    const KIND: &'static str = "product type";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProductType {
    pub name: String,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTypePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl ProductType {
    pub fn create(id: ProductTypeId, new: NewProductType) -> DomainResult<Self> {
        Ok(Self {
            id,
            name: required_text("name", &new.name, SHORT_TEXT_MAX)?,
            is_active: new.is_active.unwrap_or(true),
        })
    }

    pub fn apply_patch(&mut self, patch: &ProductTypePatch) -> DomainResult<()> {
        if let Some(name) = patch.name.as_deref() {
            self.name = required_text("name", name, SHORT_TEXT_MAX)?;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        Ok(())
    }
}

/// A named attribute declared by a product type (e.g. "Color" for "Shoes").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSpecification {
    pub id: ProductSpecificationId,
    pub product_type: ProductTypeId,
    pub name: String,
}

impl Entity for ProductSpecification {
    type Id = ProductSpecificationId;

    const KIND: &'static str = "product specification";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProductSpecification {
    pub product_type: ProductTypeId,
    pub name: String,
}

impl ProductSpecification {
    pub fn create(id: ProductSpecificationId, new: NewProductSpecification) -> DomainResult<Self> {
        Ok(Self {
            id,
            product_type: new.product_type,
            name: required_text("name", &new.name, SHORT_TEXT_MAX)?,
        })
    }
}
