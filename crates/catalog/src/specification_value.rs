use serde::{Deserialize, Serialize};

use storefront_core::text::required_text;
use storefront_core::{
    DomainResult, Entity, ProductId, ProductSpecificationId, SHORT_TEXT_MAX, SpecificationValueId,
};

/// The value of one specification for one product ("Color" = "Red").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSpecificationValue {
    pub id: SpecificationValueId,
    pub product: ProductId,
    pub specification: ProductSpecificationId,
    pub value: String,
}

impl Entity for ProductSpecificationValue {
    type Id = SpecificationValueId;

    const KIND: &'static str = "specification value";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSpecificationValue {
    pub product: ProductId,
    pub specification: ProductSpecificationId,
    pub value: String,
}

impl ProductSpecificationValue {
    pub fn create(id: SpecificationValueId, new: NewSpecificationValue) -> DomainResult<Self> {
        Ok(Self {
            id,
            product: new.product,
            specification: new.specification,
            value: required_text("value", &new.value, SHORT_TEXT_MAX)?,
        })
    }
}
