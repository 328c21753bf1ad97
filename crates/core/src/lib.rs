//! `storefront-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod text;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, FieldError};
pub use id::{
    CategoryId, ProductId, ProductImageId, ProductSpecificationId, ProductTypeId,
    SpecificationValueId,
};
pub use text::{Slug, SHORT_TEXT_MAX};
pub use value_object::ValueObject;
