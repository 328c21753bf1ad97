//! Storefront catalog domain.
//!
//! Categories arranged in a tree, product types and their specifications,
//! products, specification values and product images, plus the [`Catalog`]
//! unit of work that keeps them consistent. Pure domain logic: no IO, no HTTP,
//! no storage.

pub mod catalog;
pub mod category;
pub mod image;
mod patch;
pub mod policy;
pub mod price;
pub mod product;
pub mod product_type;
pub mod query;
pub mod specification_value;
pub mod tree;

pub use catalog::{Catalog, RemovedProduct, invalid_choice};
pub use category::{Category, CategoryPatch, NewCategory};
pub use image::{
    DEFAULT_UPLOAD_TO, IMAGE_PATH_MAX, ImagePath, NewProductImage, ProductImage, ProductImagePatch,
    UploadTo,
};
pub use policy::CatalogPolicy;
pub use price::{Price, PriceError};
pub use product::{NewProduct, Product, ProductPatch, newest_first};
pub use product_type::{
    NewProductSpecification, NewProductType, ProductSpecification, ProductType, ProductTypePatch,
};
pub use query::{CategoryDetail, ProductDetail, ProductQuery, SpecificationEntry};
pub use specification_value::{NewSpecificationValue, ProductSpecificationValue};
pub use tree::{ByName, CategoryTree, SiblingOrder, TreeBounds};
