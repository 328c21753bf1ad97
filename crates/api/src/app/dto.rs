use serde::Deserialize;
use serde_json::{Value, json};

use storefront_catalog::{
    Category, CategoryDetail, CategoryTree, Product, ProductDetail, ProductImage,
    ProductSpecification, ProductSpecificationValue, ProductType, TreeBounds,
};
use storefront_infra::MediaStore;

use crate::urls;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateSpecificationRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SetSpecificationValueRequest {
    pub specification: String,
    pub value: String,
}

/// Filters for the management product listing. Unlike the storefront it
/// includes inactive products unless `active_only` is set.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListParams {
    pub category: Option<String>,
    #[serde(default)]
    pub include_subcategories: bool,
    #[serde(default)]
    pub active_only: bool,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn category_to_json(c: &Category) -> Value {
    json!({
        "id": c.id.to_string(),
        "name": c.name,
        "slug": c.slug.as_str(),
        "parent": c.parent.map(|p| p.to_string()),
        "is_active": c.is_active,
        "url": urls::category_detail(&c.slug),
    })
}

fn category_node_to_json(c: &Category, bounds: TreeBounds) -> Value {
    let mut node = category_to_json(c);
    node["tree_id"] = json!(bounds.tree_id);
    node["lft"] = json!(bounds.lft);
    node["rgt"] = json!(bounds.rgt);
    node["level"] = json!(bounds.level);
    node
}

/// The whole forest in pre-order, each node with its nested-set coordinates.
pub fn category_tree_to_json(tree: &CategoryTree) -> Value {
    Value::Array(tree.walk().map(|(c, b)| category_node_to_json(c, b)).collect())
}

pub fn product_type_to_json(t: &ProductType) -> Value {
    json!({
        "id": t.id.to_string(),
        "name": t.name,
        "is_active": t.is_active,
    })
}

pub fn specification_to_json(s: &ProductSpecification) -> Value {
    json!({
        "id": s.id.to_string(),
        "product_type": s.product_type.to_string(),
        "name": s.name,
    })
}

pub fn specification_value_to_json(v: &ProductSpecificationValue) -> Value {
    json!({
        "id": v.id.to_string(),
        "product": v.product.to_string(),
        "specification": v.specification.to_string(),
        "value": v.value,
    })
}

pub fn product_to_json(p: &Product) -> Value {
    json!({
        "id": p.id.to_string(),
        "product_type": p.product_type.to_string(),
        "category": p.category.to_string(),
        "title": p.title,
        "description": p.description,
        "slug": p.slug.as_str(),
        "regular_price": p.regular_price.to_string(),
        "discount_price": p.discount_price.to_string(),
        "is_active": p.is_active,
        "created_at": p.created_at.to_rfc3339(),
        "updated_at": p.updated_at.to_rfc3339(),
        "url": urls::product_detail(&p.slug),
    })
}

pub fn image_to_json(img: &ProductImage, media: &dyn MediaStore) -> Value {
    json!({
        "id": img.id.to_string(),
        "product": img.product.to_string(),
        "image": img.image.as_str(),
        "url": media.url(&img.image),
        "alt_text": img.alt_text,
        "is_feature": img.is_feature,
        "created_at": img.created_at.to_rfc3339(),
        "updated_at": img.updated_at.to_rfc3339(),
    })
}

pub fn product_detail_to_json(d: &ProductDetail, media: &dyn MediaStore) -> Value {
    json!({
        "product": product_to_json(&d.product),
        "category": d.category().map(category_to_json),
        "category_path": d.category_path.iter().map(category_to_json).collect::<Vec<_>>(),
        "product_type": product_type_to_json(&d.product_type),
        "specifications": d.specifications.iter().map(|entry| json!({
            "id": entry.value.id.to_string(),
            "specification": entry.specification.id.to_string(),
            "name": entry.specification.name,
            "value": entry.value.value,
        })).collect::<Vec<_>>(),
        "images": d.images.iter().map(|img| image_to_json(img, media)).collect::<Vec<_>>(),
        "feature_image": d.feature_image.as_ref().map(|img| image_to_json(img, media)),
    })
}

pub fn category_detail_to_json(d: &CategoryDetail) -> Value {
    json!({
        "category": category_to_json(&d.category),
        "ancestors": d.ancestors.iter().map(category_to_json).collect::<Vec<_>>(),
        "children": d.children.iter().map(category_to_json).collect::<Vec<_>>(),
        "products": d.products.iter().map(product_to_json).collect::<Vec<_>>(),
    })
}
