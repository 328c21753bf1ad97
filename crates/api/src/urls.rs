//! Named storefront routes and their reversal to paths.

use storefront_core::Slug;

pub const STORE_HOME_PATH: &str = "/";
pub const CATEGORY_DETAIL_PATH: &str = "/category/:slug";
pub const PRODUCT_DETAIL_PATH: &str = "/product/:slug";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedRoute<'a> {
    StoreHome,
    CategoryDetail(&'a Slug),
    ProductDetail(&'a Slug),
}

impl NamedRoute<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            NamedRoute::StoreHome => "store_home",
            NamedRoute::CategoryDetail(_) => "category_detail",
            NamedRoute::ProductDetail(_) => "product_detail",
        }
    }

    /// Concrete path for this route.
    pub fn path(&self) -> String {
        match self {
            NamedRoute::StoreHome => STORE_HOME_PATH.to_string(),
            NamedRoute::CategoryDetail(slug) => format!("/category/{slug}"),
            NamedRoute::ProductDetail(slug) => format!("/product/{slug}"),
        }
    }
}

/// Reverse a route by name. `None` for unknown names, for a missing slug on a
/// route that needs one, or a slug on a route that takes none.
pub fn reverse(name: &str, slug: Option<&Slug>) -> Option<String> {
    let route = match (name, slug) {
        ("store_home", None) => NamedRoute::StoreHome,
        ("category_detail", Some(slug)) => NamedRoute::CategoryDetail(slug),
        ("product_detail", Some(slug)) => NamedRoute::ProductDetail(slug),
        _ => return None,
    };
    Some(route.path())
}

pub fn store_home() -> String {
    NamedRoute::StoreHome.path()
}

pub fn category_detail(slug: &Slug) -> String {
    NamedRoute::CategoryDetail(slug).path()
}

pub fn product_detail(slug: &Slug) -> String {
    NamedRoute::ProductDetail(slug).path()
}
