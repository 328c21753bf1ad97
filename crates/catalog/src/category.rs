use serde::{Deserialize, Serialize};

use storefront_core::text::required_text;
use storefront_core::{CategoryId, DomainResult, Entity, SHORT_TEXT_MAX, Slug};

use crate::patch::double_option;

/// A node of the category tree.
///
/// `parent` is the only structural field; depth, ancestry and sibling order are
/// derived by [`crate::tree::CategoryTree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: Slug,
    pub parent: Option<CategoryId>,
    pub is_active: bool,
}

impl Entity for Category {
    type Id = CategoryId;

    const KIND: &'static str = "category";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for creating a category. A missing slug is derived from the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub parent: Option<CategoryId>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl NewCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: None,
            parent: None,
            is_active: None,
        }
    }

    pub fn under(mut self, parent: CategoryId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }
}

/// Partial update of a category.
///
/// `parent: Some(None)` moves the node to the root level; `parent: None` leaves
/// it where it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent: Option<Option<CategoryId>>,
}

impl CategoryPatch {
    pub fn move_to(parent: Option<CategoryId>) -> Self {
        Self {
            parent: Some(parent),
            ..Self::default()
        }
    }

    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

impl Category {
    /// Validate field-level input. Tree-level rules (uniqueness, parent
    /// existence) are checked by the tree on insert.
    pub fn create(id: CategoryId, new: NewCategory) -> DomainResult<Self> {
        let name = required_text("name", &new.name, SHORT_TEXT_MAX)?;
        let slug = match new.slug.as_deref() {
            Some(s) => Slug::parse(s)?,
            None => Slug::slugify("slug", &name)?,
        };

        Ok(Self {
            id,
            name,
            slug,
            parent: new.parent,
            is_active: new.is_active.unwrap_or(true),
        })
    }

    /// Return a copy with the field-level parts of `patch` applied.
    pub(crate) fn patched(&self, patch: &CategoryPatch) -> DomainResult<Self> {
        let mut next = self.clone();
        if let Some(name) = patch.name.as_deref() {
            next.name = required_text("name", name, SHORT_TEXT_MAX)?;
        }
        if let Some(slug) = patch.slug.as_deref() {
            next.slug = Slug::parse(slug)?;
        }
        if let Some(active) = patch.is_active {
            next.is_active = active;
        }
        if let Some(parent) = patch.parent {
            next.parent = parent;
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::DomainError;

    #[test]
    fn create_derives_slug_and_defaults_to_active() {
        let c = Category::create(CategoryId::new(), NewCategory::new("Running Shoes")).unwrap();
        assert_eq!(c.slug.as_str(), "running-shoes");
        assert!(c.is_active);
        assert_eq!(c.parent, None);
    }

    #[test]
    fn create_rejects_blank_name() {
        let err = Category::create(CategoryId::new(), NewCategory::new("  ")).unwrap_err();
        assert!(matches!(err, DomainError::InvalidField(ref f) if f.field == "name"));
    }

    #[test]
    fn patch_distinguishes_missing_parent_from_null_parent() {
        let missing: CategoryPatch = serde_json::from_str(r#"{"name":"Boots"}"#).unwrap();
        assert_eq!(missing.parent, None);

        let null: CategoryPatch = serde_json::from_str(r#"{"parent":null}"#).unwrap();
        assert_eq!(null.parent, Some(None));
    }
}
