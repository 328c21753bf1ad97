use serde::{Deserialize, Serialize};

/// Optional integrity rules layered on top of the relational constraints.
///
/// The two "at most one" rules are off by default: the relational schema does
/// not declare them, so enabling them is a deliberate deployment choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPolicy {
    /// A value's specification must belong to the product's type.
    pub enforce_specification_type: bool,
    /// Setting a value for an existing (product, specification) pair replaces it.
    pub unique_specification_values: bool,
    /// Flagging an image as feature clears the flag on the product's other images.
    pub exclusive_feature_image: bool,
}

impl Default for CatalogPolicy {
    fn default() -> Self {
        Self {
            enforce_specification_type: true,
            unique_specification_values: false,
            exclusive_feature_image: false,
        }
    }
}
