use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::text::optional_text;
use storefront_core::{
    DomainError, DomainResult, Entity, ProductId, ProductImageId, SHORT_TEXT_MAX, ValueObject,
};

use crate::patch::double_option;

/// Column width of the image path.
pub const IMAGE_PATH_MAX: usize = 100;

/// Default directory, relative to the media root, that images are uploaded to.
pub const DEFAULT_UPLOAD_TO: &str = "images/";

/// Relative path of a stored image below the media root ("images/boot.jpg").
///
/// Never empty, never absolute, never escapes the media root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImagePath(String);

impl ImagePath {
    pub fn parse(value: &str) -> DomainResult<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(DomainError::field("image", "required", "No image was submitted."));
        }
        if value.chars().count() > IMAGE_PATH_MAX {
            return Err(DomainError::field(
                "image",
                "max_length",
                format!("Ensure this filename has at most {IMAGE_PATH_MAX} characters."),
            ));
        }
        if value.starts_with('/') || !value.split('/').all(is_safe_segment) {
            return Err(invalid_image_path());
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Same directory and extension, with `_suffix` appended to the stem.
    /// The stem is shortened when needed to respect the column width.
    pub fn with_suffix(&self, suffix: &str) -> DomainResult<Self> {
        let (dir, name) = match self.0.rfind('/') {
            Some(i) => self.0.split_at(i + 1),
            None => ("", self.0.as_str()),
        };
        let (stem, ext) = split_extension(name);
        build_path(dir, stem, &format!("_{suffix}"), ext)
    }
}

impl ValueObject for ImagePath {}

impl core::fmt::Display for ImagePath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ImagePath {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ImagePath> for String {
    fn from(value: ImagePath) -> Self {
        value.0
    }
}

/// Upload directory for product images, relative to the media root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTo(String);

impl Default for UploadTo {
    fn default() -> Self {
        Self(DEFAULT_UPLOAD_TO.to_string())
    }
}

impl UploadTo {
    /// Normalise `dir` to the `a/b/` form. An empty value means the media root.
    pub fn new(dir: &str) -> DomainResult<Self> {
        let trimmed = dir.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self(String::new()));
        }
        if !trimmed.split('/').all(is_safe_segment) {
            return Err(DomainError::validation(format!("invalid upload directory '{dir}'")));
        }
        Ok(Self(format!("{trimmed}/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage path for an uploaded file called `original_name`.
    ///
    /// Directory components are discarded, whitespace becomes `_` and anything
    /// outside `[A-Za-z0-9._-]` is dropped.
    pub fn path_for(&self, original_name: &str) -> DomainResult<ImagePath> {
        let base = original_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(original_name)
            .trim();

        let cleaned: String = base
            .chars()
            .filter_map(|c| match c {
                c if c.is_whitespace() => Some('_'),
                c if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') => Some(c),
                _ => None,
            })
            .collect();
        let cleaned = cleaned.trim_start_matches('.');

        let (stem, ext) = split_extension(cleaned);
        if stem.is_empty() {
            return Err(invalid_image_path());
        }
        build_path(&self.0, stem, "", ext)
    }
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Split "boot.jpg" into ("boot", ".jpg"). A leading dot is not an extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) if i > 0 => name.split_at(i),
        _ => (name, ""),
    }
}

fn build_path(dir: &str, stem: &str, suffix: &str, ext: &str) -> DomainResult<ImagePath> {
    let fixed = dir.chars().count() + suffix.chars().count() + ext.chars().count();
    let Some(budget) = IMAGE_PATH_MAX.checked_sub(fixed).filter(|b| *b > 0) else {
        return Err(invalid_image_path());
    };
    let stem: String = stem.chars().take(budget).collect();
    ImagePath::parse(&format!("{dir}{stem}{suffix}{ext}"))
}

fn invalid_image_path() -> DomainError {
    DomainError::field(
        "image",
        "invalid",
        "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
    )
}

/// An image attached to a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub product: ProductId,
    pub image: ImagePath,
    pub alt_text: Option<String>,
    pub is_feature: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for ProductImage {
    type Id = ProductImageId;

    const KIND: &'static str = "product image";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProductImage {
    pub product: ProductId,
    pub image: ImagePath,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub is_feature: bool,
}

impl NewProductImage {
    pub fn new(product: ProductId, image: ImagePath) -> Self {
        Self {
            product,
            image,
            alt_text: None,
            is_feature: false,
        }
    }
}

/// Partial update of an image. `alt_text: Some(None)` clears the text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImagePatch {
    #[serde(default, deserialize_with = "double_option")]
    pub alt_text: Option<Option<String>>,
    #[serde(default)]
    pub is_feature: Option<bool>,
}

impl ProductImage {
    pub fn create(id: ProductImageId, new: NewProductImage, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id,
            product: new.product,
            image: new.image,
            alt_text: optional_text("alt_text", new.alt_text.as_deref(), SHORT_TEXT_MAX)?,
            is_feature: new.is_feature,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn patched(&self, patch: &ProductImagePatch, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut next = self.clone();
        if let Some(alt) = &patch.alt_text {
            next.alt_text = optional_text("alt_text", alt.as_deref(), SHORT_TEXT_MAX)?;
        }
        if let Some(feature) = patch.is_feature {
            next.is_feature = feature;
        }
        next.updated_at = now;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_path_rejects_empty_and_escaping_paths() {
        assert!(ImagePath::parse("").is_err());
        assert!(ImagePath::parse("/etc/passwd").is_err());
        assert!(ImagePath::parse("images/../secret.png").is_err());
        assert!(ImagePath::parse("images//boot.png").is_err());
        assert_eq!(ImagePath::parse("images/boot.png").unwrap().file_name(), "boot.png");
    }

    #[test]
    fn upload_to_normalises_slashes() {
        assert_eq!(UploadTo::new("/images").unwrap().as_str(), "images/");
        assert_eq!(UploadTo::new("media/images/").unwrap().as_str(), "media/images/");
        assert_eq!(UploadTo::new("").unwrap().as_str(), "");
        assert!(UploadTo::new("../outside").is_err());
    }

    #[test]
    fn path_for_sanitises_the_client_name() {
        let upload = UploadTo::default();
        assert_eq!(
            upload.path_for("C:\\Users\\me\\Red Boot (1).JPG").unwrap().as_str(),
            "images/Red_Boot_1.JPG"
        );
        assert_eq!(upload.path_for("../../boot.png").unwrap().as_str(), "images/boot.png");
        assert!(upload.path_for("???").is_err());
        assert_eq!(upload.path_for(".hidden").unwrap().as_str(), "images/hidden");
    }

    #[test]
    fn long_names_are_shortened_to_fit_the_column() {
        let upload = UploadTo::default();
        let long = format!("{}.webp", "a".repeat(300));
        let path = upload.path_for(&long).unwrap();
        assert_eq!(path.as_str().len(), IMAGE_PATH_MAX);
        assert!(path.as_str().ends_with(".webp"));

        let suffixed = path.with_suffix("x1y2z3").unwrap();
        assert_eq!(suffixed.as_str().len(), IMAGE_PATH_MAX);
        assert!(suffixed.as_str().ends_with("_x1y2z3.webp"));
    }

    #[test]
    fn is_feature_defaults_to_false() {
        let raw = r#"{"product":"0190a8a4-0000-7000-8000-000000000001","image":"images/a.png"}"#;
        let new: NewProductImage = serde_json::from_str(raw).unwrap();
        let image = ProductImage::create(ProductImageId::new(), new, Utc::now()).unwrap();
        assert!(!image.is_feature);
        assert_eq!(image.alt_text, None);
    }

    #[test]
    fn patch_can_clear_alt_text() {
        let mut new = NewProductImage::new(ProductId::new(), ImagePath::parse("images/a.png").unwrap());
        new.alt_text = Some("front".into());
        let image = ProductImage::create(ProductImageId::new(), new, Utc::now()).unwrap();

        let patch: ProductImagePatch = serde_json::from_str(r#"{"alt_text":null}"#).unwrap();
        let next = image.patched(&patch, Utc::now()).unwrap();
        assert_eq!(next.alt_text, None);
        assert_eq!(next.created_at, image.created_at);
    }
}
