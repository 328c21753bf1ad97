//! Storage for uploaded product images.
//!
//! The catalog only records an [`ImagePath`] relative to the media root; this
//! module owns the bytes behind it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::ImageFormat;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use storefront_catalog::{ImagePath, UploadTo};
use storefront_core::DomainError;

/// Largest accepted upload (10MB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// File extensions accepted for uploads.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

// Collision suffixes are tried this many times before giving up.
const MAX_NAME_ATTEMPTS: usize = 8;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("the submitted file is empty")]
    Empty,

    #[error("file too large; the maximum size is {max} bytes")]
    TooLarge { max: usize },

    #[error("unsupported file extension '{0}'; allowed extensions are: png, jpg, jpeg, gif, webp")]
    UnsupportedExtension(String),

    #[error(
        "upload a valid image; the file you uploaded was either not an image or a corrupted image ({0})"
    )]
    NotAnImage(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("media io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Validate and store an upload, returning where it was written. Never
    /// overwrites an existing file.
    async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<ImagePath, MediaError>;

    async fn read(&self, path: &ImagePath) -> Result<Vec<u8>, MediaError>;

    /// Remove a stored file. Removing a file that is already gone succeeds.
    async fn delete(&self, path: &ImagePath) -> Result<(), MediaError>;

    /// Public URL of a stored file.
    fn url(&self, path: &ImagePath) -> String;
}

/// Files on the local filesystem below `root`.
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
    base_url: String,
    upload_to: UploadTo,
    max_bytes: usize,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>, upload_to: UploadTo) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            root: root.into(),
            base_url,
            upload_to,
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute(&self, path: &ImagePath) -> PathBuf {
        self.root.join(path.as_str())
    }

    /// Reject anything that is not a decodable image in an accepted format.
    fn validate(&self, original_name: &str, bytes: &[u8]) -> Result<ImageFormat, MediaError> {
        if bytes.is_empty() {
            return Err(MediaError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(MediaError::TooLarge { max: self.max_bytes });
        }

        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(MediaError::UnsupportedExtension(ext));
        }

        let format = image::guess_format(bytes).map_err(|e| MediaError::NotAnImage(e.to_string()))?;
        if !matches!(
            format,
            ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP
        ) {
            return Err(MediaError::NotAnImage(format!("{format:?} is not accepted")));
        }
        image::load_from_memory_with_format(bytes, format)
            .map_err(|e| MediaError::NotAnImage(e.to_string()))?;
        Ok(format)
    }
}

/// `original_name` with an extension matching the decoded format. The client's
/// extension survives when it is one of the format's own (`.jpeg` for JPEG).
fn stored_name(original_name: &str, format: ImageFormat) -> String {
    let name = Path::new(original_name);
    let current = name
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let extensions = format.extensions_str();
    if extensions.contains(&current.as_str()) {
        return original_name.to_string();
    }
    match extensions.first() {
        Some(ext) => name.with_extension(*ext).to_string_lossy().into_owned(),
        None => original_name.to_string(),
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<ImagePath, MediaError> {
        let format = self.validate(original_name, bytes)?;
        let name = stored_name(original_name, format);

        let mut path = self.upload_to.path_for(&name)?;
        for _ in 0..MAX_NAME_ATTEMPTS {
            let target = self.absolute(&path);
            if let Some(dir) = target.parent() {
                tokio::fs::create_dir_all(dir).await?;
            }

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)
                .await
            {
                Ok(mut file) => {
                    file.write_all(bytes).await?;
                    file.flush().await?;
                    tracing::info!(path = %path, size = bytes.len(), "media file stored");
                    return Ok(path);
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    let original = self.upload_to.path_for(&name)?;
                    path = original.with_suffix(&random_suffix())?;
                    tracing::debug!(path = %path, "media name taken, retrying with suffix");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(MediaError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free file name for '{original_name}'"),
        )))
    }

    async fn read(&self, path: &ImagePath) -> Result<Vec<u8>, MediaError> {
        match tokio::fs::read(self.absolute(path)).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(MediaError::NotFound(path.to_string())),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&self, path: &ImagePath) -> Result<(), MediaError> {
        match tokio::fs::remove_file(self.absolute(path)).await {
            Ok(()) => {
                tracing::info!(path = %path, "media file deleted");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path, "media file already gone");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn url(&self, path: &ImagePath) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// MIME type of a stored file, from its extension.
pub fn content_type(path: &ImagePath) -> &'static str {
    ImageFormat::from_path(path.as_str())
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}

/// Seven characters from the random tail of a fresh UUID.
fn random_suffix() -> String {
    let id = Uuid::now_v7().simple().to_string();
    id[id.len() - 7..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([200, 30, 30]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn store(dir: &tempfile::TempDir) -> LocalMediaStore {
        LocalMediaStore::new(dir.path(), "/media", UploadTo::default())
    }

    #[tokio::test]
    async fn saves_below_the_upload_directory() {
        let dir = tempfile::tempdir().unwrap();
        let media = store(&dir);

        let path = media.save("Red Boot.png", &png_bytes()).await.unwrap();
        assert_eq!(path.as_str(), "images/Red_Boot.png");
        assert!(dir.path().join("images/Red_Boot.png").exists());
        assert_eq!(media.url(&path), "/media/images/Red_Boot.png");
        assert_eq!(media.read(&path).await.unwrap(), png_bytes());
        assert_eq!(content_type(&path), "image/png");
    }

    #[tokio::test]
    async fn never_overwrites_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let media = store(&dir);

        let first = media.save("boot.png", &png_bytes()).await.unwrap();
        let second = media.save("boot.png", &png_bytes()).await.unwrap();
        assert_ne!(first, second);
        assert!(second.as_str().starts_with("images/boot_"));
        assert!(second.as_str().ends_with(".png"));
    }

    #[tokio::test]
    async fn rejects_files_that_are_not_images() {
        let dir = tempfile::tempdir().unwrap();
        let media = store(&dir);

        let err = media.save("boot.png", b"definitely not a png").await.unwrap_err();
        assert!(matches!(err, MediaError::NotAnImage(_)));

        let err = media.save("notes.txt", &png_bytes()).await.unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedExtension(ext) if ext == "txt"));

        let err = media.save("boot.png", &[]).await.unwrap_err();
        assert!(matches!(err, MediaError::Empty));

        let small = store(&dir).with_max_bytes(8);
        let err = small.save("boot.png", &png_bytes()).await.unwrap_err();
        assert!(matches!(err, MediaError::TooLarge { max: 8 }));
    }

    #[tokio::test]
    async fn stored_extension_follows_the_decoded_format() {
        let dir = tempfile::tempdir().unwrap();
        let media = store(&dir);

        let path = media.save("boot.jpg", &png_bytes()).await.unwrap();
        assert_eq!(path.as_str(), "images/boot.png");
        assert_eq!(content_type(&path), "image/png");

        assert_eq!(stored_name("photo.jpeg", ImageFormat::Jpeg), "photo.jpeg");
        assert_eq!(stored_name("photo.JPG", ImageFormat::Jpeg), "photo.JPG");
        assert_eq!(stored_name("anim.webp", ImageFormat::Gif), "anim.gif");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let media = store(&dir);

        let path = media.save("boot.png", &png_bytes()).await.unwrap();
        media.delete(&path).await.unwrap();
        assert!(!dir.path().join(path.as_str()).exists());
        media.delete(&path).await.unwrap();
        assert!(matches!(media.read(&path).await, Err(MediaError::NotFound(_))));
    }
}
