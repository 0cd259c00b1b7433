use crate::errors::ServiceError;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// URL prefix under which the upload directory is served.
pub const PUBLIC_PREFIX: &str = "/uploads";

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

/// Writes admin-supplied images to local disk.
#[derive(Clone, Debug)]
pub struct UploadStore {
    root: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Lowercased extension of `file_name` if it is an accepted image type.
    pub fn image_extension(file_name: &str) -> Result<String, ServiceError> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| ServiceError::BadRequest("Uploaded file has no extension".into()))?;

        if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            Ok(ext)
        } else {
            Err(ServiceError::BadRequest(format!(
                "Unsupported image type '.{}'; allowed: {}",
                ext,
                ALLOWED_EXTENSIONS.join(", ")
            )))
        }
    }

    /// Stores `bytes` under `<root>/<folder>/<uuid>.<ext>` and returns its public URL.
    pub async fn save_image(
        &self,
        folder: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, ServiceError> {
        if bytes.is_empty() {
            return Err(ServiceError::BadRequest("Uploaded file is empty".into()));
        }
        if bytes.len() > self.max_bytes {
            return Err(ServiceError::BadRequest(format!(
                "Uploaded file exceeds {} bytes",
                self.max_bytes
            )));
        }
        let ext = Self::image_extension(file_name)?;

        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir).await?;

        let stored_name = format!("{}.{}", Uuid::new_v4(), ext);
        tokio::fs::write(dir.join(&stored_name), bytes).await?;

        let url = format!("{}/{}/{}", PUBLIC_PREFIX, folder, stored_name);
        info!(url = %url, size = bytes.len(), "image stored");
        Ok(url)
    }

    /// Removes a file previously returned by [`save_image`](Self::save_image).
    /// URLs that do not point into the upload directory are ignored.
    pub async fn remove(&self, url: &str) {
        let Some(relative) = url
            .strip_prefix(PUBLIC_PREFIX)
            .map(|rest| rest.trim_start_matches('/'))
        else {
            return;
        };
        if relative.is_empty() || relative.split('/').any(|part| part == "..") {
            return;
        }

        let path = self.root.join(relative);
        if let Err(err) = tokio::fs::remove_file(&path).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %err, "failed to remove replaced image");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn only_image_extensions_are_accepted() {
        assert_eq!(UploadStore::image_extension("card.PNG").unwrap(), "png");
        assert_eq!(UploadStore::image_extension("a.b.jpeg").unwrap(), "jpeg");
        assert_matches!(
            UploadStore::image_extension("evil.svg"),
            Err(ServiceError::BadRequest(_))
        );
        assert_matches!(
            UploadStore::image_extension("noext"),
            Err(ServiceError::BadRequest(_))
        );
    }

    #[tokio::test]
    async fn saved_image_lands_under_folder_and_can_be_removed() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 1024);

        let url = store.save_image("giftcards", "card.webp", b"RIFF").await.unwrap();
        assert!(url.starts_with("/uploads/giftcards/"));
        assert!(url.ends_with(".webp"));

        let on_disk = dir.path().join(url.trim_start_matches("/uploads/"));
        assert!(on_disk.exists());

        store.remove(&url).await;
        assert!(!on_disk.exists());
    }

    #[tokio::test]
    async fn oversized_and_empty_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 4);

        assert_matches!(
            store.save_image("giftcards", "a.png", b"12345").await,
            Err(ServiceError::BadRequest(_))
        );
        assert_matches!(
            store.save_image("giftcards", "a.png", b"").await,
            Err(ServiceError::BadRequest(_))
        );
    }

    #[tokio::test]
    async fn remove_ignores_foreign_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 1024);
        store.remove("https://cdn.example.com/x.png").await;
        store.remove("/uploads/../etc/passwd").await;
    }
}
