use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use uuid::Uuid;

use crate::services::ServiceError;

#[async_trait]
pub trait Storage: Send + Sync {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), ServiceError>;
    async fn download(&self, key: &str) -> Result<Vec<u8>, ServiceError>;
    async fn delete(&self, key: &str) -> Result<(), ServiceError>;
}

/// Relative storage key, validated: no root, no `..`, no empty path.
pub fn sanitize_key(key: &str) -> Result<PathBuf, ServiceError> {
    let path = Path::new(key);
    if key.is_empty() || key.starts_with('/') || key.starts_with('\\') {
        return Err(ServiceError::Validation("Invalid file path".to_string()));
    }

    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return Err(ServiceError::Validation("Invalid file path".to_string())),
        }
    }

    if clean.as_os_str().is_empty() {
        return Err(ServiceError::Validation("Invalid file path".to_string()));
    }
    Ok(clean)
}

/// Key for a new upload: `<owner>/<uuid>[.<ext>]`.
pub fn upload_key(owner: Uuid, original_name: Option<&str>) -> String {
    let extension = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase());

    match extension {
        Some(ext) => format!("{}/{}.{}", owner, Uuid::new_v4(), ext),
        None => format!("{}/{}", owner, Uuid::new_v4()),
    }
}

/// The user a key belongs to, from its first segment.
pub fn key_owner(key: &str) -> Option<Uuid> {
    key.split('/').next().and_then(|first| Uuid::parse_str(first).ok())
}

/// Validate a client-supplied key and require that `owner` uploaded it.
/// Returns the normalized key.
pub fn owned_key(owner: Uuid, key: &str) -> Result<String, ServiceError> {
    let clean = sanitize_key(key)?;
    let normalized = clean
        .iter()
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    if key_owner(&normalized) != Some(owner) {
        return Err(ServiceError::Forbidden(
            "Attachments must be files you uploaded".to_string(),
        ));
    }
    Ok(normalized)
}

/// Best-effort removal of a record's attachment; the record is already gone.
pub async fn discard_attachment(storage: &dyn Storage, key: &str) {
    match storage.delete(key).await {
        Ok(()) => tracing::debug!(key, "Attachment removed"),
        Err(e) => tracing::warn!(key, error = %e, "Failed to remove attachment"),
    }
}

pub fn content_type_for(key: &str) -> &'static str {
    let extension = Path::new(key)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        Some("json") => "application/json",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("m4a") => "audio/mp4",
        Some("mp3") => "audio/mpeg",
        _ => "application/octet-stream",
    }
}

pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self { base_path })
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, ServiceError> {
        Ok(self.base_path.join(sanitize_key(key)?))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), ServiceError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, data).await?;
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, ServiceError> {
        let path = self.resolve(key)?;
        match fs::read(path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ServiceError::NotFound("File")),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        let path = self.resolve(key)?;
        if path.exists() {
            fs::remove_file(path).await?;
        }
        Ok(())
    }
}
