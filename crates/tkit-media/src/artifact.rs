//! Video artifacts and their revocable access URLs.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tkit_models::JobId;
use tracing::debug;
use uuid::Uuid;

use crate::encoder::EncodedVideo;
use crate::error::{MediaError, MediaResult};

/// Base name of the downloadable file; the recorder supplies the extension.
pub const DOWNLOAD_STEM: &str = "photo-video";

/// Issues ephemeral `blob:` URLs for in-memory artifacts.
///
/// Cloning shares the same table.
#[derive(Debug, Clone, Default)]
pub struct ObjectUrlRegistry {
    objects: Arc<Mutex<HashMap<String, Arc<[u8]>>>>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, Arc<[u8]>>> {
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `data` and return a fresh access URL for it.
    pub fn create(&self, data: Arc<[u8]>) -> String {
        let url = format!("blob:tkit/{}", Uuid::new_v4());
        self.table().insert(url.clone(), data);
        url
    }

    /// Bytes behind a live URL.
    pub fn resolve(&self, url: &str) -> Option<Arc<[u8]>> {
        self.table().get(url).cloned()
    }

    /// Invalidate a URL. Returns whether it was live.
    pub fn revoke(&self, url: &str) -> bool {
        self.table().remove(url).is_some()
    }

    /// Number of URLs currently live.
    pub fn live_count(&self) -> usize {
        self.table().len()
    }
}

/// A finished video with an access URL.
///
/// The URL is released when the artifact is superseded or dropped; the bytes
/// stay valid for anyone still holding the artifact.
#[derive(Debug)]
pub struct VideoArtifact {
    job_id: JobId,
    data: Arc<[u8]>,
    mime_type: String,
    extension: String,
    url: String,
    frames: u64,
    width: u32,
    height: u32,
    created_at: DateTime<Utc>,
    registry: ObjectUrlRegistry,
}

impl VideoArtifact {
    /// Register an encoded video and wrap it with its access URL.
    pub fn publish(registry: &ObjectUrlRegistry, job_id: JobId, video: EncodedVideo) -> Self {
        let data: Arc<[u8]> = Arc::from(video.data);
        let url = registry.create(data.clone());
        debug!(job_id = %job_id, url = %url, bytes = data.len(), "Published video artifact");

        Self {
            job_id,
            data,
            mime_type: video.mime_type,
            extension: video.extension,
            url,
            frames: video.frames_drawn,
            width: video.width,
            height: video.height,
            created_at: Utc::now(),
            registry: registry.clone(),
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Redraws recorded into this video.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the access URL still resolves.
    pub fn is_live(&self) -> bool {
        self.registry.resolve(&self.url).is_some()
    }

    /// Release the access URL. Idempotent.
    pub fn revoke(&self) {
        if self.registry.revoke(&self.url) {
            debug!(job_id = %self.job_id, url = %self.url, "Revoked video artifact URL");
        }
    }

    /// File name offered for download.
    pub fn download_name(&self) -> String {
        format!("{}.{}", DOWNLOAD_STEM, self.extension)
    }

    /// Write the video into `dir` under [`VideoArtifact::download_name`].
    ///
    /// The file is written to a temporary sibling first and renamed into place.
    pub async fn save_to(&self, dir: impl AsRef<Path>) -> MediaResult<PathBuf> {
        let dir = dir.as_ref().to_path_buf();
        let target = dir.join(self.download_name());
        let data = self.data.clone();

        tokio::fs::create_dir_all(&dir).await?;

        let saved = target.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&data)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&saved).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| MediaError::Io(std::io::Error::other(e)))??;

        debug!(job_id = %self.job_id, path = %target.display(), "Saved video artifact");
        Ok(target)
    }
}

impl Drop for VideoArtifact {
    fn drop(&mut self) {
        self.registry.revoke(&self.url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(bytes: &[u8]) -> EncodedVideo {
        EncodedVideo {
            data: bytes.to_vec(),
            mime_type: "video/webm".to_string(),
            extension: "webm".to_string(),
            frames_drawn: 150,
            width: 4,
            height: 4,
        }
    }

    #[test]
    fn test_registry_lifecycle() {
        let registry = ObjectUrlRegistry::new();
        let url = registry.create(Arc::from(vec![1u8, 2, 3]));

        assert!(url.starts_with("blob:tkit/"));
        assert_eq!(registry.resolve(&url).as_deref(), Some(&[1u8, 2, 3][..]));
        assert_eq!(registry.live_count(), 1);

        assert!(registry.revoke(&url));
        assert!(!registry.revoke(&url));
        assert!(registry.resolve(&url).is_none());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_drop_releases_url() {
        let registry = ObjectUrlRegistry::new();
        let artifact = VideoArtifact::publish(&registry, JobId::new(), encoded(b"webm"));
        let url = artifact.url().to_string();

        assert!(artifact.is_live());
        drop(artifact);

        assert!(registry.resolve(&url).is_none());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_revoke_keeps_bytes() {
        let registry = ObjectUrlRegistry::new();
        let artifact = VideoArtifact::publish(&registry, JobId::new(), encoded(b"still here"));

        artifact.revoke();

        assert!(!artifact.is_live());
        assert_eq!(artifact.data(), b"still here");
        assert_eq!(artifact.download_name(), "photo-video.webm");
    }

    #[tokio::test]
    async fn test_save_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ObjectUrlRegistry::new();
        let artifact = VideoArtifact::publish(&registry, JobId::new(), encoded(b"\x1a\x45\xdf\xa3"));

        let path = artifact.save_to(dir.path().join("out")).await.unwrap();

        assert_eq!(path.file_name().unwrap(), "photo-video.webm");
        assert_eq!(std::fs::read(&path).unwrap(), b"\x1a\x45\xdf\xa3");
    }
}
