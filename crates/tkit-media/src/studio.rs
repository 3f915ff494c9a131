//! Single-slot ownership of the encoder and its current artifact.

use std::sync::Arc;

use tkit_models::EncodeJob;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use crate::artifact::{ObjectUrlRegistry, VideoArtifact};
use crate::encoder::FrameCaptureEncoder;
use crate::error::{MediaError, MediaResult};
use crate::source::SourceImage;

/// At most one encode job runs at a time; a second request is rejected.
///
/// Starting a job releases the previous artifact's URL before anything new is
/// allocated. Holders of the previous artifact keep its bytes.
pub struct EncoderStudio {
    encoder: FrameCaptureEncoder,
    registry: ObjectUrlRegistry,
    slot: Mutex<Option<Arc<VideoArtifact>>>,
}

impl EncoderStudio {
    pub fn new(encoder: FrameCaptureEncoder) -> Self {
        Self::with_registry(encoder, ObjectUrlRegistry::new())
    }

    pub fn with_registry(encoder: FrameCaptureEncoder, registry: ObjectUrlRegistry) -> Self {
        Self {
            encoder,
            registry,
            slot: Mutex::new(None),
        }
    }

    pub fn encoder(&self) -> &FrameCaptureEncoder {
        &self.encoder
    }

    pub fn registry(&self) -> &ObjectUrlRegistry {
        &self.registry
    }

    /// Whether a job currently holds the slot.
    pub fn is_busy(&self) -> bool {
        self.slot.try_lock().is_err()
    }

    /// The artifact of the last successful job, if it has not been superseded.
    pub async fn current(&self) -> Option<Arc<VideoArtifact>> {
        self.slot.lock().await.clone()
    }

    /// Run a job, replacing the current artifact.
    ///
    /// Fails with [`MediaError::EncoderBusy`] while another job is running.
    pub async fn generate(
        &self,
        image: &SourceImage,
        job: &EncodeJob,
        cancel: Option<watch::Receiver<bool>>,
    ) -> MediaResult<Arc<VideoArtifact>> {
        let mut slot = self.slot.try_lock().map_err(|_| MediaError::EncoderBusy)?;

        if let Some(previous) = slot.take() {
            debug!(
                previous_job = %previous.job_id(),
                job_id = %job.id,
                "Superseding previous video artifact"
            );
            previous.revoke();
        }

        let video = self.encoder.encode(image, job, cancel).await?;
        let artifact = Arc::new(VideoArtifact::publish(&self.registry, job.id.clone(), video));
        info!(job_id = %job.id, url = %artifact.url(), "Video artifact ready");

        *slot = Some(artifact.clone());
        Ok(artifact)
    }

    /// Release the current artifact's URL and empty the slot.
    pub async fn clear(&self) {
        if let Some(previous) = self.slot.lock().await.take() {
            previous.revoke();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::tests::CountingRecorder;
    use crate::source::tests::png_bytes;

    fn studio() -> EncoderStudio {
        EncoderStudio::new(FrameCaptureEncoder::new(Arc::new(CountingRecorder::default())))
    }

    fn image() -> SourceImage {
        SourceImage::decode(&png_bytes(2, 2)).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_publishes_artifact() {
        let studio = studio();
        let job = EncodeJob::new(30, 1);

        let artifact = studio.generate(&image(), &job, None).await.unwrap();

        assert!(artifact.is_live());
        assert_eq!(artifact.frames(), 30);
        assert_eq!(artifact.job_id(), &job.id);
        assert_eq!(studio.registry().live_count(), 1);
        assert!(Arc::ptr_eq(&studio.current().await.unwrap(), &artifact));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_job_is_rejected_while_running() {
        let studio = studio();
        let image = image();
        let first_job = EncodeJob::new(30, 1);
        let second_job = EncodeJob::new(30, 1);

        let first = studio.generate(&image, &first_job, None);
        let second = async {
            // Let the first job take the slot and start drawing.
            tokio::task::yield_now().await;
            assert!(studio.is_busy());
            studio.generate(&image, &second_job, None).await
        };

        let (first, second) = tokio::join!(first, second);

        assert!(first.is_ok());
        assert!(matches!(second, Err(MediaError::EncoderBusy)));
        assert_eq!(studio.registry().live_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_job_supersedes_previous_artifact() {
        let studio = studio();
        let image = image();

        let old = studio.generate(&image, &EncodeJob::new(30, 1), None).await.unwrap();
        let old_bytes = old.data().to_vec();
        let old_url = old.url().to_string();

        let new = studio.generate(&image, &EncodeJob::new(10, 1), None).await.unwrap();

        // The old URL is gone but its bytes are untouched.
        assert!(studio.registry().resolve(&old_url).is_none());
        assert!(!old.is_live());
        assert_eq!(old.data(), old_bytes.as_slice());
        assert_eq!(old.len(), 30);
        assert_eq!(old.frames(), 30);

        assert!(new.is_live());
        assert_ne!(new.url(), old_url);
        assert_eq!(new.frames(), 10);
        assert_eq!(new.len(), 10);
        assert_eq!(studio.registry().live_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_leaves_slot_free() {
        let studio = studio();
        let image = image();

        let err = studio
            .generate(&image, &EncodeJob::new(30, 0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidJob(_)));
        assert!(!studio.is_busy());
        assert!(studio.current().await.is_none());

        assert!(studio.generate(&image, &EncodeJob::new(30, 1), None).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_releases_url() {
        let studio = studio();
        let artifact = studio
            .generate(&image(), &EncodeJob::new(30, 1), None)
            .await
            .unwrap();

        studio.clear().await;

        assert!(!artifact.is_live());
        assert_eq!(studio.registry().live_count(), 0);
    }
}
