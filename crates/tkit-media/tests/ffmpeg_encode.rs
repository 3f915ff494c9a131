//! End-to-end encoding through a real FFmpeg binary.
//!
//! Run with:
//!   cargo test -p tkit-media --test ffmpeg_encode -- --ignored

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use tkit_media::{EncoderStudio, FfmpegRecorder, FrameCaptureEncoder, SourceImage};
use tkit_models::{EncodeJob, ScheduleStrategy};

fn odd_sized_image() -> SourceImage {
    SourceImage::from_raster(RgbaImage::from_pixel(33, 17, Rgba([30, 120, 220, 255])))
        .expect("raster")
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_ffmpeg_produces_webm() {
    let studio = EncoderStudio::new(FrameCaptureEncoder::new(Arc::new(FfmpegRecorder::default())));
    let job = EncodeJob::new(30, 1);

    let artifact = studio
        .generate(&odd_sized_image(), &job, None)
        .await
        .expect("encode");

    // EBML magic number opens every WebM file.
    assert_eq!(&artifact.data()[..4], &[0x1a, 0x45, 0xdf, 0xa3]);
    assert_eq!(artifact.frames(), 30);
    assert_eq!(artifact.mime_type(), "video/webm");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = artifact.save_to(dir.path()).await.expect("save");
    assert!(path.ends_with("photo-video.webm"));
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_ffmpeg_refresh_synced_schedule() {
    let encoder = FrameCaptureEncoder::new(Arc::new(FfmpegRecorder::default()));
    let job = EncodeJob::new(15, 1).with_schedule(ScheduleStrategy::RefreshSynced { refresh_hz: 60 });

    let video = encoder
        .encode(&odd_sized_image(), &job, None)
        .await
        .expect("encode");

    assert_eq!(video.frames_drawn, 15);
    assert!(!video.data.is_empty());
}
