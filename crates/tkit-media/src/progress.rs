//! FFmpeg progress parsing.

use serde::{Deserialize, Serialize};

/// Progress reported by the encoder on `-progress pipe:2`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodeProgress {
    /// Frames encoded so far
    pub frame: u64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether the encoder reported the end of the stream
    pub is_complete: bool,
}

impl EncodeProgress {
    /// Fraction of `total_frames` encoded, clamped to `0.0..=1.0`.
    pub fn fraction(&self, total_frames: u64) -> f64 {
        if total_frames == 0 {
            return 0.0;
        }
        (self.frame as f64 / total_frames as f64).min(1.0)
    }
}

/// Feed one stderr line into `current`.
///
/// Returns a snapshot when the line closes a progress block.
pub fn parse_progress_line(line: &str, current: &mut EncodeProgress) -> Option<EncodeProgress> {
    let (key, value) = line.trim().split_once('=')?;

    match key {
        "frame" => {
            if let Ok(frame) = value.trim().parse() {
                current.frame = frame;
            }
        }
        "out_time_us" => {
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "out_time_ms" => {
            // Despite the name FFmpeg reports microseconds here too.
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "speed" => {
            if let Some(speed) = value.trim().strip_suffix('x').and_then(|s| s.parse().ok()) {
                current.speed = speed;
            }
        }
        "progress" => {
            current.is_complete = value == "end";
            return Some(current.clone());
        }
        _ => {}
    }

    None
}

/// Whether a stderr line belongs to the `-progress` key/value stream.
pub fn is_progress_line(line: &str) -> bool {
    const KEYS: &[&str] = &[
        "frame", "fps", "stream_0_0_q", "bitrate", "total_size", "out_time_us",
        "out_time_ms", "out_time", "dup_frames", "drop_frames", "speed", "progress",
    ];
    line.split_once('=')
        .map(|(key, _)| KEYS.contains(&key.trim()))
        .unwrap_or(false)
}
