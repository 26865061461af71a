use std::path::PathBuf;
use std::time::Duration;

use crate::config::calibration::MAX_CAMERAS;
use crate::foundation::core::Size;
use crate::foundation::error::{PanoError, PanoResult};

/// Process-level settings for one pipeline run.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Attached cameras, `1..=MAX_CAMERAS`.
    pub num_cameras: usize,
    /// Size of each camera image.
    pub camera_size: Size,
    /// Display size.
    pub screen_size: Size,
    /// Wait for every camera before compositing.
    pub frame_sync: bool,
    /// Show the foreground request on the display.
    pub preview: bool,
    /// Side-by-side stereo display.
    pub stereo: bool,
    /// Per-slot wait for a fresh camera frame before the tick is skipped.
    pub sync_timeout: Duration,
    /// Lower bound on tick duration; zero runs the loop flat out.
    pub min_tick_interval: Duration,
    /// Recording frame rate.
    pub video_fps: u32,
    /// Still JPEG quality, `1..=100`.
    pub jpeg_quality: u8,
    /// Bitrate of a single-width recording; double-size recordings scale it.
    pub video_bitrate_kbps: u32,
    /// Calibration document path.
    pub calibration_path: PathBuf,
    /// Terminate once a file replay has been fully consumed.
    pub exit_on_replay_end: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_cameras: 1,
            camera_size: Size {
                width: 1024,
                height: 1024,
            },
            screen_size: Size {
                width: 1920,
                height: 1080,
            },
            frame_sync: false,
            preview: false,
            stereo: false,
            sync_timeout: Duration::from_millis(1),
            min_tick_interval: Duration::ZERO,
            video_fps: 15,
            jpeg_quality: 70,
            video_bitrate_kbps: 4000,
            calibration_path: PathBuf::from("config.json"),
            exit_on_replay_end: false,
        }
    }
}

impl PipelineConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> PanoResult<()> {
        if self.num_cameras == 0 || self.num_cameras > MAX_CAMERAS {
            return Err(PanoError::configuration(format!(
                "camera count must be 1..={MAX_CAMERAS}, got {}",
                self.num_cameras
            )));
        }
        for (what, size) in [("camera", self.camera_size), ("screen", self.screen_size)] {
            if size.width == 0 || size.height == 0 {
                return Err(PanoError::configuration(format!(
                    "{what} size must be non-zero"
                )));
            }
        }
        if self.video_fps == 0 {
            return Err(PanoError::configuration("video fps must be non-zero"));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(PanoError::configuration("jpeg quality must be 1..=100"));
        }
        Ok(())
    }
}
