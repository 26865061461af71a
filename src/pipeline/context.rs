use std::path::PathBuf;
use std::sync::Arc;

use crate::capture::source::InputControl;
use crate::config::calibration::CalibrationOptions;
use crate::foundation::core::EulerAngles;
use crate::session::manager::FrameSessionManager;

/// Default step for calibration nudges.
pub const DEFAULT_CALIBRATION_STEP: f32 = 0.01;

/// Loop-wide view flags and orientation.
#[derive(Clone, Debug, PartialEq)]
pub struct GlobalViewState {
    /// Camera shown in single-camera modes.
    pub active_camera: usize,
    /// Side-by-side stereo display.
    pub stereo: bool,
    /// Show the foreground request on the display.
    pub preview: bool,
    /// Wait for every camera before compositing.
    pub frame_sync: bool,
    /// Mount orientation of the camera rig, radians.
    pub camera_mount: EulerAngles,
    /// Nudge size of the calibration commands.
    pub calibration_step: f32,
}

impl Default for GlobalViewState {
    fn default() -> Self {
        Self {
            active_camera: 0,
            stereo: false,
            preview: false,
            frame_sync: false,
            camera_mount: EulerAngles::default(),
            calibration_step: DEFAULT_CALIBRATION_STEP,
        }
    }
}

/// Mutable state owned by the control loop and passed by reference into each component.
#[derive(Debug)]
pub struct PipelineContext {
    /// Global view flags.
    pub view: GlobalViewState,
    /// Live calibration.
    pub calibration: CalibrationOptions,
    /// Where `save` writes the calibration document.
    pub calibration_path: PathBuf,
    /// Frame requests.
    pub manager: FrameSessionManager,
    /// Input selection shared with capture threads.
    pub input: Arc<InputControl>,
    /// Attached cameras.
    pub num_cameras: usize,
}

impl PipelineContext {
    /// Context with default view flags and no requests.
    pub fn new(
        num_cameras: usize,
        calibration: CalibrationOptions,
        calibration_path: PathBuf,
        input: Arc<InputControl>,
    ) -> Self {
        Self {
            view: GlobalViewState::default(),
            calibration,
            calibration_path,
            manager: FrameSessionManager::new(),
            input,
            num_cameras,
        }
    }
}
