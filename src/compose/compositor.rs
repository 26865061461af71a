use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Quat};
use smallvec::SmallVec;

use crate::config::calibration::{CalibrationOptions, MAX_CAMERAS};
use crate::foundation::core::{EulerAngles, OperationMode};

/// Where a request's view orientation comes from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewOrientation {
    /// Device quaternion sampled this tick.
    Device(Quat),
    /// Operator-supplied angles.
    Explicit(EulerAngles),
}

/// Half of a double-size frame being drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Split {
    /// Full-width pass.
    #[default]
    None,
    /// Left half of a double-size frame.
    Left,
    /// Right half of a double-size frame.
    Right,
}

impl Split {
    /// Numeric selector as consumed by the shaders.
    pub fn selector(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Left => 1,
            Self::Right => 2,
        }
    }
}

/// Per-camera lens and seam correction values.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraUniform {
    /// Lens yaw, radians.
    pub yaw: f32,
    /// Horizontal lens offset.
    pub x: f32,
    /// Vertical lens offset.
    pub y: f32,
    /// Lens horizon radius.
    pub horizon_r: f32,
}

/// Everything the compositor reads for one draw.
#[derive(Clone, Copy, Debug)]
pub struct ComposeInputs<'a> {
    /// Lens calibration for every slot.
    pub calibration: &'a CalibrationOptions,
    /// Camera rig mount orientation.
    pub mount: EulerAngles,
    /// Where the view orientation comes from.
    pub view: ViewOrientation,
    /// Shader family of the request.
    pub mode: OperationMode,
    /// Camera shown in single-camera modes.
    pub active_camera: usize,
    /// Cameras actually attached.
    pub num_cameras: usize,
    /// Which half of a double-size frame this pass draws.
    pub split: Split,
    /// Field of view in degrees.
    pub fov_deg: f32,
    /// Per-pass target width.
    pub width: u32,
    /// Pass height in pixels.
    pub height: u32,
    /// Camera image width, for the per-pixel step.
    pub camera_width: u32,
}

/// Parameters for one backend draw.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawParams {
    /// Composed view matrix in the backend's (column-major) convention.
    pub matrix: Mat4,
    /// Shader selector.
    pub mode: OperationMode,
    /// Camera shown in single-camera modes.
    pub active_camera: usize,
    /// Pass half.
    pub split: Split,
    /// `1 / tan(fov / 2)`.
    pub scale: f32,
    /// Pass width over height.
    pub aspect: f32,
    /// One camera texel in normalized units.
    pub pixel_size: f32,
    /// Global sharpening gain.
    pub sharpness_gain: f32,
    /// Uniforms for every calibration slot.
    pub cameras: SmallVec<[CameraUniform; MAX_CAMERAS]>,
    /// Uniforms of the active camera.
    pub active: CameraUniform,
}

/// Rotation built in the fixed intrinsic order roll, then pitch, then yaw.
pub fn euler_matrix(a: EulerAngles) -> Mat4 {
    Mat4::from_rotation_z(a.roll) * Mat4::from_rotation_x(a.pitch) * Mat4::from_rotation_y(a.yaw)
}

/// Re-levels the tracked "up" axis so the initial view heads to the ground.
pub fn world_alignment() -> Mat4 {
    Mat4::from_rotation_x(-FRAC_PI_2)
}

/// View rotation for either orientation source.
///
/// Device quaternions are converted and transposed since the tracker's handedness is the
/// opposite of the matrix convention used here.
pub fn view_matrix(view: ViewOrientation) -> Mat4 {
    match view {
        ViewOrientation::Device(q) => Mat4::from_quat(q).transpose(),
        ViewOrientation::Explicit(a) => euler_matrix(a),
    }
}

/// Compose the view matrix and draw parameters.
///
/// The chain is world, view, mount, offset, applied right-to-left to a vertex. Swapping view and
/// mount breaks multi-camera alignment. The calibration offset comes from camera 0, the reference
/// lens; the other lenses are corrected per pixel through [`DrawParams::cameras`].
pub fn compose(inputs: &ComposeInputs<'_>) -> DrawParams {
    let cal = inputs.calibration;
    let reference = cal.camera(0);
    let offset = euler_matrix(EulerAngles::new(
        reference.offset_pitch,
        reference.offset_yaw,
        reference.offset_roll,
    ));
    let mount = euler_matrix(inputs.mount);
    let view = view_matrix(inputs.view);

    let matrix = (world_alignment() * view * mount * offset).transpose();

    let cameras = (0..inputs.num_cameras)
        .map(|i| camera_uniform(cal, i))
        .collect::<SmallVec<_>>();

    DrawParams {
        matrix,
        mode: inputs.mode,
        active_camera: inputs.active_camera,
        split: inputs.split,
        scale: 1.0 / (inputs.fov_deg.to_radians() / 2.0).tan(),
        aspect: inputs.width as f32 / inputs.height.max(1) as f32,
        pixel_size: 1.0 / inputs.camera_width.max(1) as f32,
        sharpness_gain: cal.sharpness_gain,
        cameras,
        active: camera_uniform(cal, inputs.active_camera),
    }
}

fn camera_uniform(cal: &CalibrationOptions, slot: usize) -> CameraUniform {
    let c = cal.camera(slot);
    CameraUniform {
        yaw: c.offset_yaw,
        x: c.offset_x,
        y: c.offset_y,
        horizon_r: c.horizon_r,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/compositor.rs"]
mod tests;
